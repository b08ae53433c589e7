//! Thin bridge from `ndarray` matrices to `faer` factorizations.

use faer::{Mat, MatRef};
use ndarray::{Array2, ArrayBase, Data, Ix2};

fn mat_to_array(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

enum FaerStorage<'a> {
    Borrowed(MatRef<'a, f64>),
    Owned(Mat<f64>),
}

impl<'a> FaerStorage<'a> {
    #[inline]
    fn as_ref(&self) -> MatRef<'_, f64> {
        match self {
            FaerStorage::Borrowed(view) => *view,
            FaerStorage::Owned(mat) => mat.as_ref(),
        }
    }
}

/// Zero-copy `faer` view of an `ndarray` matrix when its memory is contiguous in
/// either row- or column-major order, and an owned copy otherwise.
pub struct FaerArrayView<'a> {
    storage: FaerStorage<'a>,
}

impl<'a> FaerArrayView<'a> {
    pub fn new<S: Data<Elem = f64>>(array: &'a ArrayBase<S, Ix2>) -> Self {
        let storage = match array.as_slice_memory_order() {
            Some(slice) if array.is_standard_layout() => FaerStorage::Borrowed(
                MatRef::from_row_major_slice(slice, array.nrows(), array.ncols()),
            ),
            Some(slice) if array.t().is_standard_layout() => FaerStorage::Borrowed(
                MatRef::from_column_major_slice(slice, array.nrows(), array.ncols()),
            ),
            _ => {
                let (rows, cols) = array.dim();
                FaerStorage::Owned(Mat::from_fn(rows, cols, |i, j| array[(i, j)]))
            }
        };
        Self { storage }
    }

    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.storage.as_ref()
    }
}

pub trait FaerQr {
    /// Upper-triangular factor `R` of the Householder QR decomposition, restricted
    /// to its leading `min(nrows, ncols)` rows. `Q` is never formed.
    fn qr_r(&self) -> Array2<f64>;
}

impl<S: Data<Elem = f64>> FaerQr for ArrayBase<S, Ix2> {
    fn qr_r(&self) -> Array2<f64> {
        let faer_view = FaerArrayView::new(self);
        let qr = faer_view.as_ref().qr();
        let r = qr.R();
        let size = self.nrows().min(self.ncols());
        let full = mat_to_array(r);
        full.slice(ndarray::s![..size.min(full.nrows()), ..]).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn r_factor_reproduces_gram_matrix() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0], [1.0, -1.0]];
        let r = a.qr_r();
        assert_eq!(r.shape(), &[2, 2]);
        assert_abs_diff_eq!(r[[1, 0]], 0.0, epsilon = 1e-12);

        let gram = a.t().dot(&a);
        let rtr = r.t().dot(&r);
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(gram[[i, j]], rtr[[i, j]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn column_major_input_is_handled() {
        let a = array![[2.0, 0.0], [0.0, 3.0], [0.0, 0.0]];
        let fortran = a.t().to_owned();
        let fortran = fortran.t();
        let r = fortran.qr_r();
        assert_abs_diff_eq!(r[[0, 0]].abs(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r[[1, 1]].abs(), 3.0, epsilon = 1e-12);
    }
}
