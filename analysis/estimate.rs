//! # Ordinary Least Squares Estimation
//!
//! Fits `y = b0 + b1*x1 + ... + bk*xk` by least squares and derives the classical
//! inference quantities: standard errors, t statistics, two-tailed p-values, 95%
//! confidence intervals, R², the overall F test, plus the correlation diagnostics
//! of the fitted columns.
//!
//! The solve never forms `XᵀX`. A Householder QR decomposition of the augmented
//! matrix `[X | y]` yields both the triangular factor `R` and `Qᵀy` in one pass:
//!
//! ```text
//!   [X | y] = Q · | R  z |      beta = R⁻¹ z
//!                 | 0  ρ |      (XᵀX)⁻¹ = R⁻¹ R⁻ᵀ
//! ```
//!
//! Each design column is scaled to unit Euclidean length first, so the rank
//! decision for a column never depends on the units of the other columns.
//!
//! An engine instance is single-shot: it can be fitted exactly once, after which
//! it serves predictions for new feature matrices with the same columns.

use crate::correlation::correlate;
use crate::data::{FeatureMatrix, TargetVector, ValidationError};
use crate::faer_ndarray::FaerQr;
use crate::model::{ConfidenceInterval, PredictionRow, RegressionResult};
use indexmap::IndexMap;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use thiserror::Error;

/// Design columns are scaled to unit length before the QR, so `|R_ii|` is the
/// share of column `i` left after projecting out the columns before it. Below
/// this share the column counts as linearly dependent on its predecessors.
const RANK_TOLERANCE: f64 = 1e-10;

/// Coverage of the reported confidence intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Label used for the constant column when reporting rank problems.
pub const INTERCEPT_LABEL: &str = "Intercept";

#[derive(Error, Debug)]
pub enum EstimationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(
        "The design matrix is rank-deficient: column '{column}' is a linear combination of the preceding columns (duplicate or constant feature?)"
    )]
    RankDeficient { column: String },
    #[error("The feature matrix has {features} rows but the target has {target}")]
    RowCountMismatch { features: usize, target: usize },
    #[error("The model has not been fitted yet")]
    NotFitted,
    #[error("The model has already been fitted; create a new engine to fit again")]
    AlreadyFitted,
    #[error("Feature columns {found:?} do not match the columns used at fit time {expected:?}")]
    DimensionMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Could not construct the reference distribution: {0}")]
    Distribution(String),
}

/// Parameters retained after a successful fit.
#[derive(Debug, Clone)]
struct FittedState {
    feature_names: Vec<String>,
    /// `[intercept, b1, ..., bk]`.
    beta: Array1<f64>,
}

/// Single-shot OLS estimator.
#[derive(Debug, Default)]
pub struct OlsEngine {
    fitted: Option<FittedState>,
}

impl OlsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// The fitted parameter vector, intercept first.
    pub fn parameters(&self) -> Option<ArrayView1<'_, f64>> {
        self.fitted.as_ref().map(|state| state.beta.view())
    }

    /// Fits the model and returns the full result. A second call on the same
    /// engine fails with [`EstimationError::AlreadyFitted`].
    pub fn fit(
        &mut self,
        features: &FeatureMatrix,
        target: &TargetVector,
    ) -> Result<RegressionResult, EstimationError> {
        if self.fitted.is_some() {
            return Err(EstimationError::AlreadyFitted);
        }

        let x = features.values();
        let y = target.values();
        let n = x.nrows();
        let k = x.ncols();
        let p = k + 1;
        if y.len() != n {
            return Err(EstimationError::RowCountMismatch {
                features: n,
                target: y.len(),
            });
        }
        if n <= p {
            return Err(ValidationError::InsufficientObservations {
                observations: n,
                parameters: p,
            }
            .into());
        }
        let df = n - p;

        // --- 1. Solve the least-squares problem ---
        let design = internal::design_matrix(x.view());
        let solution = internal::solve(&design, y.view(), features.names())?;
        let beta = solution.beta;

        // --- 2. Residual statistics ---
        let fitted = design.dot(&beta);
        let residuals = y - &fitted;
        let rss = residuals.dot(&residuals);
        let y_mean = y.sum() / n as f64;
        let tss = y.iter().map(|&v| (v - y_mean).powi(2)).sum::<f64>();
        let sigma2 = rss / df as f64;

        let r_squared = if tss > 0.0 {
            (1.0 - rss / tss).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df as f64;
        let mse = rss / n as f64;

        // --- 3. Coefficient inference ---
        let t_dist = StudentsT::new(0.0, 1.0, df as f64)
            .map_err(|e| EstimationError::Distribution(e.to_string()))?;
        let t_critical = t_dist.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);

        let std_errors: Array1<f64> = solution
            .unscaled_covariance
            .diag()
            .mapv(|v| (sigma2 * v).max(0.0).sqrt());
        let t_values: Array1<f64> = &beta / &std_errors;
        let p_values: Array1<f64> = t_values.mapv(|t| internal::two_tailed_p(&t_dist, t));
        let interval = |i: usize| ConfidenceInterval {
            lower: beta[i] - t_critical * std_errors[i],
            upper: beta[i] + t_critical * std_errors[i],
        };

        // --- 4. Overall F test ---
        let ess = (tss - rss).max(0.0);
        let f_statistic = (ess / k as f64) / sigma2;
        let f_dist = FisherSnedecor::new(k as f64, df as f64)
            .map_err(|e| EstimationError::Distribution(e.to_string()))?;
        let f_p_value = internal::upper_tail(&f_dist, f_statistic);

        // --- 5. Assemble the name-keyed views ---
        let names = features.names();
        let by_name = |values: &Array1<f64>| -> IndexMap<String, f64> {
            names
                .iter()
                .enumerate()
                .map(|(j, name)| (name.clone(), values[j + 1]))
                .collect()
        };
        let confidence_intervals: IndexMap<String, ConfidenceInterval> = names
            .iter()
            .enumerate()
            .map(|(j, name)| (name.clone(), interval(j + 1)))
            .collect();

        let predictions: Vec<PredictionRow> = (0..n)
            .map(|row| PredictionRow {
                actual: y[row],
                predicted: fitted[row],
                residual: residuals[row],
                features: names
                    .iter()
                    .enumerate()
                    .map(|(j, name)| (name.clone(), x[[row, j]]))
                    .collect(),
            })
            .collect();

        let mut columns: Vec<(&str, ArrayView1<'_, f64>)> = names
            .iter()
            .enumerate()
            .map(|(j, name)| (name.as_str(), x.column(j)))
            .collect();
        columns.push((target.name(), y.view()));
        let correlations = correlate(&columns);

        log::info!(
            "OLS fit complete: n={n}, k={k}, R²={r_squared:.4}, MSE={mse:.6}, F={f_statistic:.3} (p={f_p_value:.3e})"
        );

        let result = RegressionResult {
            intercept: beta[0],
            coefficients: by_name(&beta),
            p_values: by_name(&p_values),
            confidence_intervals,
            intercept_confidence_interval: interval(0),
            r_squared,
            mse,
            feature_count: k,
            predictions,
            pearson_correlation: correlations.pearson,
            spearman_correlation: correlations.spearman,
            standard_errors: by_name(&std_errors),
            t_values: by_name(&t_values),
            intercept_standard_error: std_errors[0],
            intercept_p_value: p_values[0],
            adjusted_r_squared,
            f_statistic,
            f_p_value,
            n_observations: n,
            df_residuals: df,
        };

        self.fitted = Some(FittedState {
            feature_names: names.to_vec(),
            beta,
        });
        Ok(result)
    }

    /// Predicts the target for new observations.
    ///
    /// The new matrix must carry exactly the columns used at fit time. Column
    /// order may differ; values are matched by name.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Array1<f64>, EstimationError> {
        let state = self.fitted.as_ref().ok_or(EstimationError::NotFitted)?;

        let mismatch = || EstimationError::DimensionMismatch {
            expected: state.feature_names.clone(),
            found: features.names().to_vec(),
        };
        if features.ncols() != state.feature_names.len() {
            return Err(mismatch());
        }

        let mut aligned = Array2::zeros((features.nrows(), state.feature_names.len()));
        for (j, name) in state.feature_names.iter().enumerate() {
            let column = features.column(name).ok_or_else(&mismatch)?;
            aligned.column_mut(j).assign(&column);
        }

        let design = internal::design_matrix(aligned.view());
        Ok(design.dot(&state.beta))
    }
}

/// Internal module for the numeric kernels of the fit.
mod internal {
    use super::*;

    pub(super) struct Solution {
        pub beta: Array1<f64>,
        /// `(XᵀX)⁻¹` of the design, before scaling by σ².
        pub unscaled_covariance: Array2<f64>,
    }

    /// Prepends the constant column. Returns a standard-layout matrix.
    pub(super) fn design_matrix(x: ArrayView2<'_, f64>) -> Array2<f64> {
        let (n, k) = x.dim();
        let mut design = Array2::ones((n, k + 1));
        design.slice_mut(s![.., 1..]).assign(&x);
        design
    }

    pub(super) fn solve(
        design: &Array2<f64>,
        y: ArrayView1<'_, f64>,
        feature_names: &[String],
    ) -> Result<Solution, EstimationError> {
        let (n, p) = design.dim();
        let column_label = |i: usize| match i {
            0 => INTERCEPT_LABEL.to_string(),
            _ => feature_names[i - 1].clone(),
        };

        let norms: Array1<f64> = design
            .columns()
            .into_iter()
            .map(|column| column.dot(&column).sqrt())
            .collect();
        if let Some(i) = norms.iter().position(|&norm| !(norm > 0.0 && norm.is_finite())) {
            log::debug!("Column '{}' has norm {:.3e}", column_label(i), norms[i]);
            return Err(EstimationError::RankDeficient {
                column: column_label(i),
            });
        }

        let mut augmented = Array2::zeros((n, p + 1));
        augmented.slice_mut(s![.., ..p]).assign(&(design / &norms));
        augmented.column_mut(p).assign(&y);

        let r_aug = augmented.qr_r();
        let r = r_aug.slice(s![..p, ..p]);
        let z = r_aug.slice(s![..p, p]);

        for (i, &d) in r.diag().iter().enumerate() {
            log::trace!("R[{i},{i}] = {d:.6e}");
            if !(d.abs() > RANK_TOLERANCE) {
                let column = column_label(i);
                log::debug!("Rank check failed at column '{column}': |R_ii| = {:.3e}", d.abs());
                return Err(EstimationError::RankDeficient { column });
            }
        }

        // Undo the column scaling: beta = S⁻¹ βₛ and (XᵀX)⁻¹ = S⁻¹ (RᵀR)⁻¹ S⁻¹.
        let r_inv = upper_triangular_inverse(r);
        let beta = r_inv.dot(&z) / &norms;
        let mut unscaled_covariance = r_inv.dot(&r_inv.t());
        for ((i, j), v) in unscaled_covariance.indexed_iter_mut() {
            *v /= norms[i] * norms[j];
        }
        Ok(Solution {
            beta,
            unscaled_covariance,
        })
    }

    /// Inverse of a non-singular upper-triangular matrix by back substitution.
    pub(super) fn upper_triangular_inverse(r: ArrayView2<'_, f64>) -> Array2<f64> {
        let p = r.nrows();
        let mut inv = Array2::zeros((p, p));
        for col in 0..p {
            for i in (0..=col).rev() {
                let mut acc = if i == col { 1.0 } else { 0.0 };
                for m in (i + 1)..=col {
                    acc -= r[[i, m]] * inv[[m, col]];
                }
                inv[[i, col]] = acc / r[[i, i]];
            }
        }
        inv
    }

    pub(super) fn two_tailed_p(dist: &StudentsT, t: f64) -> f64 {
        if t.is_nan() {
            f64::NAN
        } else if t.is_infinite() {
            0.0
        } else {
            (2.0 * dist.sf(t.abs())).min(1.0)
        }
    }

    pub(super) fn upper_tail(dist: &FisherSnedecor, f: f64) -> f64 {
        if f.is_nan() {
            f64::NAN
        } else if f.is_infinite() {
            0.0
        } else {
            dist.sf(f)
        }
    }
}
