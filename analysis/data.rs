//! # Dataset Validation and Preparation
//!
//! This module is the single entry point through which tabular data reaches the
//! regression core. It takes a caller-owned `polars` DataFrame plus a column
//! selection and produces the dense `ndarray` structures the estimator works on.
//!
//! - Selection-driven: only the target and the requested features are touched.
//!   Columns outside the selection are never inspected or modified.
//! - Non-destructive: missing entries are imputed with the per-column mean on a
//!   working copy. The caller's DataFrame is left exactly as it was.
//! - Order-stable: rows keep their input order and feature columns follow the
//!   order of the selection, never the order of the DataFrame.

use ndarray::{Array1, Array2, ArrayView1, ShapeBuilder};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Feature columns of the design, in selection order. The intercept column is
/// not part of this matrix; the estimator adds it internally.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    names: Vec<String>,
    /// Shape: [n_observations, n_features].
    values: Array2<f64>,
}

/// The response column, row-aligned with a [`FeatureMatrix`].
#[derive(Debug, Clone)]
pub struct TargetVector {
    name: String,
    values: Array1<f64>,
}

/// Every way a dataset or a column selection can be rejected.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("missing columns: {}. Please check spelling and case.", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("non-numeric column: '{0}' contains values that cannot be read as numbers")]
    NonNumericColumn(String),
    #[error("column '{0}' has no observed values, so its mean cannot be imputed")]
    NoObservedValues(String),
    #[error("column '{0}' contains infinite values")]
    NonFiniteValues(String),
    #[error("at least one feature column must be selected")]
    NoFeatures,
    #[error("feature '{0}' was selected more than once")]
    DuplicateFeature(String),
    #[error("target column '{0}' cannot also be used as a feature")]
    TargetAmongFeatures(String),
    #[error("{names} column names were given for a matrix with {columns} columns")]
    NameCountMismatch { names: usize, columns: usize },
    #[error(
        "insufficient observations: {observations} rows cannot support {parameters} parameters (intercept included)"
    )]
    InsufficientObservations {
        observations: usize,
        parameters: usize,
    },
    #[error("unsupported format: '{0}' (expected document, typesetting-source or spreadsheet)")]
    UnsupportedFormat(String),
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self, ValidationError> {
        if names.len() != values.ncols() {
            return Err(ValidationError::NameCountMismatch {
                names: names.len(),
                columns: values.ncols(),
            });
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Looks up a feature column by name.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values.column(idx))
    }
}

impl TargetVector {
    pub fn new(name: impl Into<String>, values: Array1<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reads a delimited text file into a DataFrame.
///
/// Files ending in `.tsv` or `.txt` are read tab-separated, everything else as
/// comma-separated. A header row is required. Empty fields become nulls, which
/// [`prepare`] later imputes.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<DataFrame, ValidationError> {
    let path = path.as_ref();
    let separator = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
        _ => b',',
    };

    log::info!("Loading dataset from '{}'", path.display());
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;
    log::info!(
        "Loaded {} rows across {} columns",
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Validates the selection against `dataset` and extracts the feature matrix and
/// target vector.
///
/// Missing entries (nulls, and NaN in float columns) of the selected columns are
/// replaced by the mean of the observed entries of the same column.
pub fn prepare<S: AsRef<str>>(
    dataset: &DataFrame,
    target_name: &str,
    feature_names: &[S],
) -> Result<(FeatureMatrix, TargetVector), ValidationError> {
    let features: Vec<String> = feature_names
        .iter()
        .map(|name| name.as_ref().to_string())
        .collect();
    internal::check_selection(target_name, &features)?;

    let available: HashSet<String> = dataset
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    let missing: Vec<String> = features
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(target_name))
        .filter(|name| !available.contains(*name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns(missing));
    }

    let n = dataset.height();
    let mut buffer = Vec::with_capacity(n * features.len());
    for name in &features {
        let mut column = internal::extract_imputed_column(dataset, name)?;
        buffer.append(&mut column);
    }
    let target = internal::extract_imputed_column(dataset, target_name)?;

    let matrix = Array2::from_shape_vec((n, features.len()).f(), buffer)?;
    log::debug!(
        "Prepared {} observations of {} features for target '{}'",
        n,
        features.len(),
        target_name
    );

    Ok((
        FeatureMatrix::new(features, matrix)?,
        TargetVector::new(target_name, Array1::from_vec(target)),
    ))
}

mod internal {
    use super::*;

    pub(super) fn check_selection(
        target_name: &str,
        features: &[String],
    ) -> Result<(), ValidationError> {
        if features.is_empty() {
            return Err(ValidationError::NoFeatures);
        }
        let mut seen = HashSet::with_capacity(features.len());
        for name in features {
            if name == target_name {
                return Err(ValidationError::TargetAmongFeatures(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(ValidationError::DuplicateFeature(name.clone()));
            }
        }
        Ok(())
    }

    /// Reads one selected column as `f64`, imputing nulls and NaNs with the mean
    /// of the observed values.
    pub(super) fn extract_imputed_column(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<f64>, ValidationError> {
        let column = df.column(column_name)?;
        if matches!(column.dtype(), DataType::String) {
            return Err(ValidationError::NonNumericColumn(column_name.to_string()));
        }

        let casted = column
            .cast(&DataType::Float64)
            .map_err(|_| ValidationError::NonNumericColumn(column_name.to_string()))?;
        // A lossy cast turns unparseable cells into nulls.
        if casted.null_count() > column.null_count() {
            return Err(ValidationError::NonNumericColumn(column_name.to_string()));
        }

        let observed: Vec<Option<f64>> = casted
            .f64()?
            .into_iter()
            .map(|value| value.filter(|v| !v.is_nan()))
            .collect();
        if observed.iter().flatten().any(|v| v.is_infinite()) {
            return Err(ValidationError::NonFiniteValues(column_name.to_string()));
        }

        let (sum, count) = observed
            .iter()
            .flatten()
            .fold((0.0_f64, 0_usize), |(sum, count), &v| (sum + v, count + 1));
        let missing = observed.len() - count;
        if missing == 0 {
            return Ok(observed.into_iter().flatten().collect());
        }
        if count == 0 {
            return Err(ValidationError::NoObservedValues(column_name.to_string()));
        }

        let mean = sum / count as f64;
        log::info!(
            "Imputed {missing} missing value(s) in column '{column_name}' with the column mean {mean:.6}"
        );
        Ok(observed.into_iter().map(|v| v.unwrap_or(mean)).collect())
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    fn create_test_file(content: &str, suffix: &str) -> io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    fn sample_frame() -> DataFrame {
        df!(
            "y" => [3.0, 5.0, 7.0, 9.0],
            "label" => ["a", "b", "c", "d"],
            "x2" => [10.0, 20.0, 30.0, 40.0],
            "x1" => [1.0, 2.0, 3.0, 4.0]
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_follows_selection_order() {
        let df = sample_frame();
        let (x, y) = prepare(&df, "y", &["x1", "x2"]).unwrap();

        assert_eq!(x.names(), &["x1".to_string(), "x2".to_string()]);
        assert_eq!(x.values().shape(), &[4, 2]);
        assert_abs_diff_eq!(x.values()[[0, 0]], 1.0);
        assert_abs_diff_eq!(x.values()[[3, 0]], 4.0);
        assert_abs_diff_eq!(x.values()[[1, 1]], 20.0);
        assert_eq!(y.name(), "y");
        assert_eq!(y.values().to_vec(), vec![3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_missing_columns_listed_exactly() {
        let df = sample_frame();
        match prepare(&df, "y", &["missing_col"]) {
            Err(ValidationError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["missing_col".to_string()])
            }
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_target_is_reported_after_features() {
        let df = sample_frame();
        match prepare(&df, "outcome", &["x1", "nope"]) {
            Err(ValidationError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["nope".to_string(), "outcome".to_string()])
            }
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_text_column_rejected_by_name() {
        let df = sample_frame();
        match prepare(&df, "y", &["x1", "label"]) {
            Err(ValidationError::NonNumericColumn(col)) => assert_eq!(col, "label"),
            other => panic!("Expected NonNumericColumn(label), got {:?}", other),
        }
    }

    #[test]
    fn test_unselected_text_column_is_ignored() {
        let df = sample_frame();
        assert!(prepare(&df, "y", &["x2"]).is_ok());
    }

    #[test]
    fn test_mean_imputation_of_null() {
        let df = df!(
            "y" => [1.0, 2.0, 3.0],
            "x" => [Some(1.0), None, Some(3.0)]
        )
        .unwrap();
        let (x, _) = prepare(&df, "y", &["x"]).unwrap();
        assert_abs_diff_eq!(x.values()[[1, 0]], 2.0);

        // The caller's frame keeps its missing value.
        assert_eq!(df.column("x").unwrap().null_count(), 1);
    }

    #[test]
    fn test_nan_treated_as_missing() {
        let df = df!(
            "y" => [Some(2.0), Some(f64::NAN), Some(6.0), None],
            "x" => [1.0, 2.0, 3.0, 4.0]
        )
        .unwrap();
        let (_, y) = prepare(&df, "y", &["x"]).unwrap();
        assert_eq!(y.values().to_vec(), vec![2.0, 4.0, 6.0, 4.0]);
    }

    #[test]
    fn test_column_without_observations_rejected() {
        let df = df!(
            "y" => [1.0, 2.0],
            "x" => [None::<f64>, None]
        )
        .unwrap();
        match prepare(&df, "y", &["x"]) {
            Err(ValidationError::NoObservedValues(col)) => assert_eq!(col, "x"),
            other => panic!("Expected NoObservedValues(x), got {:?}", other),
        }
    }

    #[test]
    fn test_infinite_values_rejected() {
        let df = df!(
            "y" => [1.0, 2.0, 3.0],
            "x" => [1.0, f64::INFINITY, 3.0]
        )
        .unwrap();
        assert!(matches!(
            prepare(&df, "y", &["x"]),
            Err(ValidationError::NonFiniteValues(col)) if col == "x"
        ));
    }

    #[test]
    fn test_selection_rules() {
        let df = sample_frame();
        let empty: [&str; 0] = [];
        assert!(matches!(
            prepare(&df, "y", &empty),
            Err(ValidationError::NoFeatures)
        ));
        assert!(matches!(
            prepare(&df, "y", &["x1", "x1"]),
            Err(ValidationError::DuplicateFeature(col)) if col == "x1"
        ));
        assert!(matches!(
            prepare(&df, "y", &["x1", "y"]),
            Err(ValidationError::TargetAmongFeatures(col)) if col == "y"
        ));
    }

    #[test]
    fn test_feature_matrix_rejects_name_count_mismatch() {
        let err = FeatureMatrix::new(vec!["a".into()], Array2::zeros((3, 2))).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NameCountMismatch {
                names: 1,
                columns: 2
            }
        ));
    }

    #[test]
    fn test_load_dataset_csv_with_gap() {
        let file = create_test_file("y,x1,x2\n1.0,2.0,3.0\n2.0,,5.0\n3.0,6.0,7.0", ".csv").unwrap();
        let df = load_dataset(file.path()).unwrap();
        assert_eq!(df.height(), 3);

        let (x, _) = prepare(&df, "y", &["x1", "x2"]).unwrap();
        assert_abs_diff_eq!(x.values()[[1, 0]], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x.values()[[1, 1]], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_load_dataset_tsv() {
        let file = create_test_file("y\tx\n1\t2\n3\t4", ".tsv").unwrap();
        let df = load_dataset(file.path()).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.height(), 2);
    }
}
