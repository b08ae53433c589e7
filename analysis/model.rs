use indexmap::IndexMap;
use ndarray::Array2;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

// --- Public Data Structures ---
// These structs define the structured, human-readable form of a fitted model as it
// is handed to report rendering or serialized for an API consumer. Name-keyed
// values are `IndexMap`s so feature order survives into every output format.

/// A two-sided interval at the 95% level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// One observation of the fitted data, in input row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub actual: f64,
    pub predicted: f64,
    pub residual: f64,
    /// The feature values of this row, keyed by feature name. Kept in a nested
    /// object so a feature called `actual` cannot shadow the fields above.
    pub features: IndexMap<String, f64>,
}

/// A square correlation matrix indexed by the same names on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl CorrelationMatrix {
    pub(crate) fn new(names: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(values.nrows(), names.len());
        debug_assert_eq!(values.ncols(), names.len());
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == row)?;
        let j = self.names.iter().position(|n| n == col)?;
        Some(self.values[[i, j]])
    }
}

/// Serialized as a nested object `{row: {column: r}}`; undefined entries become `null`.
impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(self.names.len()))?;
        for (i, row_name) in self.names.iter().enumerate() {
            let row: IndexMap<&str, Option<f64>> = self
                .names
                .iter()
                .enumerate()
                .map(|(j, col_name)| {
                    let r = self.values[[i, j]];
                    (col_name.as_str(), r.is_finite().then_some(r))
                })
                .collect();
            outer.serialize_entry(row_name, &row)?;
        }
        outer.end()
    }
}

/// The complete outcome of one OLS fit. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionResult {
    pub intercept: f64,
    pub coefficients: IndexMap<String, f64>,
    /// Two-tailed p-values of the feature coefficients.
    pub p_values: IndexMap<String, f64>,
    pub confidence_intervals: IndexMap<String, ConfidenceInterval>,
    pub intercept_confidence_interval: ConfidenceInterval,
    pub r_squared: f64,
    /// Mean of squared residuals over all observations.
    pub mse: f64,
    pub feature_count: usize,
    pub predictions: Vec<PredictionRow>,
    pub pearson_correlation: CorrelationMatrix,
    pub spearman_correlation: CorrelationMatrix,

    pub standard_errors: IndexMap<String, f64>,
    pub t_values: IndexMap<String, f64>,
    pub intercept_standard_error: f64,
    pub intercept_p_value: f64,
    pub adjusted_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub n_observations: usize,
    pub df_residuals: usize,
}

impl RegressionResult {
    /// Feature names in selection order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.coefficients.keys().map(String::as_str).collect()
    }

    pub fn residuals(&self) -> impl Iterator<Item = f64> + '_ {
        self.predictions.iter().map(|row| row.residual)
    }

    /// `true` when the feature's p-value is below 0.05.
    pub fn is_significant(&self, feature: &str) -> bool {
        self.p_values
            .get(feature)
            .is_some_and(|&p| p < SIGNIFICANCE_LEVEL)
    }
}

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn prediction_row_nests_features() {
        let mut features = IndexMap::new();
        features.insert("zeta".to_string(), 4.0);
        features.insert("actual".to_string(), 3.0);
        let row = PredictionRow {
            actual: 9.4,
            predicted: 9.0,
            residual: 0.4,
            features,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"actual":9.4,"predicted":9.0,"residual":0.4,"features":{"zeta":4.0,"actual":3.0}}"#
        );
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["actual"], 9.4);
        assert_eq!(value["features"]["actual"], 3.0);
    }

    #[test]
    fn correlation_matrix_serializes_nan_as_null() {
        let matrix = CorrelationMatrix::new(
            vec!["a".into(), "b".into()],
            array![[1.0, f64::NAN], [f64::NAN, f64::NAN]],
        );
        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["a"]["a"], 1.0);
        assert!(json["a"]["b"].is_null());
        assert_eq!(matrix.get("a", "a"), Some(1.0));
        assert_eq!(matrix.get("a", "c"), None);
    }
}
