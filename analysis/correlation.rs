//! Pearson and Spearman correlation matrices over the fitted columns.
//!
//! A column without variance has no defined correlation with anything, itself
//! included. Its row and column are filled with `NaN` so the remaining entries can
//! still be reported.

use crate::model::CorrelationMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use std::cmp::Ordering;

/// Both correlation matrices over the same ordered set of columns.
#[derive(Debug, Clone)]
pub struct CorrelationPair {
    pub pearson: CorrelationMatrix,
    pub spearman: CorrelationMatrix,
}

/// Correlates every ordered pair of `columns`. Order is preserved on both axes;
/// the estimator passes the features in selection order followed by the target.
pub fn correlate(columns: &[(&str, ArrayView1<'_, f64>)]) -> CorrelationPair {
    let names: Vec<String> = columns.iter().map(|(name, _)| name.to_string()).collect();
    for (name, values) in columns {
        if is_constant(*values) {
            log::warn!("Column '{name}' has zero variance; its correlations are undefined");
        }
    }

    let raw: Vec<ArrayView1<'_, f64>> = columns.iter().map(|(_, values)| *values).collect();
    let ranked: Vec<Array1<f64>> = raw.iter().map(|values| average_ranks(*values)).collect();
    let ranked_views: Vec<ArrayView1<'_, f64>> = ranked.iter().map(|r| r.view()).collect();

    CorrelationPair {
        pearson: CorrelationMatrix::new(names.clone(), pairwise_matrix(&raw)),
        spearman: CorrelationMatrix::new(names, pairwise_matrix(&ranked_views)),
    }
}

/// Linear correlation coefficient, or `NaN` when either input has zero variance.
pub fn pearson(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.len() < 2 || is_constant(x) || is_constant(y) {
        return f64::NAN;
    }
    let x_mean = x.sum() / x.len() as f64;
    let y_mean = y.sum() / y.len() as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Rank correlation: Pearson on average ranks.
pub fn spearman(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
    pearson(average_ranks(x).view(), average_ranks(y).view())
}

/// 1-based ranks where tied values share the mean of the ranks they span.
pub fn average_ranks(values: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = Array1::zeros(n);
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end.
        let shared = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

fn pairwise_matrix(columns: &[ArrayView1<'_, f64>]) -> Array2<f64> {
    let k = columns.len();
    let mut matrix = Array2::from_elem((k, k), f64::NAN);
    for i in 0..k {
        if is_constant(columns[i]) {
            continue;
        }
        matrix[[i, i]] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(columns[i], columns[j]);
            matrix[[i, j]] = r;
            matrix[[j, i]] = r;
        }
    }
    matrix
}

fn is_constant(values: ArrayView1<'_, f64>) -> bool {
    match values.first() {
        Some(&first) => values.iter().all(|&v| v == first),
        None => true,
    }
}
