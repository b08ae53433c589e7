//! One-call entry points for applications that embed the crate.

use crate::data::{ValidationError, prepare};
use crate::estimate::{EstimationError, OlsEngine};
use crate::model::RegressionResult;
use crate::report::{RenderError, ReportArtifact, ReportFormat, ReportRenderer};
use polars::prelude::DataFrame;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Estimation(#[from] EstimationError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Validates the selection, imputes missing values and fits the model.
pub fn analyze<S: AsRef<str>>(
    dataset: &DataFrame,
    target: &str,
    features: &[S],
) -> Result<RegressionResult, PipelineError> {
    let (x, y) = prepare(dataset, target, features)?;
    let result = OlsEngine::new().fit(&x, &y)?;
    log::info!(
        "Fitted '{}' on {} feature(s): R² = {:.4}, MSE = {:.4}",
        target,
        result.feature_count,
        result.r_squared,
        result.mse
    );
    Ok(result)
}

/// Runs [`analyze`] and renders the fitted model in the requested format.
pub fn generate_report<S: AsRef<str>>(
    dataset: &DataFrame,
    target: &str,
    features: &[S],
    format: ReportFormat,
    renderer: &ReportRenderer,
) -> Result<ReportArtifact, PipelineError> {
    let result = analyze(dataset, target, features)?;
    let feature_names: Vec<String> = features.iter().map(|f| f.as_ref().to_string()).collect();
    Ok(renderer.render(&result, format, target, &feature_names)?)
}
