#![deny(unused_imports)]

//! Multifactor ordinary-least-squares regression and report generation.
//!
//! The crate is organised as a short pipeline:
//!
//! 1. [`data`] selects and validates the requested columns of a tabular dataset
//!    and imputes missing entries with the column mean.
//! 2. [`estimate`] fits the OLS model and computes every inference statistic,
//!    delegating the correlation diagnostics to [`correlation`].
//! 3. [`report`] turns a fitted [`model::RegressionResult`] into a typeset
//!    document, its raw LaTeX source, or a multi-sheet workbook.

pub mod correlation;
pub mod data;
pub mod estimate;
pub mod faer_ndarray;
pub mod model;
pub mod pipeline;

#[path = "../report/mod.rs"]
pub mod report;

pub use data::{FeatureMatrix, TargetVector, ValidationError, load_dataset, prepare};
pub use estimate::{EstimationError, OlsEngine};
pub use model::RegressionResult;
pub use report::{ReportArtifact, ReportFormat, ReportRenderer};
