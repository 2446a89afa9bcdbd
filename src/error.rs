//! Top-level failure taxonomy of a campaign run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::export::ExportError;
use crate::dataset::loader::DatasetLoadError;
use crate::ml::classifier::ClassifierError;

/// Any failure that ends a run. Nothing is retried.
#[derive(Debug, Error)]
pub enum RunError {
    /// Missing or malformed pool/bootstrap file.
    #[error("Input error: {0}")]
    Input(#[from] DatasetLoadError),
    /// Invalid run parameters.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// `add`, `predict` or `metrics` failed, or a snapshot could not be used.
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    /// The label-store checkpoint could not be written.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[source] ExportError),
    /// End-of-run artifacts could not be written.
    #[error("Export error: {0}")]
    Export(#[source] ExportError),
}
