//! Library exports for the campaign binaries, benchmarks and tests.
/// Application directory helpers.
pub mod app_dirs;
/// Active-learning campaign loop and its metrics ledger.
pub mod campaign;
/// TOML run configuration.
pub mod config;
/// Input loaders and CSV writers.
pub mod dataset;
/// Top-level run errors.
pub mod error;
/// Records, the unlabeled pool and the label store.
pub mod labeling;
/// Logging setup.
pub mod logging;
/// Phrase classifiers and evaluation metrics.
pub mod ml;
/// End-to-end campaign runs from a config.
pub mod runner;
/// Phrase canonicalization.
pub mod text;
