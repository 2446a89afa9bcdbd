//! CSV inputs and outputs of a campaign run.

pub mod export;
pub mod loader;

pub use export::{ArtifactPaths, ExportError, write_artifacts, write_labeled_records};
pub use loader::{DatasetLoadError, load_bootstrap, load_pool};
