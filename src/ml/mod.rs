//! Phrase classification and evaluation.
//!
//! [`classifier::Classifier`] is the seam the campaign drives; the bundled
//! implementation is [`nearest::NearestPhraseClassifier`].

pub mod classifier;
pub mod metrics;
pub mod nearest;
pub mod vector;

pub use classifier::{Classifier, ClassifierError, PredictionBatch, UNKNOWN_LABEL};
pub use metrics::{ClassificationReport, PrecisionAverage};
pub use nearest::NearestPhraseClassifier;
