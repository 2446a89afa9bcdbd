//! Capability surface the campaign needs from a phrase classifier.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use super::metrics::ClassificationReport;

/// Label reported when the classifier has nothing to compare against.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("length mismatch: expected {expected} items, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("confidence threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid snapshot JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid snapshot {path}: {reason}")]
    InvalidSnapshot { path: PathBuf, reason: String },
}

/// Predictions for a sequence of phrases.
///
/// `predictions` and `confidences` are aligned with the input; `indices`
/// holds the input positions whose confidence reached the threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionBatch {
    pub indices: BTreeSet<usize>,
    pub predictions: Vec<String>,
    pub confidences: Vec<f64>,
}

impl PredictionBatch {
    /// Assemble a batch, selecting positions with `confidence >= threshold`.
    pub fn from_scored(scored: Vec<(String, f64)>, threshold: f64) -> Self {
        let mut batch = Self {
            indices: BTreeSet::new(),
            predictions: Vec::with_capacity(scored.len()),
            confidences: Vec::with_capacity(scored.len()),
        };
        for (idx, (label, confidence)) in scored.into_iter().enumerate() {
            if confidence >= threshold {
                batch.indices.insert(idx);
            }
            batch.predictions.push(label);
            batch.confidences.push(confidence);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Number of positions that met the threshold.
    pub fn accepted(&self) -> usize {
        self.indices.len()
    }

    pub fn prediction(&self, idx: usize) -> Option<&str> {
        self.predictions.get(idx).map(String::as_str)
    }

    /// Ensure the batch covers exactly `expected` inputs and every accepted
    /// position falls inside it.
    pub fn check_aligned(&self, expected: usize) -> Result<(), ClassifierError> {
        if self.predictions.len() != expected {
            return Err(ClassifierError::LengthMismatch {
                expected,
                actual: self.predictions.len(),
            });
        }
        match self.indices.last() {
            Some(&last) if last >= expected => Err(ClassifierError::LengthMismatch {
                expected,
                actual: last + 1,
            }),
            _ => Ok(()),
        }
    }
}

/// A phrase classifier driven by the campaign loop.
///
/// Calls are synchronous; any error aborts the campaign.
pub trait Classifier {
    /// Whether the classifier already holds examples from before this session.
    fn is_pretrained(&self) -> bool;

    /// Ingest labeled examples. Re-adding a known `(phrase, label)` pair must
    /// not change predictions.
    fn add(&mut self, phrases: &[&str], labels: &[&str]) -> Result<(), ClassifierError>;

    /// Predict a label and confidence for each phrase.
    ///
    /// An empty input yields an empty batch.
    fn predict(
        &self,
        phrases: &[&str],
        confidence_threshold: f64,
    ) -> Result<PredictionBatch, ClassifierError>;

    /// Score `predicted` against `true_labels`.
    fn metrics(
        &self,
        true_labels: &[&str],
        predicted: &[String],
    ) -> Result<ClassificationReport, ClassifierError> {
        ClassificationReport::from_labels(true_labels, predicted)
    }
}

/// Reject thresholds outside `[0, 1]` (including NaN).
pub fn check_threshold(threshold: f64) -> Result<(), ClassifierError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ClassifierError::InvalidThreshold(threshold))
    }
}
