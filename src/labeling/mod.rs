//! Records moving through a labeling campaign.
//!
//! A record starts in the [`RecordPool`] carrying its withheld ground truth and
//! ends in the [`LabelStore`] once the oracle or the model has labeled it.

pub mod pool;
pub mod store;

pub use pool::RecordPool;
pub use store::LabelStore;

/// A phrase with its working label and the ground truth captured at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    phrase: String,
    subtopic: String,
    subtopic_true: String,
    frequency: f64,
}

impl Record {
    /// Ingest a phrase whose current label is also its ground truth.
    pub fn new(phrase: impl Into<String>, subtopic: impl Into<String>, frequency: f64) -> Self {
        let subtopic = subtopic.into();
        Self {
            phrase: phrase.into(),
            subtopic_true: subtopic.clone(),
            subtopic,
            frequency,
        }
    }

    /// Bootstrap vocabulary entry: the phrase is its own label.
    pub fn vocabulary(term: impl Into<String>) -> Self {
        let term = term.into();
        Self::new(term.clone(), term, 0.0)
    }

    /// Copy of this record carrying `label` as its working label.
    ///
    /// The ground truth is never touched.
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            phrase: self.phrase.clone(),
            subtopic: label.into(),
            subtopic_true: self.subtopic_true.clone(),
            frequency: self.frequency,
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Working label.
    pub fn subtopic(&self) -> &str {
        &self.subtopic
    }

    /// Ground-truth label.
    pub fn subtopic_true(&self) -> &str {
        &self.subtopic_true
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Whether the working label agrees with the ground truth.
    pub fn is_correct(&self) -> bool {
        self.subtopic == self.subtopic_true
    }
}
