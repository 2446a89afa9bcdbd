//! Nearest-phrase classifier backed by an in-memory embedding index.
//!
//! The index holds one entry per phrase. Adding a phrase that is already
//! indexed with the same label is a no-op; adding it with a different label
//! replaces the label (latest label wins). Re-ingesting the whole label store
//! every round therefore never duplicates entries.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{
    Classifier, ClassifierError, PredictionBatch, UNKNOWN_LABEL, check_threshold,
};
use super::vector::{DEFAULT_DIMENSIONS, dot, phrase_embedding};

/// Snapshot format version written by [`NearestPhraseClassifier::save`].
pub const SNAPSHOT_VERSION: i64 = 1;

#[derive(Debug, Clone)]
struct IndexEntry {
    phrase: String,
    label: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    model_version: i64,
    dimensions: usize,
    neighbors: usize,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    phrase: String,
    label: String,
}

/// k-nearest-neighbour phrase classifier.
///
/// A phrase already in the index is predicted with its stored label at
/// confidence `1.0`. Otherwise the `neighbors` most similar entries vote with
/// their cosine similarity; confidence is the winning label's vote divided by
/// the number of voters.
#[derive(Debug, Clone)]
pub struct NearestPhraseClassifier {
    dimensions: usize,
    neighbors: usize,
    entries: Vec<IndexEntry>,
    lookup: HashMap<String, usize>,
    pretrained: bool,
}

impl Default for NearestPhraseClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS, 1)
    }
}

impl NearestPhraseClassifier {
    pub fn new(dimensions: usize, neighbors: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            neighbors: neighbors.max(1),
            entries: Vec::new(),
            lookup: HashMap::new(),
            pretrained: false,
        }
    }

    /// Load an index saved with [`save`](Self::save).
    ///
    /// A non-empty snapshot marks the classifier as pre-trained.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let text = std::fs::read_to_string(path).map_err(|source| ClassifierError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&text).map_err(|source| ClassifierError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if snapshot.model_version != SNAPSHOT_VERSION {
            return Err(ClassifierError::InvalidSnapshot {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported model_version {} (expected {SNAPSHOT_VERSION})",
                    snapshot.model_version
                ),
            });
        }
        if snapshot.dimensions == 0 || snapshot.neighbors == 0 {
            return Err(ClassifierError::InvalidSnapshot {
                path: path.to_path_buf(),
                reason: "dimensions and neighbors must be > 0".to_string(),
            });
        }

        let mut classifier = Self::new(snapshot.dimensions, snapshot.neighbors);
        for entry in snapshot.entries {
            classifier.upsert(&entry.phrase, &entry.label);
        }
        classifier.pretrained = !classifier.is_empty();
        debug!(path = %path.display(), entries = classifier.len(), "classifier snapshot loaded");
        Ok(classifier)
    }

    /// Write the index (phrases and labels only) as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        let snapshot = Snapshot {
            model_version: SNAPSHOT_VERSION,
            dimensions: self.dimensions,
            neighbors: self.neighbors,
            entries: self
                .entries
                .iter()
                .map(|entry| SnapshotEntry {
                    phrase: entry.phrase.clone(),
                    label: entry.label.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|source| {
            ClassifierError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ClassifierError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ClassifierError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored label for an indexed phrase.
    pub fn label_of(&self, phrase: &str) -> Option<&str> {
        self.lookup
            .get(phrase)
            .map(|&idx| self.entries[idx].label.as_str())
    }

    fn upsert(&mut self, phrase: &str, label: &str) -> Upsert {
        if let Some(&idx) = self.lookup.get(phrase) {
            let entry = &mut self.entries[idx];
            if entry.label == label {
                return Upsert::Unchanged;
            }
            entry.label = label.to_string();
            return Upsert::Relabeled;
        }
        self.lookup.insert(phrase.to_string(), self.entries.len());
        self.entries.push(IndexEntry {
            phrase: phrase.to_string(),
            label: label.to_string(),
            embedding: phrase_embedding(phrase, self.dimensions),
        });
        Upsert::Inserted
    }

    fn score(&self, phrase: &str) -> (String, f64) {
        if let Some(label) = self.label_of(phrase) {
            return (label.to_string(), 1.0);
        }
        if self.entries.is_empty() {
            return (UNKNOWN_LABEL.to_string(), 0.0);
        }

        let query = phrase_embedding(phrase, self.dimensions);
        let mut nearest: Vec<(f32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (dot(&query, &entry.embedding), idx))
            .collect();
        let k = self.neighbors.min(nearest.len());
        if k < nearest.len() {
            nearest.select_nth_unstable_by(k - 1, |a, b| b.0.total_cmp(&a.0));
            nearest.truncate(k);
        }

        // label -> (summed similarity, best single similarity)
        let mut votes: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        for &(similarity, idx) in &nearest {
            let similarity = similarity as f64;
            let vote = votes
                .entry(self.entries[idx].label.as_str())
                .or_insert((0.0, 0.0));
            vote.0 += similarity;
            vote.1 = vote.1.max(similarity);
        }
        let Some((label, (total, _))) = votes.into_iter().max_by(|a, b| {
            a.1.0
                .total_cmp(&b.1.0)
                .then(a.1.1.total_cmp(&b.1.1))
                .then_with(|| b.0.cmp(a.0))
        }) else {
            return (UNKNOWN_LABEL.to_string(), 0.0);
        };
        (label.to_string(), (total / k as f64).clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Inserted,
    Relabeled,
    Unchanged,
}

impl Classifier for NearestPhraseClassifier {
    fn is_pretrained(&self) -> bool {
        self.pretrained
    }

    fn add(&mut self, phrases: &[&str], labels: &[&str]) -> Result<(), ClassifierError> {
        if phrases.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                expected: phrases.len(),
                actual: labels.len(),
            });
        }
        let mut inserted = 0usize;
        let mut relabeled = 0usize;
        for (phrase, label) in phrases.iter().zip(labels) {
            match self.upsert(phrase, label) {
                Upsert::Inserted => inserted += 1,
                Upsert::Relabeled => relabeled += 1,
                Upsert::Unchanged => {}
            }
        }
        debug!(
            offered = phrases.len(),
            inserted,
            relabeled,
            indexed = self.entries.len(),
            "classifier index updated"
        );
        Ok(())
    }

    fn predict(
        &self,
        phrases: &[&str],
        confidence_threshold: f64,
    ) -> Result<PredictionBatch, ClassifierError> {
        check_threshold(confidence_threshold)?;
        let scored = phrases.iter().map(|phrase| self.score(phrase)).collect();
        Ok(PredictionBatch::from_scored(scored, confidence_threshold))
    }
}
