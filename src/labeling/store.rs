//! Append-only store of labeled records with an on-disk checkpoint.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::Record;
use crate::dataset::export::{ExportError, write_labeled_records};

/// Records that have received a working label, in arrival order.
///
/// When a checkpoint path is set the whole store is rewritten to it after
/// every non-empty append.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    records: Vec<Record>,
    checkpoint: Option<PathBuf>,
}

impl LabelStore {
    /// In-memory store seeded with `bootstrap`.
    pub fn new(bootstrap: Vec<Record>) -> Self {
        Self {
            records: bootstrap,
            checkpoint: None,
        }
    }

    /// Store seeded with `bootstrap` and checkpointed to `path`.
    ///
    /// The seed is written immediately.
    pub fn with_checkpoint(
        bootstrap: Vec<Record>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ExportError> {
        let store = Self {
            records: bootstrap,
            checkpoint: Some(path.into()),
        };
        store.persist()?;
        Ok(store)
    }

    /// Append `records` and rewrite the checkpoint. Returns the number appended.
    pub fn append(&mut self, records: Vec<Record>) -> Result<usize, ExportError> {
        let added = records.len();
        if added == 0 {
            return Ok(0);
        }
        self.records.extend(records);
        self.persist()?;
        Ok(added)
    }

    fn persist(&self) -> Result<(), ExportError> {
        let Some(path) = &self.checkpoint else {
            return Ok(());
        };
        write_labeled_records(path, &self.records)?;
        debug!(path = %path.display(), rows = self.records.len(), "label store checkpointed");
        Ok(())
    }

    pub fn checkpoint_path(&self) -> Option<&Path> {
        self.checkpoint.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records appended at or after position `mark`.
    pub fn since(&self, mark: usize) -> &[Record] {
        &self.records[mark.min(self.records.len())..]
    }

    pub fn phrases(&self) -> Vec<&str> {
        self.records.iter().map(Record::phrase).collect()
    }

    /// Working labels, aligned with [`phrases`](Self::phrases).
    pub fn labels(&self) -> Vec<&str> {
        self.records.iter().map(Record::subtopic).collect()
    }

    /// Ground-truth labels, aligned with [`phrases`](Self::phrases).
    pub fn true_labels(&self) -> Vec<&str> {
        self.records.iter().map(Record::subtopic_true).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_preserves_order_and_alignment() {
        let mut store = LabelStore::new(vec![Record::vocabulary("floral")]);
        let added = store
            .append(vec![
                Record::new("rose", "floral", 2.0),
                Record::new("oud", "woody", 1.0).with_label("floral"),
            ])
            .unwrap();

        assert_eq!(added, 2);
        assert_eq!(store.phrases(), vec!["floral", "rose", "oud"]);
        assert_eq!(store.labels(), vec!["floral", "floral", "floral"]);
        assert_eq!(store.true_labels(), vec!["floral", "floral", "woody"]);
        assert_eq!(store.since(1).len(), 2);
        assert!(store.since(10).is_empty());
    }

    #[test]
    fn checkpoint_is_written_on_creation_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model/in_model.csv");
        let mut store =
            LabelStore::with_checkpoint(vec![Record::vocabulary("citrus")], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);

        store
            .append(vec![Record::new("lemon", "citrus", 1.0)])
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().last(), Some("lemon,citrus,citrus"));
        assert_eq!(store.checkpoint_path(), Some(path.as_path()));
    }

    #[test]
    fn empty_append_leaves_checkpoint_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in_model.csv");
        let mut store = LabelStore::with_checkpoint(Vec::new(), &path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(store.append(Vec::new()).unwrap(), 0);
        assert!(!path.exists());
    }
}
