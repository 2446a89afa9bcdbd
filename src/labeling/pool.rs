//! Ordered queue of records that still need a label.

use std::collections::{BTreeSet, VecDeque};

use super::Record;

/// Records awaiting a label, most frequent first.
///
/// Every extraction path removes what it returns, so a record leaves the pool
/// exactly once.
#[derive(Debug, Clone, Default)]
pub struct RecordPool {
    records: VecDeque<Record>,
}

impl RecordPool {
    /// Build a pool ordered by `frequency` descending.
    ///
    /// The sort is stable, so records with equal frequency keep input order.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| b.frequency().total_cmp(&a.frequency()));
        Self {
            records: records.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove and return up to `n` records from the front.
    ///
    /// Returns fewer than `n` when the pool is nearly exhausted.
    pub fn take_batch(&mut self, n: usize) -> Vec<Record> {
        let n = n.min(self.records.len());
        self.records.drain(..n).collect()
    }

    /// Remove the records at `positions` (current pool positions), returning
    /// them in pool order. Positions past the end are ignored.
    pub fn take_positions(&mut self, positions: &BTreeSet<usize>) -> Vec<Record> {
        if positions.is_empty() {
            return Vec::new();
        }
        let mut taken = Vec::with_capacity(positions.len());
        let mut kept = VecDeque::with_capacity(self.records.len().saturating_sub(positions.len()));
        for (idx, record) in self.records.drain(..).enumerate() {
            if positions.contains(&idx) {
                taken.push(record);
            } else {
                kept.push_back(record);
            }
        }
        self.records = kept;
        taken
    }

    /// Phrases in pool order, aligned with pool positions.
    pub fn phrases(&self) -> Vec<&str> {
        self.records.iter().map(Record::phrase).collect()
    }
}
