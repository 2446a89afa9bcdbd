//! Per-round evaluation history.

use crate::ml::metrics::ClassificationReport;

/// Labeling counters attached to every evaluation row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundCounters {
    /// Items meeting the threshold in this evaluation.
    pub model_from_val: usize,
    /// Cumulative auto-labeled records.
    pub model_from_all: usize,
    /// Cumulative oracle-labeled records.
    pub people_from_val: usize,
}

/// One evaluation: a classification report plus the counters at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    /// 1-based round number.
    pub round: usize,
    pub report: ClassificationReport,
    pub counters: RoundCounters,
}

/// Two append-only series of [`MetricsRow`]s.
///
/// `all` is evaluated on the full label store every round; `marked` only on
/// auto-labeled records, and only once the model is trusted.
#[derive(Debug, Clone, Default)]
pub struct MetricsLedger {
    all: Vec<MetricsRow>,
    marked: Vec<MetricsRow>,
}

impl MetricsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_all(&mut self, row: MetricsRow) {
        debug_assert!(self.all.last().is_none_or(|last| last.round < row.round));
        self.all.push(row);
    }

    pub fn record_marked(&mut self, row: MetricsRow) {
        debug_assert!(self.marked.last().is_none_or(|last| last.round < row.round));
        self.marked.push(row);
    }

    pub fn all(&self) -> &[MetricsRow] {
        &self.all
    }

    pub fn marked(&self) -> &[MetricsRow] {
        &self.marked
    }
}
