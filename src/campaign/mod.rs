//! Active-learning labeling campaign.
//!
//! Each round the oracle labels the next batch of the pool. Once the
//! classifier's precision on the label store reaches the acceptance threshold
//! it is promoted to [`Promotion::Trusted`], and from the following round on
//! it labels every pool record it is confident about before the oracle runs.

pub mod ledger;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigError;
use crate::error::RunError;
use crate::labeling::{LabelStore, Record, RecordPool};
use crate::ml::classifier::{Classifier, ClassifierError};
use crate::ml::metrics::PrecisionAverage;
use ledger::{MetricsLedger, MetricsRow, RoundCounters};

/// Which records are handed to [`Classifier::add`] after each round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReingestPolicy {
    /// The whole label store.
    #[default]
    Full,
    /// Only records appended since the previous ingestion.
    Delta,
}

/// Whether the campaign lets the classifier label pool records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Promotion {
    #[default]
    Advisory,
    Trusted,
}

impl Promotion {
    pub fn is_trusted(self) -> bool {
        self == Self::Trusted
    }

    /// Promote when `precision >= accept_precision`. Returns `true` only on
    /// the transition; a trusted campaign never reverts.
    pub fn observe(&mut self, precision: f64, accept_precision: f64) -> bool {
        if *self == Self::Advisory && precision >= accept_precision {
            *self = Self::Trusted;
            return true;
        }
        false
    }
}

/// Parameters of one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignSettings {
    /// Confidence threshold for accepting a model label, in `[0, 1]`.
    pub limit: f64,
    /// Oracle batch size per round.
    pub batch_size: usize,
    /// Aggregate precision on the label store needed for promotion.
    pub accept_precision: f64,
    pub precision_average: PrecisionAverage,
    pub reingest: ReingestPolicy,
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            limit: 0.8,
            batch_size: 500,
            accept_precision: 0.98,
            precision_average: PrecisionAverage::default(),
            reingest: ReingestPolicy::default(),
        }
    }
}

impl CampaignSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.limit) {
            return Err(ConfigError::InvalidLimit(self.limit));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if !(0.0..=1.0).contains(&self.accept_precision) {
            return Err(ConfigError::InvalidAcceptPrecision(self.accept_precision));
        }
        Ok(())
    }
}

/// What happened in one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSummary {
    pub round: usize,
    pub pool_before: usize,
    pub model_taken: usize,
    pub oracle_taken: usize,
    pub pool_after: usize,
    pub store_len: usize,
    pub promotion_before: Promotion,
    pub promotion_after: Promotion,
    /// Aggregate precision of this round's full-store evaluation.
    pub full_precision: f64,
}

/// Final state of a completed campaign.
#[derive(Debug)]
pub struct CampaignOutcome<C> {
    pub ledger: MetricsLedger,
    /// Auto-labeled records with their ground truth.
    pub marked: Vec<Record>,
    pub rounds: Vec<RoundSummary>,
    pub store: LabelStore,
    pub classifier: C,
    /// Round whose evaluation promoted the classifier.
    pub promoted_at: Option<usize>,
    /// Total oracle-labeled records.
    pub people: usize,
    /// Total auto-labeled records.
    pub model: usize,
}

/// One simulation run: owns its pool, store, classifier and promotion state.
pub struct Campaign<C> {
    classifier: C,
    pool: RecordPool,
    store: LabelStore,
    settings: CampaignSettings,
    promotion: Promotion,
    people: usize,
    model: usize,
    marked: Vec<Record>,
    ledger: MetricsLedger,
    rounds: Vec<RoundSummary>,
    promoted_at: Option<usize>,
    /// Store length at the last ingestion, for [`ReingestPolicy::Delta`].
    ingested: usize,
}

impl<C: Classifier> Campaign<C> {
    pub fn new(
        classifier: C,
        pool: RecordPool,
        store: LabelStore,
        settings: CampaignSettings,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            classifier,
            pool,
            store,
            settings,
            promotion: Promotion::Advisory,
            people: 0,
            model: 0,
            marked: Vec::new(),
            ledger: MetricsLedger::new(),
            rounds: Vec::new(),
            promoted_at: None,
            ingested: 0,
        })
    }

    pub fn promotion(&self) -> Promotion {
        self.promotion
    }

    /// Run rounds until the pool is empty.
    ///
    /// Any classifier or checkpoint failure aborts the run; the checkpoint
    /// already on disk is the only trace left behind.
    pub fn run(mut self) -> Result<CampaignOutcome<C>, RunError> {
        info!(
            pool = self.pool.len(),
            store = self.store.len(),
            limit = self.settings.limit,
            batch_size = self.settings.batch_size,
            accept_precision = self.settings.accept_precision,
            reingest = ?self.settings.reingest,
            "campaign started"
        );
        if !self.classifier.is_pretrained() {
            info!(records = self.store.len(), "priming classifier with label store");
            ingest(&mut self.classifier, self.store.records())?;
            self.ingested = self.store.len();
        }

        let mut round = 0;
        while !self.pool.is_empty() {
            round += 1;
            let summary = self.run_round(round)?;
            self.rounds.push(summary);
        }

        info!(
            rounds = self.rounds.len(),
            people = self.people,
            model = self.model,
            promoted_at = ?self.promoted_at,
            store = self.store.len(),
            "campaign complete"
        );
        Ok(CampaignOutcome {
            ledger: self.ledger,
            marked: self.marked,
            rounds: self.rounds,
            store: self.store,
            classifier: self.classifier,
            promoted_at: self.promoted_at,
            people: self.people,
            model: self.model,
        })
    }

    fn run_round(&mut self, round: usize) -> Result<RoundSummary, RunError> {
        let pool_before = self.pool.len();
        let promotion_before = self.promotion;

        let model_taken = if self.promotion.is_trusted() {
            self.label_with_model()?
        } else {
            0
        };

        let oracle = self.pool.take_batch(self.settings.batch_size);
        let oracle_taken = oracle.len();
        self.people += oracle_taken;
        self.store.append(oracle).map_err(RunError::Checkpoint)?;

        if self.promotion.is_trusted() {
            let row = self.evaluate(round, &self.marked)?;
            self.ledger.record_marked(row);
        }

        let row = self.evaluate(round, self.store.records())?;
        let full_precision = row.report.precision(self.settings.precision_average);
        self.ledger.record_all(row);
        if self
            .promotion
            .observe(full_precision, self.settings.accept_precision)
        {
            self.promoted_at = Some(round);
            info!(
                round,
                precision = full_precision,
                accept_precision = self.settings.accept_precision,
                "classifier promoted to trusted"
            );
        }

        self.refresh_index()?;

        let summary = RoundSummary {
            round,
            pool_before,
            model_taken,
            oracle_taken,
            pool_after: self.pool.len(),
            store_len: self.store.len(),
            promotion_before,
            promotion_after: self.promotion,
            full_precision,
        };
        info!(
            round,
            pool_before,
            model_taken,
            oracle_taken,
            pool_after = summary.pool_after,
            store_len = summary.store_len,
            precision = full_precision,
            "round complete"
        );
        Ok(summary)
    }

    /// Let the classifier label every pool record it is confident about.
    fn label_with_model(&mut self) -> Result<usize, RunError> {
        let phrases = self.pool.phrases();
        let batch = self.classifier.predict(&phrases, self.settings.limit)?;
        batch.check_aligned(phrases.len())?;
        // Positions come back in ascending order, matching `batch.indices`.
        let labeled: Vec<Record> = self
            .pool
            .take_positions(&batch.indices)
            .iter()
            .zip(&batch.indices)
            .map(|(record, &idx)| record.with_label(batch.predictions[idx].as_str()))
            .collect();

        let taken = labeled.len();
        self.model += taken;
        self.marked.extend(labeled.iter().cloned());
        self.store.append(labeled).map_err(RunError::Checkpoint)?;
        Ok(taken)
    }

    fn evaluate(&self, round: usize, records: &[Record]) -> Result<MetricsRow, ClassifierError> {
        let phrases: Vec<&str> = records.iter().map(Record::phrase).collect();
        let truth: Vec<&str> = records.iter().map(Record::subtopic_true).collect();
        let batch = self.classifier.predict(&phrases, self.settings.limit)?;
        batch.check_aligned(records.len())?;
        let report = self.classifier.metrics(&truth, &batch.predictions)?;
        Ok(MetricsRow {
            round,
            report,
            counters: RoundCounters {
                model_from_val: batch.accepted(),
                model_from_all: self.model,
                people_from_val: self.people,
            },
        })
    }

    fn refresh_index(&mut self) -> Result<(), ClassifierError> {
        let records = match self.settings.reingest {
            ReingestPolicy::Full => self.store.records(),
            ReingestPolicy::Delta => self.store.since(self.ingested),
        };
        ingest(&mut self.classifier, records)?;
        self.ingested = self.store.len();
        Ok(())
    }
}

fn ingest<C: Classifier>(classifier: &mut C, records: &[Record]) -> Result<(), ClassifierError> {
    let phrases: Vec<&str> = records.iter().map(Record::phrase).collect();
    let labels: Vec<&str> = records.iter().map(Record::subtopic).collect();
    classifier.add(&phrases, &labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::classifier::PredictionBatch;

    /// Predicts a fixed wrong label and records every `add` call size.
    #[derive(Default)]
    struct CountingClassifier {
        pretrained: bool,
        adds: Vec<usize>,
    }

    impl Classifier for CountingClassifier {
        fn is_pretrained(&self) -> bool {
            self.pretrained
        }

        fn add(&mut self, phrases: &[&str], _labels: &[&str]) -> Result<(), ClassifierError> {
            self.adds.push(phrases.len());
            Ok(())
        }

        fn predict(
            &self,
            phrases: &[&str],
            confidence_threshold: f64,
        ) -> Result<PredictionBatch, ClassifierError> {
            let scored = phrases.iter().map(|_| ("x".to_string(), 0.0)).collect();
            Ok(PredictionBatch::from_scored(scored, confidence_threshold))
        }
    }

    fn pool(n: usize) -> RecordPool {
        RecordPool::from_records(
            (0..n)
                .map(|i| Record::new(format!("p{i}"), "a", (n - i) as f64))
                .collect(),
        )
    }

    fn settings(batch_size: usize, reingest: ReingestPolicy) -> CampaignSettings {
        CampaignSettings {
            batch_size,
            reingest,
            ..CampaignSettings::default()
        }
    }

    #[test]
    fn promotion_is_one_way() {
        let mut state = Promotion::default();
        assert!(!state.observe(0.97, 0.98));
        assert!(state.observe(0.98, 0.98));
        assert!(state.is_trusted());
        assert!(!state.observe(0.99, 0.98));
        assert!(!state.observe(0.1, 0.98));
        assert_eq!(state, Promotion::Trusted);
    }

    #[test]
    fn invalid_settings_are_rejected_up_front() {
        let store = LabelStore::new(Vec::new());
        let result = Campaign::new(
            CountingClassifier::default(),
            pool(1),
            store,
            settings(0, ReingestPolicy::Full),
        );
        assert!(matches!(result, Err(ConfigError::InvalidBatchSize(0))));
    }

    #[test]
    fn empty_pool_primes_but_runs_no_rounds() {
        let store = LabelStore::new(vec![Record::vocabulary("a")]);
        let outcome = Campaign::new(
            CountingClassifier::default(),
            pool(0),
            store,
            settings(2, ReingestPolicy::Full),
        )
        .unwrap()
        .run()
        .unwrap();
        assert!(outcome.rounds.is_empty());
        assert!(outcome.ledger.all().is_empty());
        assert_eq!(outcome.classifier.adds, vec![1]);
    }

    #[test]
    fn full_reingest_passes_whole_store() {
        let store = LabelStore::new(vec![Record::vocabulary("a")]);
        let outcome = Campaign::new(
            CountingClassifier::default(),
            pool(4),
            store,
            settings(2, ReingestPolicy::Full),
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(outcome.classifier.adds, vec![1, 3, 5]);
        assert_eq!(outcome.promoted_at, None);
    }

    #[test]
    fn delta_reingest_passes_new_records_only() {
        let store = LabelStore::new(vec![Record::vocabulary("a")]);
        let outcome = Campaign::new(
            CountingClassifier::default(),
            pool(4),
            store,
            settings(2, ReingestPolicy::Delta),
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(outcome.classifier.adds, vec![1, 2, 2]);
    }

    #[test]
    fn pretrained_classifier_skips_priming() {
        let classifier = CountingClassifier {
            pretrained: true,
            adds: Vec::new(),
        };
        let store = LabelStore::new(vec![Record::vocabulary("a")]);
        let outcome = Campaign::new(classifier, pool(2), store, settings(2, ReingestPolicy::Delta))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(outcome.classifier.adds, vec![3]);
        assert_eq!(outcome.people, 2);
    }
}
