use std::cell::Cell;
use std::collections::HashMap;

use labelsim::labeling::Record;
use labelsim::ml::classifier::{Classifier, ClassifierError, PredictionBatch, UNKNOWN_LABEL};
use labelsim::ml::metrics::ClassificationReport;

/// Classifier whose answers, confidences and reported precision are fixed up front.
///
/// Predictions come from an answer table (phrase -> label). The aggregate
/// precision reported for round `r` is `precisions[r - 1]`, with the last
/// entry repeating.
#[derive(Debug)]
pub struct ScriptedClassifier {
    answers: HashMap<String, String>,
    confidences: HashMap<String, f64>,
    default_confidence: f64,
    precisions: Vec<f64>,
    pretrained: bool,
    fail_on_predict: Option<usize>,
    short_from_round: Option<usize>,
    predict_calls: Cell<usize>,
    pub add_calls: Vec<usize>,
}

impl ScriptedClassifier {
    /// Answer every record with its ground truth.
    pub fn knowing(records: &[Record]) -> Self {
        Self {
            answers: records
                .iter()
                .map(|r| (r.phrase().to_string(), r.subtopic_true().to_string()))
                .collect(),
            confidences: HashMap::new(),
            default_confidence: 1.0,
            precisions: vec![0.0],
            pretrained: false,
            fail_on_predict: None,
            short_from_round: None,
            predict_calls: Cell::new(0),
            add_calls: Vec::new(),
        }
    }

    pub fn with_precisions(mut self, precisions: &[f64]) -> Self {
        self.precisions = precisions.to_vec();
        self
    }

    pub fn with_confidence(mut self, phrase: &str, confidence: f64) -> Self {
        self.confidences.insert(phrase.to_string(), confidence);
        self
    }

    pub fn pretrained(mut self) -> Self {
        self.pretrained = true;
        self
    }

    /// Fail the `n`-th `predict` call (1-based).
    pub fn failing_on_predict(mut self, n: usize) -> Self {
        self.fail_on_predict = Some(n);
        self
    }

    /// From round `n` on, accept every position but drop the last prediction.
    pub fn short_from_round(mut self, n: usize) -> Self {
        self.short_from_round = Some(n);
        self
    }

    fn current_round(&self) -> usize {
        self.add_calls.len() + usize::from(self.pretrained)
    }

    fn scheduled_precision(&self) -> f64 {
        let idx = self.current_round().saturating_sub(1);
        self.precisions
            .get(idx)
            .or(self.precisions.last())
            .copied()
            .unwrap_or(0.0)
    }
}

impl Classifier for ScriptedClassifier {
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
        self.add_calls.push(phrases.len());
        Ok(())
    }

    fn predict(
        &self,
        phrases: &[&str],
        confidence_threshold: f64,
    ) -> Result<PredictionBatch, ClassifierError> {
        let call = self.predict_calls.get() + 1;
        self.predict_calls.set(call);
        if self.fail_on_predict == Some(call) {
            return Err(ClassifierError::InvalidThreshold(confidence_threshold));
        }
        let scored = phrases
            .iter()
            .map(|phrase| {
                let label = self
                    .answers
                    .get(*phrase)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                let confidence = self
                    .confidences
                    .get(*phrase)
                    .copied()
                    .unwrap_or(self.default_confidence);
                (label, confidence)
            })
            .collect();
        let mut batch = PredictionBatch::from_scored(scored, confidence_threshold);
        if self
            .short_from_round
            .is_some_and(|round| self.current_round() >= round)
        {
            batch.indices = (0..phrases.len()).collect();
            batch.predictions.pop();
            batch.confidences.pop();
        }
        Ok(batch)
    }

    fn metrics(
        &self,
        true_labels: &[&str],
        predicted: &[String],
    ) -> Result<ClassificationReport, ClassifierError> {
        let mut report = ClassificationReport::from_labels(true_labels, predicted)?;
        let precision = self.scheduled_precision();
        report.weighted_avg.precision = precision;
        report.macro_avg.precision = precision;
        report.accuracy = precision;
        Ok(report)
    }
}
