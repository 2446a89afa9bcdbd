//! Evaluation metrics for classification models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::classifier::ClassifierError;

#[derive(Debug, Clone)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| v as u64).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`, `0.0` when nothing was predicted as the class.
    pub precision: f64,
    /// `TP / (TP + FN)`, `0.0` when the class has no true examples.
    pub recall: f64,
    /// Total number of true examples for the class.
    pub support: u32,
}

impl PerClassStats {
    pub fn f1(&self) -> f64 {
        f1_score(self.precision, self.recall)
    }
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f64;
        let mut fp = 0f64;
        let mut fn_ = 0f64;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f64;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f64;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let mut correct = 0u64;
    for class_idx in 0..cm.n_classes {
        correct += cm.get(class_idx, class_idx) as u64;
    }
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// Harmonic mean of precision and recall, `0.0` when both are zero.
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Which aggregate precision a caller is interested in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionAverage {
    /// Support-weighted mean of per-class precision.
    #[default]
    Weighted,
    /// Unweighted mean of per-class precision.
    Macro,
    /// Global precision; equal to accuracy for single-label predictions.
    Micro,
}

/// Metrics for one label of a [`ClassificationReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Averaged metrics over all labels of a [`ClassificationReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Per-class and aggregate precision/recall/F1/support.
///
/// Labels are the sorted union of true and predicted labels, so predictions
/// outside the true label set count as false positives of their own class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

/// One printable row of a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportLine<'a> {
    pub label: &'a str,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

impl ClassificationReport {
    /// Build a report from aligned true and predicted labels.
    pub fn from_labels(
        true_labels: &[&str],
        predicted: &[String],
    ) -> Result<Self, ClassifierError> {
        if true_labels.len() != predicted.len() {
            return Err(ClassifierError::LengthMismatch {
                expected: true_labels.len(),
                actual: predicted.len(),
            });
        }
        let mut classes: BTreeMap<&str, usize> = BTreeMap::new();
        for label in true_labels
            .iter()
            .copied()
            .chain(predicted.iter().map(String::as_str))
        {
            classes.entry(label).or_insert(0);
        }
        for (idx, slot) in classes.values_mut().enumerate() {
            *slot = idx;
        }

        let mut cm = ConfusionMatrix::new(classes.len());
        for (truth, pred) in true_labels.iter().zip(predicted) {
            cm.add(classes[truth], classes[pred.as_str()]);
        }

        let stats = precision_recall_by_class(&cm);
        let per_class: Vec<ClassMetrics> = classes
            .keys()
            .zip(&stats)
            .map(|(label, stats)| ClassMetrics {
                label: (*label).to_string(),
                precision: stats.precision,
                recall: stats.recall,
                f1: stats.f1(),
                support: stats.support as u64,
            })
            .collect();

        let total = cm.total();
        Ok(Self {
            accuracy: accuracy(&cm),
            macro_avg: macro_average(&per_class, total),
            weighted_avg: weighted_average(&per_class, total),
            per_class,
        })
    }

    /// Number of evaluated items.
    pub fn support(&self) -> u64 {
        self.weighted_avg.support
    }

    /// Aggregate precision under the requested averaging.
    pub fn precision(&self, average: PrecisionAverage) -> f64 {
        match average {
            PrecisionAverage::Weighted => self.weighted_avg.precision,
            PrecisionAverage::Macro => self.macro_avg.precision,
            PrecisionAverage::Micro => self.accuracy,
        }
    }

    pub fn class(&self, label: &str) -> Option<&ClassMetrics> {
        self.per_class.iter().find(|class| class.label == label)
    }

    /// Rows in report order: each class, then `accuracy`, `macro avg`, `weighted avg`.
    pub fn lines(&self) -> Vec<ReportLine<'_>> {
        let total = self.support();
        let mut lines: Vec<ReportLine<'_>> = self
            .per_class
            .iter()
            .map(|class| ReportLine {
                label: &class.label,
                precision: class.precision,
                recall: class.recall,
                f1: class.f1,
                support: class.support,
            })
            .collect();
        lines.push(ReportLine {
            label: "accuracy",
            precision: self.accuracy,
            recall: self.accuracy,
            f1: self.accuracy,
            support: total,
        });
        for (label, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            lines.push(ReportLine {
                label,
                precision: avg.precision,
                recall: avg.recall,
                f1: avg.f1,
                support: avg.support,
            });
        }
        lines
    }
}

fn macro_average(per_class: &[ClassMetrics], total: u64) -> AverageMetrics {
    if per_class.is_empty() {
        return AverageMetrics::default();
    }
    let n = per_class.len() as f64;
    AverageMetrics {
        precision: per_class.iter().map(|c| c.precision).sum::<f64>() / n,
        recall: per_class.iter().map(|c| c.recall).sum::<f64>() / n,
        f1: per_class.iter().map(|c| c.f1).sum::<f64>() / n,
        support: total,
    }
}

fn weighted_average(per_class: &[ClassMetrics], total: u64) -> AverageMetrics {
    if total == 0 {
        return AverageMetrics::default();
    }
    let weight = |c: &ClassMetrics| c.support as f64 / total as f64;
    AverageMetrics {
        precision: per_class.iter().map(|c| c.precision * weight(c)).sum(),
        recall: per_class.iter().map(|c| c.recall * weight(c)).sum(),
        f1: per_class.iter().map(|c| c.f1 * weight(c)).sum(),
        support: total,
    }
}
