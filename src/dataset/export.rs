//! CSV writers for the label-store checkpoint and the end-of-run artifacts.
//!
//! Every file is written to a temp file next to its destination and then
//! persisted over it, so readers never observe a half-written checkpoint.

use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::campaign::ledger::{MetricsLedger, MetricsRow};
use crate::labeling::Record;

/// Column order of the checkpoint and the marked-records artifact.
pub const LABELED_HEADERS: [&str; 3] = ["phrase", "subtopic", "subtopic_true"];
/// Column order of both metrics ledgers.
pub const METRICS_HEADERS: [&str; 9] = [
    "round",
    "label",
    "precision",
    "recall",
    "f1_score",
    "support",
    "model_from_val",
    "model_from_all",
    "people_from_val",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create temp file for {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write CSV {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("Failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}

#[derive(Serialize)]
struct LabeledRow<'a> {
    phrase: &'a str,
    subtopic: &'a str,
    subtopic_true: &'a str,
}

#[derive(Serialize)]
struct MetricsLine<'a> {
    round: usize,
    label: &'a str,
    precision: f64,
    recall: f64,
    f1_score: f64,
    support: u64,
    model_from_val: usize,
    model_from_all: usize,
    people_from_val: usize,
}

/// Output files of one run, named after its `(limit, batch_size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub all_metrics: PathBuf,
    pub marked_metrics: PathBuf,
    pub marked: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, limit: f64, batch_size: usize) -> Self {
        // `{:?}` keeps the fractional part for whole numbers (`1.0`, not `1`).
        let prefix = format!("{limit:?}_{batch_size}");
        Self {
            all_metrics: dir.join(format!("{prefix}_all_metrics.csv")),
            marked_metrics: dir.join(format!("{prefix}_marked_metrics.csv")),
            marked: dir.join(format!("{prefix}_marked.csv")),
        }
    }
}

/// Rewrite `path` with `phrase, subtopic, subtopic_true` rows.
pub fn write_labeled_records(path: &Path, records: &[Record]) -> Result<(), ExportError> {
    write_rows(
        path,
        &LABELED_HEADERS,
        records.iter().map(|record| LabeledRow {
            phrase: record.phrase(),
            subtopic: record.subtopic(),
            subtopic_true: record.subtopic_true(),
        }),
    )
}

/// Write a metrics ledger in long format: one line per report row per round.
pub fn write_metrics(path: &Path, rows: &[MetricsRow]) -> Result<(), ExportError> {
    let lines = rows.iter().flat_map(|row| {
        row.report.lines().into_iter().map(move |line| MetricsLine {
            round: row.round,
            label: line.label,
            precision: line.precision,
            recall: line.recall,
            f1_score: line.f1,
            support: line.support,
            model_from_val: row.counters.model_from_val,
            model_from_all: row.counters.model_from_all,
            people_from_val: row.counters.people_from_val,
        })
    });
    write_rows(path, &METRICS_HEADERS, lines)
}

/// Write all three end-of-run artifacts.
pub fn write_artifacts(
    paths: &ArtifactPaths,
    ledger: &MetricsLedger,
    marked: &[Record],
) -> Result<(), ExportError> {
    write_metrics(&paths.all_metrics, ledger.all())?;
    write_metrics(&paths.marked_metrics, ledger.marked())?;
    write_labeled_records(&paths.marked, marked)?;
    Ok(())
}

fn write_rows<T: Serialize>(
    path: &Path,
    headers: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<(), ExportError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })?;
    let tmp = NamedTempFile::new_in(parent).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(tmp);
    writer.write_record(headers).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    let tmp = writer.into_inner().map_err(|err| ExportError::Flush {
        path: path.to_path_buf(),
        source: err.into_error(),
    })?;
    tmp.persist(path).map_err(|source| ExportError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::ledger::RoundCounters;
    use crate::ml::metrics::ClassificationReport;
    use tempfile::tempdir;

    #[test]
    fn artifact_names_follow_run_parameters() {
        let paths = ArtifactPaths::new(Path::new("out"), 0.8, 500);
        assert_eq!(paths.all_metrics, Path::new("out/0.8_500_all_metrics.csv"));
        assert_eq!(
            paths.marked_metrics,
            Path::new("out/0.8_500_marked_metrics.csv")
        );
        assert_eq!(paths.marked, Path::new("out/0.8_500_marked.csv"));

        let whole = ArtifactPaths::new(Path::new("out"), 1.0, 10);
        assert_eq!(whole.marked, Path::new("out/1.0_10_marked.csv"));
    }

    #[test]
    fn labeled_records_round_trip_through_checkpoint_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/in_model.csv");
        let records = vec![
            Record::vocabulary("floral"),
            Record::new("rose, red", "floral", 1.0).with_label("woody"),
        ];

        write_labeled_records(&path, &records).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "phrase,subtopic,subtopic_true\nfloral,floral,floral\n\"rose, red\",woody,floral\n"
        );
    }

    #[test]
    fn empty_ledger_still_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marked_metrics.csv");
        write_metrics(&path, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), METRICS_HEADERS.join(","));
    }

    #[test]
    fn metrics_rows_expand_to_report_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_metrics.csv");
        let report =
            ClassificationReport::from_labels(&["a", "b"], &["a".to_string(), "a".to_string()])
                .unwrap();
        let row = MetricsRow {
            round: 1,
            report,
            counters: RoundCounters {
                model_from_val: 2,
                model_from_all: 0,
                people_from_val: 7,
            },
        };

        write_metrics(&path, &[row]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // header + a + b + accuracy + macro avg + weighted avg
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "1,a,0.5,1.0,0.6666666666666666,1,2,0,7");
        assert!(lines[3].starts_with("1,accuracy,0.5,"));
        assert!(lines[4].starts_with("1,macro avg,"));
        assert!(lines[5].starts_with("1,weighted avg,"));
    }
}
