//! Loaders for the training pool and the bootstrap vocabulary.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use thiserror::Error;

use crate::labeling::Record;
use crate::text::canonical_phrase;

#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("Failed to open {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("Invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("{path} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path} line {line}: `{field}` is empty")]
    EmptyField {
        path: PathBuf,
        line: u64,
        field: &'static str,
    },
}

/// One row of the training pool file.
#[derive(Debug, Clone, Deserialize)]
struct PoolRow {
    phrase: String,
    subtopic: String,
    #[serde(default)]
    frequency: Option<f64>,
}

const POOL_REQUIRED_COLUMNS: [&str; 2] = ["phrase", "subtopic"];

/// Load the training pool (`phrase, subtopic[, frequency]`).
///
/// The `subtopic` column becomes both the working label and the withheld
/// ground truth. A missing `frequency` column or cell reads as `0.0`.
pub fn load_pool(path: &Path) -> Result<Vec<Record>, DatasetLoadError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| DatasetLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    for column in POOL_REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(DatasetLoadError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let raw = result.map_err(|source| csv_error(path, source))?;
        let line = raw.position().map(|pos| pos.line()).unwrap_or_default();
        let row: PoolRow = raw
            .deserialize(Some(&headers))
            .map_err(|source| csv_error(path, source))?;
        if row.phrase.is_empty() {
            return Err(empty_field(path, line, "phrase"));
        }
        if row.subtopic.is_empty() {
            return Err(empty_field(path, line, "subtopic"));
        }
        records.push(Record::new(
            row.phrase,
            row.subtopic,
            row.frequency.unwrap_or(0.0),
        ));
    }
    tracing::debug!(path = %path.display(), rows = records.len(), "pool loaded");
    Ok(records)
}

/// Load the bootstrap vocabulary from `column` of a taxonomy file.
///
/// Blank cells inherit the nearest non-blank value to their left in the same
/// row. Values are whitespace-canonicalized, blanks dropped, and duplicates
/// removed keeping the first occurrence.
pub fn load_bootstrap(path: &Path, column: &str) -> Result<Vec<Record>, DatasetLoadError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| DatasetLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| csv_error(path, source))?
        .clone();
    let column_idx = headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| DatasetLoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|source| csv_error(path, source))?;
        let term = canonical_phrase(forward_filled(&row, column_idx));
        if term.is_empty() || !seen.insert(term.clone()) {
            continue;
        }
        records.push(Record::vocabulary(term));
    }
    tracing::debug!(path = %path.display(), terms = records.len(), "bootstrap vocabulary loaded");
    Ok(records)
}

fn forward_filled(row: &StringRecord, idx: usize) -> &str {
    (0..=idx)
        .rev()
        .filter_map(|i| row.get(i))
        .find(|value| !value.trim().is_empty())
        .unwrap_or("")
}

fn csv_error(path: &Path, source: csv::Error) -> DatasetLoadError {
    DatasetLoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn empty_field(path: &Path, line: u64, field: &'static str) -> DatasetLoadError {
    DatasetLoadError::EmptyField {
        path: path.to_path_buf(),
        line,
        field,
    }
}
