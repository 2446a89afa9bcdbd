//! Run a campaign end to end from a [`RunConfig`].

use tracing::{info, warn};

use crate::campaign::{Campaign, CampaignOutcome};
use crate::config::RunConfig;
use crate::dataset::export::{ArtifactPaths, write_artifacts};
use crate::dataset::loader::{load_bootstrap, load_pool};
use crate::error::RunError;
use crate::labeling::{LabelStore, RecordPool};
use crate::ml::classifier::Classifier;
use crate::ml::nearest::NearestPhraseClassifier;

/// Headline numbers of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub paths: ArtifactPaths,
    pub rounds: usize,
    pub people: usize,
    pub model: usize,
    pub promoted_at: Option<usize>,
    /// Aggregate precision of the last full-store evaluation.
    pub final_precision: Option<f64>,
    pub store_len: usize,
}

impl RunReport {
    fn from_outcome<C>(paths: ArtifactPaths, outcome: &CampaignOutcome<C>) -> Self {
        Self {
            paths,
            rounds: outcome.rounds.len(),
            people: outcome.people,
            model: outcome.model,
            promoted_at: outcome.promoted_at,
            final_precision: outcome.rounds.last().map(|round| round.full_precision),
            store_len: outcome.store.len(),
        }
    }
}

/// Run one campaign with the bundled nearest-phrase classifier.
///
/// A configured snapshot that does not exist yet is treated as an empty,
/// untrained index.
pub fn run_campaign(config: &RunConfig) -> Result<RunReport, RunError> {
    config.validate()?;
    let classifier = match &config.classifier.snapshot {
        Some(path) if path.exists() => NearestPhraseClassifier::load(path)?,
        Some(path) => {
            warn!(path = %path.display(), "classifier snapshot not found; starting untrained");
            fresh_classifier(config)
        }
        None => fresh_classifier(config),
    };

    let (report, outcome) = run_with_classifier(config, classifier)?;
    if let Some(path) = &config.classifier.save_snapshot {
        outcome.classifier.save(path)?;
        info!(path = %path.display(), entries = outcome.classifier.len(), "classifier snapshot saved");
    }
    Ok(report)
}

/// Load inputs, run the campaign with `classifier` and write the artifacts.
///
/// Artifacts are only written after the campaign completes; on failure the
/// label-store checkpoint is the only file left behind.
pub fn run_with_classifier<C: Classifier>(
    config: &RunConfig,
    classifier: C,
) -> Result<(RunReport, CampaignOutcome<C>), RunError> {
    config.validate()?;
    let pool = RecordPool::from_records(load_pool(&config.inputs.pool)?);
    let bootstrap = load_bootstrap(&config.inputs.bootstrap, &config.inputs.bootstrap_column)?;
    info!(
        pool = pool.len(),
        bootstrap = bootstrap.len(),
        "inputs loaded"
    );
    let store = LabelStore::with_checkpoint(bootstrap, &config.output.checkpoint)
        .map_err(RunError::Checkpoint)?;

    let outcome = Campaign::new(classifier, pool, store, config.campaign)?.run()?;

    let paths = config.artifact_paths();
    write_artifacts(&paths, &outcome.ledger, &outcome.marked).map_err(RunError::Export)?;
    info!(
        all_metrics = %paths.all_metrics.display(),
        marked_metrics = %paths.marked_metrics.display(),
        marked = %paths.marked.display(),
        "artifacts written"
    );
    Ok((RunReport::from_outcome(paths, &outcome), outcome))
}

fn fresh_classifier(config: &RunConfig) -> NearestPhraseClassifier {
    NearestPhraseClassifier::new(config.classifier.dimensions, config.classifier.neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_inputs(dir: &Path) -> RunConfig {
        let pool = dir.join("train.csv");
        std::fs::write(
            &pool,
            "phrase,subtopic,frequency\n\
             rose perfume,floral,9\n\
             lemon cologne,citrus,8\n\
             rose oil perfume,floral,7\n\
             lemon zest cologne,citrus,6\n\
             rose water perfume,floral,5\n\
             lime cologne,citrus,4\n",
        )
        .unwrap();
        let bootstrap = dir.join("classifier.csv");
        std::fs::write(&bootstrap, "topic,subtopic\nscent,floral\nscent,citrus\n").unwrap();

        let mut config = RunConfig::default();
        config.inputs.pool = pool;
        config.inputs.bootstrap = bootstrap;
        config.output.dir = dir.join("out");
        config.output.checkpoint = dir.join("out/in_model.csv");
        config.campaign.batch_size = 2;
        config.classifier.dimensions = 512;
        config
    }

    #[test]
    fn full_run_writes_artifacts_and_checkpoint() {
        let dir = tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.classifier.save_snapshot = Some(dir.path().join("index.json"));

        let report = run_campaign(&config).unwrap();

        assert_eq!(report.people + report.model, 6);
        assert_eq!(report.store_len, 8);
        assert!(report.paths.all_metrics.is_file());
        assert!(report.paths.marked_metrics.is_file());
        assert!(report.paths.marked.is_file());
        let checkpoint = std::fs::read_to_string(&config.output.checkpoint).unwrap();
        assert_eq!(checkpoint.lines().count(), 9);

        let saved = NearestPhraseClassifier::load(&dir.path().join("index.json")).unwrap();
        assert_eq!(saved.len(), 8);
    }

    #[test]
    fn missing_snapshot_starts_untrained() {
        let dir = tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.classifier.snapshot = Some(dir.path().join("absent.json"));
        assert!(run_campaign(&config).is_ok());
    }

    #[test]
    fn invalid_config_fails_before_reading_inputs() {
        let dir = tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.campaign.batch_size = 0;
        std::fs::remove_file(&config.inputs.pool).unwrap();

        let err = run_campaign(&config).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
        assert!(!config.output.checkpoint.exists());
    }

    #[test]
    fn missing_pool_is_input_error() {
        let dir = tempdir().unwrap();
        let config = write_inputs(dir.path());
        std::fs::remove_file(&config.inputs.pool).unwrap();

        let err = run_campaign(&config).unwrap_err();
        assert!(matches!(err, RunError::Input(_)));
    }
}
