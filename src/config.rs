//! TOML run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::campaign::CampaignSettings;
use crate::dataset::export::ArtifactPaths;
use crate::ml::vector::DEFAULT_DIMENSIONS;

/// File name of the default configuration inside the app root.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        /// Directory path that failed to create.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Confidence threshold outside `[0, 1]`.
    #[error("limit must be within [0, 1], got {0}")]
    InvalidLimit(f64),
    /// Oracle batch size of zero.
    #[error("batch_size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
    /// Promotion threshold outside `[0, 1]`.
    #[error("accept_precision must be within [0, 1], got {0}")]
    InvalidAcceptPrecision(f64),
    /// Classifier neighbour count of zero.
    #[error("classifier.neighbors must be at least 1, got {0}")]
    InvalidNeighbors(usize),
    /// Classifier embedding width of zero.
    #[error("classifier.dimensions must be at least 1, got {0}")]
    InvalidDimensions(usize),
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Input files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Training pool CSV (`phrase, subtopic[, frequency]`).
    pub pool: PathBuf,
    /// Taxonomy CSV providing the bootstrap vocabulary.
    pub bootstrap: PathBuf,
    /// Column of `bootstrap` holding the vocabulary.
    pub bootstrap_column: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            pool: PathBuf::from("data/processed/train.csv"),
            bootstrap: PathBuf::from("data/input/classifier.csv"),
            bootstrap_column: "subtopic".to_string(),
        }
    }
}

/// Bundled nearest-phrase classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub neighbors: usize,
    pub dimensions: usize,
    /// Pre-trained index to start from.
    pub snapshot: Option<PathBuf>,
    /// Where to save the index once the campaign completes.
    pub save_snapshot: Option<PathBuf>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            neighbors: 1,
            dimensions: DEFAULT_DIMENSIONS,
            snapshot: None,
            save_snapshot: None,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory receiving the end-of-run artifacts.
    pub dir: PathBuf,
    /// Label-store checkpoint rewritten after every append.
    pub checkpoint: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/model"),
            checkpoint: PathBuf::from("data/model/in_model.csv"),
        }
    }
}

/// Everything needed to run one campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub inputs: InputSettings,
    pub campaign: CampaignSettings,
    pub classifier: ClassifierSettings,
    pub output: OutputSettings,
}

impl RunConfig {
    /// Parse a config file; missing sections and keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<app root>/config.toml`, or defaults when it does not exist.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = config_path()?;
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.campaign.validate()?;
        if self.classifier.neighbors == 0 {
            return Err(ConfigError::InvalidNeighbors(self.classifier.neighbors));
        }
        if self.classifier.dimensions == 0 {
            return Err(ConfigError::InvalidDimensions(self.classifier.dimensions));
        }
        Ok(())
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(
            &self.output.dir,
            self.campaign.limit,
            self.campaign.batch_size,
        )
    }
}

/// Path of the default config file inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

fn map_app_dir_error(error: AppDirError) -> ConfigError {
    match error {
        AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::ReingestPolicy;
    use crate::ml::metrics::PrecisionAverage;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[campaign]\nlimit = 0.9\nreingest = \"delta\"\nprecision_average = \"macro\"\n\n[output]\ndir = \"out\"\n",
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.campaign.limit, 0.9);
        assert_eq!(config.campaign.batch_size, 500);
        assert_eq!(config.campaign.accept_precision, 0.98);
        assert_eq!(config.campaign.reingest, ReingestPolicy::Delta);
        assert_eq!(config.campaign.precision_average, PrecisionAverage::Macro);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(
            config.output.checkpoint,
            PathBuf::from("data/model/in_model.csv")
        );
        assert_eq!(config.inputs.bootstrap_column, "subtopic");
        assert!(config.classifier.snapshot.is_none());
    }

    #[test]
    fn malformed_toml_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[campaign\nlimit = ").unwrap();

        let err = RunConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = RunConfig::default();
        assert!(config.validate().is_ok());

        config.campaign.limit = 1.2;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));
        config.campaign.limit = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));
        config.campaign.limit = 0.5;

        config.campaign.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchSize(0))
        ));
        config.campaign.batch_size = 1;

        config.campaign.accept_precision = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAcceptPrecision(_))
        ));
        config.campaign.accept_precision = 0.98;

        config.classifier.neighbors = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNeighbors(0))
        ));
    }

    #[test]
    fn load_or_default_reads_app_root_config() {
        let dir = tempdir().unwrap();
        let _guard = app_dirs::OverrideGuard::set(dir.path().to_path_buf());

        let config = RunConfig::load_or_default().unwrap();
        assert_eq!(config, RunConfig::default());

        std::fs::write(
            dir.path().join(app_dirs::APP_DIR_NAME).join(CONFIG_FILE_NAME),
            "[campaign]\nbatch_size = 25\n",
        )
        .unwrap();
        let config = RunConfig::load_or_default().unwrap();
        assert_eq!(config.campaign.batch_size, 25);
    }

    #[test]
    fn artifact_paths_use_output_dir() {
        let mut config = RunConfig::default();
        config.output.dir = PathBuf::from("runs");
        config.campaign.batch_size = 50;
        assert_eq!(
            config.artifact_paths().all_metrics,
            PathBuf::from("runs/0.8_50_all_metrics.csv")
        );
    }
}
