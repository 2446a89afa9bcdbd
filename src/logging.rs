//! Tracing setup for the `labelsim` binaries.
//!
//! A single campaign logs to stdout and `logs/labelsim_<launch>.log` through a
//! global subscriber. A sweep gives every `(limit, batch_size)` run its own
//! file, `logs/labelsim_<launch>_<limit>_<batch_size>.log`, installed only for
//! the duration of that run. Old launches are pruned together with all of
//! their run files.

use std::{
    collections::BTreeSet,
    fs::{self, File},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use tracing::{Dispatch, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Launches whose logs are kept.
const MAX_LAUNCHES: usize = 10;
const LOG_PREFIX: &str = "labelsim_";
const LOG_EXTENSION: &str = ".log";
const LAUNCH_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
/// Length of a formatted launch stamp, e.g. `2023-11-14_22-13-20`.
const LAUNCH_LEN: usize = 19;

static SESSION_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No directory available for log files")]
    NoLogDir,
    #[error("Log file operation failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file timestamp: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber for a single campaign.
///
/// Later calls are no-ops. Callers keep running without logs on error.
pub fn init() -> Result<(), LoggingError> {
    if SESSION_GUARD.get().is_some() {
        return Ok(());
    }
    let dir = log_dir()?;
    let path = dir.join(log_file_name(launch_time(), None)?);
    let (writer, guard) = open_writer(&path)?;
    prune_launches(&dir, MAX_LAUNCHES)?;

    tracing::subscriber::set_global_default(subscriber(writer))?;
    let _ = SESSION_GUARD.set(guard);
    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

/// Log files for one sweep launch.
#[derive(Debug, Clone)]
pub struct SweepLogs {
    dir: PathBuf,
    launched: OffsetDateTime,
}

impl SweepLogs {
    /// Resolve the log directory and make room for this launch.
    pub fn open() -> Result<Self, LoggingError> {
        let dir = log_dir()?;
        prune_launches(&dir, MAX_LAUNCHES - 1)?;
        Ok(Self {
            dir,
            launched: launch_time(),
        })
    }

    /// Create the log file for one grid point.
    pub fn run(&self, limit: f64, batch_size: usize) -> Result<RunLog, LoggingError> {
        let path = self
            .dir
            .join(log_file_name(self.launched, Some((limit, batch_size)))?);
        let (writer, guard) = open_writer(&path)?;
        Ok(RunLog {
            path,
            dispatch: Dispatch::new(subscriber(writer)),
            _guard: guard,
        })
    }
}

/// Subscriber scoped to a single sweep run. Dropping it flushes the file.
pub struct RunLog {
    path: PathBuf,
    dispatch: Dispatch,
    _guard: WorkerGuard,
}

impl RunLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` with this run's subscriber as the current default.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

fn subscriber(file: NonBlocking) -> impl Subscriber + Send + Sync + 'static {
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_timer(timer()).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer())
                .with_writer(file),
        )
}

fn timer() -> fmt::time::OffsetTime<BorrowedFormatItem<'static>> {
    const DISPLAY: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY.into())
}

fn open_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let file = File::create(path).map_err(io_error(path))?;
    Ok(tracing_appender::non_blocking(file))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LoggingError + use<> {
    let path = path.to_path_buf();
    move |source| LoggingError::Io { path, source }
}

fn log_dir() -> Result<PathBuf, LoggingError> {
    app_dirs::logs_dir().map_err(|err| match err {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoLogDir,
        app_dirs::AppDirError::CreateDir { path, source } => LoggingError::Io { path, source },
    })
}

fn launch_time() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `labelsim_<launch>[_<limit>_<batch_size>].log`
fn log_file_name(
    launched: OffsetDateTime,
    run: Option<(f64, usize)>,
) -> Result<String, LoggingError> {
    let stamp = launched.format(LAUNCH_FORMAT)?;
    Ok(match run {
        Some((limit, batch_size)) => {
            format!("{LOG_PREFIX}{stamp}_{limit:?}_{batch_size}{LOG_EXTENSION}")
        }
        None => format!("{LOG_PREFIX}{stamp}{LOG_EXTENSION}"),
    })
}

/// Launch stamp of a log file name, or `None` for files we did not write.
fn launch_stamp(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(LOG_PREFIX)?
        .strip_suffix(LOG_EXTENSION)?
        .get(..LAUNCH_LEN)
}

/// Delete every log belonging to launches older than the newest `keep`.
///
/// Stamps sort chronologically as strings.
fn prune_launches(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let logs: Vec<(String, PathBuf)> = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name();
            let stamp = launch_stamp(name.to_str()?)?.to_string();
            Some((stamp, entry.path()))
        })
        .collect();

    let launches: BTreeSet<&str> = logs.iter().map(|(stamp, _)| stamp.as_str()).collect();
    let expired: BTreeSet<&str> = launches
        .iter()
        .take(launches.len().saturating_sub(keep))
        .copied()
        .collect();
    for (stamp, path) in &logs {
        if expired.contains(stamp.as_str()) {
            fs::remove_file(path).map_err(io_error(path))?;
        }
    }
    Ok(())
}
