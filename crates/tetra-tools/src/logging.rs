//! Global `tracing` subscriber setup.
//!
//! Environment variables:
//! - `TETRA_TRACE`: filter directives, e.g. `debug` or `tetra_highs=trace` (default `off`)
//! - `TETRA_LOG_FORMAT`: `pretty` or `json` (default `pretty`)
//! - `TETRA_LOG_FILE`: also append events to this file

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const TRACE_ENV: &str = "TETRA_TRACE";
pub const FORMAT_ENV: &str = "TETRA_LOG_FORMAT";
pub const FILE_ENV: &str = "TETRA_LOG_FILE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if value.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(LoggingError::InvalidFormat(value.to_string()))
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidFilter(String),
    InvalidFormat(String),
    LogFile { path: PathBuf, source: io::Error },
    Init(String),
}

impl LoggingError {
    pub fn code(&self) -> &'static str {
        match self {
            LoggingError::InvalidFilter(_) => "TOOLS_LOG_INVALID_FILTER",
            LoggingError::InvalidFormat(_) => "TOOLS_LOG_INVALID_FORMAT",
            LoggingError::LogFile { .. } => "TOOLS_LOG_FILE",
            LoggingError::Init(_) => "TOOLS_LOG_INIT",
        }
    }
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.code())?;
        match self {
            LoggingError::InvalidFilter(detail) => write!(f, "Invalid log filter: {detail}"),
            LoggingError::InvalidFormat(value) => write!(
                f,
                "Invalid {FORMAT_ENV} '{value}' (expected 'json' or 'pretty')"
            ),
            LoggingError::LogFile { path, source } => {
                write!(f, "Failed to open log file {}: {source}", path.display())
            }
            LoggingError::Init(detail) => write!(f, "Failed to initialize logging: {detail}"),
        }
    }
}

impl std::error::Error for LoggingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoggingError::LogFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub filter: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            filter: "off".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LogOptions {
    /// Read the `TETRA_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `TETRA_LOG_FORMAT` holds an unknown format.
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggingError> {
        let format = match lookup(FORMAT_ENV) {
            Some(value) => value.parse()?,
            None => LogFormat::Pretty,
        };
        Ok(Self {
            filter: lookup(TRACE_ENV).unwrap_or_else(|| "off".to_string()),
            format,
            file: lookup(FILE_ENV)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if self.filter.eq_ignore_ascii_case("off") {
            return Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()));
        }
        EnvFilter::try_new(&self.filter).map_err(|err| LoggingError::InvalidFilter(err.to_string()))
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn map_init_err<E: std::fmt::Display>(err: E) -> LoggingError {
    LoggingError::Init(err.to_string())
}

/// Install the global subscriber.
///
/// Returns `Ok(true)` when installed and `Ok(false)` if a subscriber was
/// already set.
///
/// # Errors
///
/// Returns an error for an invalid filter, an unopenable log file, or a
/// failed installation.
pub fn init_logging(options: &LogOptions) -> Result<bool, LoggingError> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let filter = options.env_filter()?;
    let file = options.file.as_deref().map(open_log_file).transpose()?;

    match options.format {
        LogFormat::Json => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .json();
            let base = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer);
            if let Some(file) = file {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .json();
                base.with(file_layer).try_init().map_err(map_init_err)?;
            } else {
                base.try_init().map_err(map_init_err)?;
            }
        }
        LogFormat::Pretty => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .pretty();
            let base = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer);
            if let Some(file) = file {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .pretty();
                base.with(file_layer).try_init().map_err(map_init_err)?;
            } else {
                base.try_init().map_err(map_init_err)?;
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let options = LogOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, LogOptions::default());
        assert_eq!(options.filter, "off");
    }

    #[test]
    fn test_reads_environment() {
        let options = LogOptions::from_lookup(lookup(&[
            (TRACE_ENV, "tetra_highs=trace"),
            (FORMAT_ENV, "JSON"),
            (FILE_ENV, "/tmp/tetra.log"),
        ]))
        .unwrap();
        assert_eq!(options.filter, "tetra_highs=trace");
        assert_eq!(options.format, LogFormat::Json);
        assert_eq!(options.file, Some(PathBuf::from("/tmp/tetra.log")));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = LogOptions::from_lookup(lookup(&[(FORMAT_ENV, "xml")])).unwrap_err();
        assert_eq!(err.code(), "TOOLS_LOG_INVALID_FORMAT");
        assert!(err.to_string().contains("'xml'"));
    }

    #[test]
    fn test_filters() {
        assert!(LogOptions::default().env_filter().is_ok());
        assert!(LogOptions::default().with_filter("debug").env_filter().is_ok());
        let err = LogOptions::default()
            .with_filter("tetra=notalevel")
            .env_filter()
            .unwrap_err();
        assert_eq!(err.code(), "TOOLS_LOG_INVALID_FILTER");
    }

    #[test]
    fn test_unopenable_file() {
        let options = LogOptions::default().with_file("/nonexistent-dir/tetra/log.txt");
        let err = open_log_file(options.file.as_deref().unwrap()).unwrap_err();
        assert_eq!(err.code(), "TOOLS_LOG_FILE");
    }

    #[test]
    fn test_second_init_is_noop() {
        let options = LogOptions::default().with_format(LogFormat::Json);
        init_logging(&options).unwrap();
        assert!(!init_logging(&options).unwrap());
    }
}
