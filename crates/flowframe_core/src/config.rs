//! Runtime configuration resolution.
//!
//! # Responsibility
//! - Resolve database path, log directory and log level from the environment.
//! - Validate raw values before they reach `db` or `logging`.
//!
//! # Invariants
//! - A resolved `log_dir` is always absolute.
//! - Unset variables fall back to defaults; set-but-invalid values are errors.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "FLOWFRAME_DB_PATH";
pub const ENV_LOG_DIR: &str = "FLOWFRAME_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "FLOWFRAME_LOG_LEVEL";

/// Database file used when `FLOWFRAME_DB_PATH` is unset.
pub const DEFAULT_DB_FILE: &str = "flowframe.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedLogLevel(String),
    RelativeLogDir(String),
    EmptyValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{dir}`")
            }
            Self::EmptyValue(key) => write!(f, "{key} cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Supported log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::UnsupportedLogLevel(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> LogLevel {
    if cfg!(debug_assertions) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_DB_PATH) {
            config.db_path = normalize_db_path(&raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_DIR) {
            config.log_dir = Some(normalize_log_dir(&raw)?);
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            config.log_level = LogLevel::parse(&raw)?;
        }
        Ok(config)
    }
}

fn normalize_db_path(raw: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue(ENV_DB_PATH));
    }
    Ok(PathBuf::from(trimmed))
}

pub(crate) fn normalize_log_dir(raw: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyValue(ENV_LOG_DIR));
    }
    let path = PathBuf::from(trimmed);
    if !path.is_absolute() {
        return Err(ConfigError::RelativeLogDir(trimmed.to_string()));
    }
    Ok(path)
}
