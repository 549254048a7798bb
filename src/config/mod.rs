mod serde_helpers;
mod validation;

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::Severity;
use serde_helpers::{load_env_path, load_env_string, load_env_var};

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

const MEGABYTE: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Destination family of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    File,
    /// Any kind name this build has no sink for.
    #[serde(other)]
    Unrecognized,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::File => "file",
            SinkKind::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown names are kept as `Unrecognized` so `Logger::new` reports them.
impl FromStr for SinkKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "file" => SinkKind::File,
            _ => SinkKind::Unrecognized,
        })
    }
}

/// Size, age and backup-count limits for the rotating file sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    pub path: PathBuf,
    /// Megabytes before the active file is rotated. 0 means 100.
    pub max_size_mb: u64,
    /// Backups to retain. 0 keeps all of them.
    pub max_backups: usize,
    /// Days to retain backups. 0 disables age eviction.
    pub max_age_days: u64,
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }
}

impl RotationPolicy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        let mb = if self.max_size_mb == 0 {
            DEFAULT_MAX_SIZE_MB
        } else {
            self.max_size_mb
        };
        mb.saturating_mul(MEGABYTE)
    }

    pub fn max_age(&self) -> Option<chrono::Duration> {
        if self.max_age_days == 0 {
            return None;
        }
        i64::try_from(self.max_age_days)
            .ok()
            .and_then(chrono::Duration::try_days)
    }
}

/// Ordered context field names the formatter extracts per message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextFieldConfig {
    keys: Vec<String>,
}

impl ContextFieldConfig {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma separated list, dropping blank entries.
    pub fn parse_list(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty()),
        )
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub sink_kind: SinkKind,
    pub level: Severity,
    pub file: Option<RotationPolicy>,
    pub context_fields: ContextFieldConfig,
    /// chrono strftime format for the record timestamp.
    pub time_format: String,
    /// Advisory only: records are always written synchronously.
    pub batch_size: usize,
    /// Advisory only: there is no background flusher.
    #[serde(rename = "flush_timeout_ms", with = "serde_helpers::duration_millis")]
    pub flush_timeout: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sink_kind: SinkKind::File,
            level: Severity::Info,
            file: None,
            context_fields: ContextFieldConfig::default(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

impl LoggerConfig {
    /// File sink with default rotation limits.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(RotationPolicy::new(path)),
            ..Self::default()
        }
    }

    /// Ready-made setup writing to `<log_folder>/logs/<file_name>`: 1 MB files,
    /// two compressed backups kept for one day.
    pub fn example(log_folder: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            time_format: "%d-%m-%Y %H:%M:%S".to_string(),
            file: Some(RotationPolicy {
                path: log_folder.as_ref().join("logs").join(file_name),
                max_size_mb: 1,
                max_backups: 2,
                max_age_days: 1,
                compress: true,
            }),
            batch_size: 100,
            flush_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    pub fn with_context_fields(mut self, fields: ContextFieldConfig) -> Self {
        self.context_fields = fields;
        self
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: LoggerConfig = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Defaults overridden by `RASK_LOGGER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        load_env_var("RASK_LOGGER_SINK", &mut self.sink_kind)?;
        load_env_var("RASK_LOGGER_LEVEL", &mut self.level)?;
        load_env_string("RASK_LOGGER_TIME_FORMAT", &mut self.time_format);
        load_env_var("RASK_LOGGER_BATCH_SIZE", &mut self.batch_size)?;

        let mut flush_timeout_ms = self.flush_timeout.as_millis() as u64;
        load_env_var("RASK_LOGGER_FLUSH_TIMEOUT_MS", &mut flush_timeout_ms)?;
        self.flush_timeout = Duration::from_millis(flush_timeout_ms);

        if let Ok(raw) = std::env::var("RASK_LOGGER_CONTEXT_FIELDS") {
            self.context_fields = ContextFieldConfig::parse_list(&raw);
        }

        let mut policy = self.file.clone().unwrap_or_default();
        load_env_path("RASK_LOGGER_FILE_PATH", &mut policy.path);
        load_env_var("RASK_LOGGER_MAX_SIZE_MB", &mut policy.max_size_mb)?;
        load_env_var("RASK_LOGGER_MAX_BACKUPS", &mut policy.max_backups)?;
        load_env_var("RASK_LOGGER_MAX_AGE_DAYS", &mut policy.max_age_days)?;
        load_env_var("RASK_LOGGER_COMPRESS", &mut policy.compress)?;
        if !policy.path.as_os_str().is_empty() {
            self.file = Some(policy);
        }

        Ok(())
    }
}
