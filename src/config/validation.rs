use chrono::format::{Item, StrftimeItems};

use super::{ConfigError, LoggerConfig, SinkKind};

impl LoggerConfig {
    /// Checks the settings a sink needs before it is opened.
    ///
    /// An unrecognized sink kind is not rejected here; `Logger::new` reports it
    /// as `InvalidConfiguration` when selecting the sink.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_format.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Time format cannot be empty".to_string(),
            ));
        }

        // An unparseable specifier makes every record fail to format.
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidConfig(format!(
                "Time format is not a valid strftime pattern: {}",
                self.time_format
            )));
        }

        if self.sink_kind == SinkKind::File {
            let policy = self.file.as_ref().ok_or_else(|| {
                ConfigError::InvalidConfig("File sink requires a file configuration".to_string())
            })?;

            if policy.path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "File sink path cannot be empty".to_string(),
                ));
            }

            if policy.path.file_name().is_none() {
                return Err(ConfigError::InvalidConfig(format!(
                    "File sink path has no file name: {}",
                    policy.path.display()
                )));
            }
        }

        Ok(())
    }
}
