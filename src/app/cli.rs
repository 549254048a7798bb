use clap::Parser;
use rask_logger::{ConfigError, ContextFieldConfig, LoggerConfig, Severity};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (takes precedence over the flags below)
    #[arg(long, env = "RASK_LOGGER_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Read RASK_LOGGER_* environment variables instead of the flags below
    #[arg(long)]
    pub from_env: bool,

    /// Folder that receives the `logs/` directory
    #[arg(long, default_value = ".")]
    pub log_folder: PathBuf,

    /// Active log file name
    #[arg(long, default_value = "app.log")]
    pub file_name: String,

    /// Minimum severity written to the file
    #[arg(long, default_value = "debug")]
    pub level: Severity,

    /// Context fields rendered in front of each message
    #[arg(long, default_value = "requestID,userID")]
    pub context_fields: String,

    /// Number of sample records to write
    #[arg(long, default_value = "1000")]
    pub lines: usize,
}

impl Cli {
    pub fn logger_config(&self) -> Result<LoggerConfig, ConfigError> {
        if let Some(path) = &self.config_file {
            return LoggerConfig::from_file(path);
        }
        if self.from_env {
            return LoggerConfig::from_env();
        }

        Ok(LoggerConfig::example(&self.log_folder, &self.file_name)
            .with_level(self.level)
            .with_context_fields(ContextFieldConfig::parse_list(&self.context_fields)))
    }
}
