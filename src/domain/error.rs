use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the logging facade.
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Sink initialization failed for {}: {source}", path.display())]
    SinkInitializationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Emission failure: {0}")]
    Emission(String),

    #[error("Failed to close sink for {}: {source}", path.display())]
    SinkClose {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
