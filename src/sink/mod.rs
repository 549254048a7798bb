pub mod file;

use std::borrow::Cow;

use crate::config::{LoggerConfig, SinkKind};
use crate::context::LogContext;
use crate::domain::{LoggerError, Severity};

pub use file::FileSink;

/// Destination for formatted log lines.
///
/// `Logger` only talks to this trait, so new destinations plug in without
/// touching the orchestrator. Implementations must tolerate concurrent calls.
pub trait Sink: Send + Sync {
    fn kind(&self) -> SinkKind;

    fn format_message<'a>(&self, ctx: Option<&LogContext>, message: &'a str) -> Cow<'a, str>;

    fn debug(&self, message: &str) -> Result<(), LoggerError>;

    fn info(&self, message: &str) -> Result<(), LoggerError>;

    fn warn(&self, message: &str) -> Result<(), LoggerError>;

    fn error(&self, message: &str) -> Result<(), LoggerError>;

    fn fatal(&self, message: &str) -> Result<(), LoggerError> {
        self.error(message)
    }

    /// Releases the destination. Must be safe to call more than once.
    fn close(&self) -> Result<(), LoggerError>;
}

/// Routes `message` to the sink method named after `severity`.
pub fn write_at(sink: &dyn Sink, severity: Severity, message: &str) -> Result<(), LoggerError> {
    match severity {
        Severity::Debug => sink.debug(message),
        Severity::Info => sink.info(message),
        Severity::Warn => sink.warn(message),
        Severity::Error => sink.error(message),
        Severity::Fatal => sink.fatal(message),
    }
}

/// Builds the sink selected by `config.sink_kind`.
pub fn open(config: &LoggerConfig) -> Result<Box<dyn Sink>, LoggerError> {
    match config.sink_kind {
        SinkKind::File => Ok(Box::new(FileSink::init(config)?)),
        SinkKind::Unrecognized => Err(LoggerError::InvalidConfiguration(
            "unrecognized sink kind".to_string(),
        )),
    }
}
