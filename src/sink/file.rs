// File sink: JSON lines written through a per-instance tracing dispatcher into a
// size-rotated file.

use std::borrow::Cow;
use std::path::Path;

use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

use super::Sink;
use crate::config::{LoggerConfig, SinkKind};
use crate::context::LogContext;
use crate::domain::{LoggerError, Severity};
use crate::format::MessageFormatter;
use crate::rotation::RotatingWriter;

pub struct FileSink {
    writer: RotatingWriter,
    dispatch: Dispatch,
    formatter: MessageFormatter,
}

impl FileSink {
    /// Opens the active file and binds a timestamped JSON formatter to it.
    pub fn init(config: &LoggerConfig) -> Result<Self, LoggerError> {
        let policy = config.file.clone().ok_or_else(|| {
            LoggerError::InvalidConfiguration("file sink requires a file configuration".to_string())
        })?;
        let path = policy.path.clone();

        let writer = RotatingWriter::open(policy)
            .map_err(|source| LoggerError::SinkInitializationFailed { path, source })?;

        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .with_ansi(false)
            .log_internal_errors(false)
            .with_timer(ChronoLocal::new(config.time_format.clone()))
            .with_max_level(LevelFilter::TRACE)
            .with_writer(writer.clone())
            .finish();

        tracing::debug!(
            path = %writer.path().display(),
            max_size_bytes = writer.policy().max_size_bytes(),
            "file sink initialized"
        );

        Ok(Self {
            writer,
            dispatch: Dispatch::new(subscriber),
            formatter: MessageFormatter::new(config.context_fields.clone()),
        })
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    fn emit(&self, severity: Severity, message: &str) -> Result<(), LoggerError> {
        if self.writer.is_closed() {
            return Err(LoggerError::Emission(format!(
                "file sink {} is closed",
                self.path().display()
            )));
        }

        // The formatter writes on this thread, so the captured error belongs
        // to this record.
        self.writer
            .capture_error(|| {
                tracing::dispatcher::with_default(&self.dispatch, || match severity {
                    Severity::Debug => tracing::debug!("{message}"),
                    Severity::Info => tracing::info!("{message}"),
                    Severity::Warn => tracing::warn!("{message}"),
                    Severity::Error => tracing::error!("{message}"),
                    Severity::Fatal => tracing::error!(fatal = true, "{message}"),
                });
            })
            .map_err(|e| {
                LoggerError::Emission(format!("write to {} failed: {e}", self.path().display()))
            })
    }
}

impl Sink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn format_message<'a>(&self, ctx: Option<&LogContext>, message: &'a str) -> Cow<'a, str> {
        self.formatter.format(ctx, message)
    }

    fn debug(&self, message: &str) -> Result<(), LoggerError> {
        self.emit(Severity::Debug, message)
    }

    fn info(&self, message: &str) -> Result<(), LoggerError> {
        self.emit(Severity::Info, message)
    }

    fn warn(&self, message: &str) -> Result<(), LoggerError> {
        self.emit(Severity::Warn, message)
    }

    fn error(&self, message: &str) -> Result<(), LoggerError> {
        self.emit(Severity::Error, message)
    }

    fn fatal(&self, message: &str) -> Result<(), LoggerError> {
        self.emit(Severity::Fatal, message)
    }

    fn close(&self) -> Result<(), LoggerError> {
        self.writer
            .close()
            .map_err(|source| LoggerError::SinkClose {
                path: self.path().to_path_buf(),
                source,
            })
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.writer.close();
    }
}
