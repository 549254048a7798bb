use std::any::Any;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use crate::config::{LoggerConfig, SinkKind};
use crate::context::LogContext;
use crate::domain::{LoggerError, Severity};
use crate::sink::{self, Sink};

/// Severity-gated front end over a single sink.
///
/// Level methods never return errors and never panic: failures inside
/// formatting or writing are reported on stderr and the record is dropped.
pub struct Logger {
    sink: Box<dyn Sink>,
    config: LoggerConfig,
}

impl Logger {
    /// Builds the sink named by `config.sink_kind` and initializes it.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        if config.sink_kind == SinkKind::Unrecognized {
            return Err(LoggerError::InvalidConfiguration(
                "unrecognized sink kind".to_string(),
            ));
        }
        config
            .validate()
            .map_err(|e| LoggerError::InvalidConfiguration(e.to_string()))?;

        let sink = sink::open(&config)?;

        tracing::debug!(
            sink = %config.sink_kind,
            level = %config.level,
            batch_size = config.batch_size,
            "logger initialized"
        );

        Ok(Self { sink, config })
    }

    /// Wraps an already initialized sink.
    pub fn with_sink(config: LoggerConfig, sink: Box<dyn Sink>) -> Self {
        Self { sink, config }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn level(&self) -> Severity {
        self.config.level
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity.passes(self.config.level)
    }

    pub fn debug(&self, ctx: Option<&LogContext>, message: &str) {
        self.log(Severity::Debug, ctx, message);
    }

    pub fn info(&self, ctx: Option<&LogContext>, message: &str) {
        self.log(Severity::Info, ctx, message);
    }

    pub fn warn(&self, ctx: Option<&LogContext>, message: &str) {
        self.log(Severity::Warn, ctx, message);
    }

    pub fn error(&self, ctx: Option<&LogContext>, message: &str) {
        self.log(Severity::Error, ctx, message);
    }

    /// Records at FATAL. Does not terminate the process.
    pub fn fatal(&self, ctx: Option<&LogContext>, message: &str) {
        self.log(Severity::Fatal, ctx, message);
    }

    pub fn log(&self, severity: Severity, ctx: Option<&LogContext>, message: &str) {
        if !self.enabled(severity) {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let formatted = self.sink.format_message(ctx, message);
            sink::write_at(self.sink.as_ref(), severity, &formatted)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => report_emission_failure(severity, &e),
            Err(payload) => {
                let e = LoggerError::Emission(format!("panic: {}", panic_message(payload.as_ref())));
                report_emission_failure(severity, &e);
            }
        }
    }

    /// Closes the sink and returns its result unchanged.
    pub fn close(&self) -> Result<(), LoggerError> {
        let result = self.sink.close();
        tracing::debug!(sink = %self.sink.kind(), ok = result.is_ok(), "logger closed");
        result
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.sink.close();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// Best effort: a failing stderr is ignored as well.
fn report_emission_failure(severity: Severity, error: &LoggerError) {
    let _ = writeln!(
        io::stderr().lock(),
        "[rask-logger] dropped {severity} record: {error}"
    );
}
