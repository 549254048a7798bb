//! Shared test support utilities
//!
//! Provides `RecordingSink`, an in-memory `Sink` that captures every routed
//! message and can be told to fail or panic.

use crate::config::{ContextFieldConfig, SinkKind};
use crate::context::LogContext;
use crate::domain::LoggerError;
use crate::format::MessageFormatter;
use crate::sink::Sink;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct Recorded {
    records: Mutex<Vec<(&'static str, String)>>,
    close_calls: AtomicUsize,
    should_fail: AtomicBool,
    should_panic: AtomicBool,
    fail_close: AtomicBool,
}

/// Clones share the same recording.
#[derive(Clone, Default)]
pub struct RecordingSink {
    recorded: Arc<Recorded>,
    formatter: MessageFormatter,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: ContextFieldConfig) -> Self {
        Self {
            recorded: Arc::default(),
            formatter: MessageFormatter::new(fields),
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.recorded.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_should_panic(&self, panic: bool) {
        self.recorded.should_panic.store(panic, Ordering::SeqCst);
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.recorded.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<(&'static str, String)> {
        self.recorded.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, message)| message).collect()
    }

    pub fn close_calls(&self) -> usize {
        self.recorded.close_calls.load(Ordering::SeqCst)
    }

    fn record(&self, method: &'static str, message: &str) -> Result<(), LoggerError> {
        if self.recorded.should_panic.load(Ordering::SeqCst) {
            panic!("recording sink panicked on {method}");
        }
        if self.recorded.should_fail.load(Ordering::SeqCst) {
            return Err(LoggerError::Emission(format!("recording sink failed on {method}")));
        }
        self.recorded.records.lock().push((method, message.to_string()));
        Ok(())
    }
}

impl Sink for RecordingSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn format_message<'a>(&self, ctx: Option<&LogContext>, message: &'a str) -> Cow<'a, str> {
        self.formatter.format(ctx, message)
    }

    fn debug(&self, message: &str) -> Result<(), LoggerError> {
        self.record("debug", message)
    }

    fn info(&self, message: &str) -> Result<(), LoggerError> {
        self.record("info", message)
    }

    fn warn(&self, message: &str) -> Result<(), LoggerError> {
        self.record("warn", message)
    }

    fn error(&self, message: &str) -> Result<(), LoggerError> {
        self.record("error", message)
    }

    fn fatal(&self, message: &str) -> Result<(), LoggerError> {
        self.record("fatal", message)
    }

    fn close(&self) -> Result<(), LoggerError> {
        self.recorded.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.recorded.fail_close.load(Ordering::SeqCst) {
            return Err(LoggerError::Emission("recording sink failed to close".to_string()));
        }
        Ok(())
    }
}
