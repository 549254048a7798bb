#![warn(rust_2018_idioms)]

//! Structured logging facade: severity gating, context-field prefixes and a
//! size/age/count bounded rotating JSON file sink.

pub mod config;
pub mod context;
pub mod domain;
pub mod format;
pub mod logger;
pub mod rotation;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, ContextFieldConfig, LoggerConfig, RotationPolicy, SinkKind};
pub use context::{ContextKey, LogContext};
pub use domain::{LoggerError, Severity};
pub use format::MessageFormatter;
pub use logger::Logger;
pub use rotation::RotatingWriter;
pub use sink::{FileSink, Sink};
