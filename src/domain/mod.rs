//! Domain layer for rask-logger.
//!
//! Contains the canonical types shared across all modules:
//! - `Severity`: ordered log severity (Debug < Info < Warn < Error < Fatal)
//! - `LoggerError`: top-level error type

pub mod error;
pub mod severity;

pub use error::LoggerError;
pub use severity::Severity;
