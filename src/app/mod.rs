pub mod cli;
pub mod tracing;

pub use self::cli::Cli;
pub use self::tracing::init_tracing;
