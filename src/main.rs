mod app;

use anyhow::{Context, Result};
use clap::Parser;
use rask_logger::{LogContext, Logger, Severity};
use tracing::info;

fn main() -> Result<()> {
    app::init_tracing();

    let cli = app::Cli::parse();
    let config = cli.logger_config().context("failed to load logger configuration")?;
    let path = config.file.as_ref().map(|policy| policy.path.clone());

    let logger = Logger::new(config).context("failed to create logger")?;

    for i in 0..cli.lines {
        let ctx = LogContext::new()
            .with_field("requestID", format!("req-{i:06}"))
            .with_field("userID", format!("user-{}", i % 7));
        let severity = Severity::ALL[i % Severity::ALL.len()];
        logger.log(severity, Some(&ctx), &format!("sample record {i}"));
    }

    logger.close().context("failed to close logger")?;

    info!(
        lines = cli.lines,
        path = ?path,
        "sample records written"
    );
    Ok(())
}
