use std::time::Duration;

use bleep::config::Config;
use bleep::context::Context;
use bleep::logging::CategoryFileLogger;
use bleep::modes;
use bleep_agent::Capability;
use log::{info, LevelFilter};

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> Result<(), bleep::CoreError> {
    let config = Config::from_env();
    init_logging(&config)?;

    info!("starting BLEEP against config root {}", config.config_root.display());
    let ctx = Context::build(config, Capability::DisplayYesNo).await?;

    let devices = modes::passive(&ctx, DEFAULT_SCAN_TIMEOUT).await?;
    info!("passive scan observed {} device(s)", devices.len());

    Ok(())
}

/// Installs the single global logger: a [`CategoryFileLogger`] that formats and writes to
/// stderr the way `pretty_env_logger` would (reading `BLEEP_LOG_LEVEL`), and additionally
/// tees every record into the matching `logs/*.txt` file.
fn init_logging(config: &bleep::Config) -> Result<(), bleep::CoreError> {
    let logger = CategoryFileLogger::open(&config.logs_dir, &config.log_level)?;
    log::set_boxed_logger(Box::new(logger))
        .map(|_| log::set_max_level(LevelFilter::Trace))
        .ok();
    Ok(())
}
