use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter, e.g. `AUGUR_LOG=augur_pipeline=debug`.
pub const LOG_ENV: &str = "AUGUR_LOG";

/// Install the global subscriber. The filter comes from `--log-level`, then
/// `AUGUR_LOG`, then the configured `log_level`.
pub fn init(cli_level: Option<&str>, config_level: &str) -> Result<()> {
  let filter = match cli_level {
    Some(level) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level))?,
    None => EnvFilter::try_from_env(LOG_ENV)
      .or_else(|_| EnvFilter::try_new(config_level))
      .with_context(|| format!("invalid log level '{}'", config_level))?,
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
  Ok(())
}
