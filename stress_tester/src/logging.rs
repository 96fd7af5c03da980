use anyhow::Context;
use flexi_logger::{Logger, LoggerHandle};

/// Installs the global logger. Keep the returned handle alive for as long as logs should be
/// written.
pub fn init(level: &str) -> anyhow::Result<LoggerHandle> {
    Logger::try_with_env_or_str(level)
        .with_context(|| format!("invalid log specification '{level}'"))?
        .log_to_stderr()
        .format(flexi_logger::colored_default_format)
        .start()
        .context("could not start the logger")
}
