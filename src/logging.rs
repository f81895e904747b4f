use crate::error::{HelperError, Result};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(HelperError::InvalidParameter(format!(
                "Unknown log format: {}. Use compact, pretty or json",
                s
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: Level::INFO,
            format: LogFormat::Compact,
        }
    }
}

/// Installs a global `tracing` subscriber writing to stdout. Records emitted
/// through the `log` facade are captured as well.
pub fn init_logging(config: LogConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let fmt_layer = match config.format {
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

/// Plain `env_logger` setup for the command line tool. Defaults to `info`
/// unless `RUST_LOG` says otherwise.
pub fn init_simple_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_second_init_reports_error() {
        let _ = init_logging(LogConfig::default());
        assert!(init_logging(LogConfig::default()).is_err());
    }
}
