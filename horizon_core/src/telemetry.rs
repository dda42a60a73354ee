//! Logging initialization.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::settings::LoggingConfig;

/// `RUST_LOG` wins when set; otherwise the configured level applies.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    match config.format.as_str() {
        "json" => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to install JSON subscriber")?;
        }
        _ => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to install subscriber")?;
        }
    }

    tracing::debug!(level = %config.level, format = %config.format, "logging initialized");
    Ok(())
}
