//! Logging system setup and configuration
//!
//! Logs go to stderr so rendered output on stdout can be piped.

use crate::config::LoggingSettings;
use anyhow::Result;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system
///
/// # Arguments
/// * `settings` - Level and format from the configuration
///
/// # Environment Variables
/// * `RUST_LOG` - Override the configured filter (e.g., "debug", "plugin_fluxchat=trace")
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    if settings.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()?;
    }

    debug!("🔧 Logging initialized with level: {}", settings.level);
    Ok(())
}
