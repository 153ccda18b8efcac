//! Main entry point for the FluxChat tool
//!
//! Loads a FluxChat configuration, validates it, and renders templates or
//! configured formats for a stand-in player.

mod cli;
mod commands;
mod config;
mod logging;

use anyhow::{anyhow, Result};
use cli::CliArgs;
use config::{AppConfig, ConfigOrigin};
use tracing::{debug, info};

// ============================================================================
// Application
// ============================================================================

async fn run(args: CliArgs) -> Result<String> {
    // Configuration comes first, it decides how logging is set up
    let (mut config, origin) = AppConfig::load_from_file(&args.config_path).await?;

    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    if args.json_logs {
        config.logging.json_format = true;
    }

    if let Err(e) = config.validate() {
        return Err(anyhow!("Configuration validation failed: {}", e));
    }

    logging::setup_logging(&config.logging)?;
    match origin {
        ConfigOrigin::CreatedDefault => info!(
            "📝 Created default configuration file: {}",
            args.config_path.display()
        ),
        ConfigOrigin::File => debug!("📂 Config: {}", args.config_path.display()),
    }

    commands::execute(&args.command, config.chat)
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    match run(args).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("❌ {:?}", e);
            std::process::exit(1);
        }
    }
}
