//! Configuration management for the FluxChat tool.
//!
//! The tool reads the plugin's own TOML file. A `[logging]` table, which the
//! plugin ignores, controls the tool's log output.

use anyhow::{Context, Result};
use plugin_fluxchat::FluxChatConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Everything else belongs to the plugin
    #[serde(flatten)]
    pub chat: FluxChatConfig,
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Read from an existing file.
    File,
    /// The file was missing and has been written with defaults.
    CreatedDefault,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration and where it came from, or an
    /// error if loading/creation failed. Nothing is logged here since logging
    /// is configured from the result.
    pub async fn load_from_file(path: &Path) -> Result<(Self, ConfigOrigin)> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok((config, ConfigOrigin::File))
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok((default_config, ConfigOrigin::CreatedDefault))
        }
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        self.chat.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fluxchat.toml");

        let (config, origin) = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(origin, ConfigOrigin::CreatedDefault);
        assert!(path.exists());
        assert_eq!(config, AppConfig::default());
        assert!(config.validate().is_ok());

        let (reloaded, origin) = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(origin, ConfigOrigin::File);
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn logging_table_sits_next_to_plugin_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fluxchat.toml");
        tokio::fs::write(
            &path,
            r#"
            passthrough = false

            [logging]
            level = "debug"
            json_format = true

            [formats.chat]
            format = "{name}: {message}"
            "#,
        )
        .await
        .unwrap();

        let (config, _) = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(!config.chat.passthrough);
        assert_eq!(config.chat.formats.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn parse_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        tokio::fs::write(&path, "[formats").await.unwrap();

        let error = AppConfig::load_from_file(&path).await.unwrap_err();
        assert!(error.to_string().contains("broken.toml"));
    }

    #[test]
    fn validation() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        config.chat.formats.clear();
        assert!(config.validate().is_err());
    }
}
