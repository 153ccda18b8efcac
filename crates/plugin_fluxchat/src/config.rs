//! FluxChat configuration.
//!
//! The configuration is a TOML document. Every section has defaults, so an
//! empty file is a valid (if format-less) configuration; [`FluxChatConfig::validate`]
//! rejects it before the plugin accepts it.

use crate::error::{ConfigError, ConfigResult};
use fluxchat_markup::{ChatFormat, ClickDefinition, FormatDefinition, FormatExtra, MarkupOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

fn default_true() -> bool {
    true
}

/// Plugin configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxChatConfig {
    /// Let the proxy handle chat that no format applies to.
    #[serde(default = "default_true")]
    pub passthrough: bool,
    /// Write every chat line to the log.
    #[serde(default = "default_true")]
    pub log_chat_global: bool,
    #[serde(default)]
    pub require_permission: RequirePermission,
    #[serde(default)]
    pub markup: MarkupOptions,
    #[serde(default)]
    pub tablist: TablistSettings,
    #[serde(default)]
    pub push_events: PushEventSettings,
    /// Formats keyed by id.
    #[serde(default)]
    pub formats: BTreeMap<String, FormatDefinition>,
}

/// Permission gates on sending and receiving chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirePermission {
    /// Senders need `fluxchat.send`.
    #[serde(default)]
    pub send: bool,
    /// Markup sent to a sender who lacks the send permission. Empty for none.
    #[serde(default)]
    pub send_fail: String,
    /// Recipients need `fluxchat.receive`.
    #[serde(default)]
    pub receive: bool,
    /// Hand denied chat back to the proxy instead of dropping it.
    #[serde(default = "default_true")]
    pub passthrough: bool,
}

impl Default for RequirePermission {
    fn default() -> Self {
        Self {
            send: false,
            send_fail: String::new(),
            receive: false,
            passthrough: true,
        }
    }
}

/// A single line or a list of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lines {
    One(String),
    Many(Vec<String>),
}

impl Lines {
    /// The lines joined with newlines.
    pub fn joined(&self) -> String {
        match self {
            Lines::One(line) => line.clone(),
            Lines::Many(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablistSettings {
    #[serde(default)]
    pub header: Option<Lines>,
    #[serde(default)]
    pub footer: Option<Lines>,
}

impl TablistSettings {
    pub fn is_configured(&self) -> bool {
        self.header.is_some() || self.footer.is_some()
    }
}

/// Where player events are pushed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushEventSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
}

impl PushEventSettings {
    /// Enabled with a non-blank endpoint.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.endpoint.trim().is_empty()
    }
}

impl Default for FluxChatConfig {
    fn default() -> Self {
        let mut formats = BTreeMap::new();

        formats.insert(
            "chat".to_string(),
            definition(
                "chat",
                "<gray>{display_name}</gray>{pronouns_suffix}<dark_gray>:</dark_gray> {message}",
                Some("<aqua>{username}</aqua>\n<gray>Server: {server_name}\nLocal time: {now}"),
                Some(("suggest_command", "/msg {username} ")),
            ),
        );
        formats.insert(
            "whisper".to_string(),
            definition(
                "whisper",
                "<light_purple>{sender} whispers to you:</light_purple> {message}",
                None,
                Some(("suggest_command", "/msg {sender} ")),
            ),
        );
        formats.insert(
            "whisper-out".to_string(),
            definition(
                "whisper-out",
                "<light_purple>You whisper to {receiver}:</light_purple> {message}",
                None,
                None,
            ),
        );
        formats.insert(
            "me".to_string(),
            definition("me", "<light_purple>* {display_name} {message}</light_purple>", None, None),
        );
        formats.insert(
            "say".to_string(),
            definition(
                "say",
                "<light_purple>[{display_name}] {message}</light_purple>",
                None,
                None,
            ),
        );
        formats.insert(
            "join".to_string(),
            definition("join", "<yellow>{display_name} joined {server_name}</yellow>", None, None),
        );
        formats.insert(
            "login".to_string(),
            definition("login", "<yellow>{display_name} joined the network</yellow>", None, None),
        );
        formats.insert(
            "logout".to_string(),
            definition("logout", "<yellow>{display_name} left the network</yellow>", None, None),
        );
        formats.insert(
            "tab-entry".to_string(),
            definition("tab-entry", "{tab_display_name}", None, None),
        );

        Self {
            passthrough: true,
            log_chat_global: true,
            require_permission: RequirePermission::default(),
            markup: MarkupOptions::default(),
            tablist: TablistSettings {
                header: Some(Lines::Many(vec![
                    "<gold><b>FluxChat</b></gold>".to_string(),
                    "<gray>{playercount} online</gray>".to_string(),
                ])),
                footer: Some(Lines::One(
                    "<gray>{server_name} | ping {ping}ms | {server_time}</gray>".to_string(),
                )),
            },
            push_events: PushEventSettings::default(),
            formats,
        }
    }
}

fn definition(
    kind: &str,
    format: &str,
    hover: Option<&str>,
    click: Option<(&str, &str)>,
) -> FormatDefinition {
    FormatDefinition {
        kind: kind.to_string(),
        priority: 0,
        check_permission: false,
        permission: None,
        format: format.to_string(),
        extra: FormatExtra {
            hover: hover.map(str::to_string),
            click: click.map(|(kind, value)| ClickDefinition {
                kind: kind.to_string(),
                value: Some(value.to_string()),
            }),
        },
    }
}

impl FluxChatConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, the default configuration is written to
    /// `path` and returned.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration. The result is not validated.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
            Self::from_toml_str(&content)
        } else {
            let config = Self::default();
            std::fs::write(path, config.to_toml_string()?)
                .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(config)
        }
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.formats.is_empty() {
            return Err("At least one format must be configured".to_string());
        }

        if self.markup.max_depth == 0 {
            return Err("markup.max_depth must be at least 1".to_string());
        }

        for (id, definition) in &self.formats {
            ChatFormat::from_definition(id, definition).map_err(|e| e.to_string())?;
        }

        if self.push_events.enabled {
            let endpoint = self.push_events.endpoint.trim();
            if !endpoint.is_empty()
                && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
            {
                return Err(format!("Invalid push event endpoint: {}", endpoint));
            }
        }

        Ok(())
    }

    /// Validate and build the formats, highest priority first.
    ///
    /// Formats with equal priority keep the order of their ids.
    pub fn compile(&self) -> ConfigResult<Vec<ChatFormat>> {
        self.validate().map_err(ConfigError::Validation)?;

        let mut formats = self
            .formats
            .iter()
            .map(|(id, definition)| ChatFormat::from_definition(id, definition))
            .collect::<Result<Vec<_>, _>>()?;

        formats.sort_by_key(|format| std::cmp::Reverse(format.priority()));
        Ok(formats)
    }
}
