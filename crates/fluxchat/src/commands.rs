//! The subcommands.

use crate::cli::{CliCommand, OutputFormat, RenderTarget};
use anyhow::{Context, Result};
use fluxchat_markup::StyledText;
use plugin_fluxchat::{
    FluxChatConfig, FluxChatPlugin, MemoryMetaStore, OfflinePlayer, PlaceholderParameters,
};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

/// Run `command` against `config` and return what should be printed.
pub fn execute(command: &CliCommand, config: FluxChatConfig) -> Result<String> {
    let plugin = FluxChatPlugin::new(config, Arc::new(MemoryMetaStore::new()))
        .context("Configuration rejected")?;

    match command {
        CliCommand::Check => Ok(check(&plugin)),
        CliCommand::Render { template, target } => {
            let player = stand_in(target);
            let parameters = parameters(target);
            let text = plugin.convert_for(&player, target.server.as_deref(), template, &parameters);
            print(&text, target.output)
        }
        CliCommand::Format { kind, target } => {
            let player = stand_in(target);
            let parameters = parameters(target);
            let text = plugin.format_for(&player, target.server.as_deref(), kind, &parameters)?;
            print(&text, target.output)
        }
    }
}

fn check(plugin: &FluxChatPlugin) -> String {
    let active = plugin.active();
    info!("✅ Configuration is valid");

    let mut out = format!("{} formats, highest priority first:\n", active.formats.len());
    for format in &active.formats {
        let permission = if format.check_permission() {
            format.permission_node()
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:>6}  {:<12} {:<16} {}",
            format.priority(),
            format.kind(),
            format.id(),
            permission
        );
    }
    out.trim_end().to_string()
}

fn stand_in(target: &RenderTarget) -> OfflinePlayer {
    let mut player = OfflinePlayer::new(target.username.as_str());
    if let Some(server) = &target.server {
        player = player.on_server(server.as_str());
    }
    for permission in &target.permissions {
        player = player.grant(permission.as_str());
    }
    player
}

fn parameters(target: &RenderTarget) -> PlaceholderParameters {
    let mut parameters = match &target.server {
        Some(server) => PlaceholderParameters::for_server(server),
        None => PlaceholderParameters::new(),
    };
    for (key, value) in &target.params {
        parameters.set(key, value.as_str());
    }
    parameters
}

/// Render `text` in the requested output format.
pub fn print(text: &StyledText, output: OutputFormat) -> Result<String> {
    Ok(match output {
        OutputFormat::Plain => text.plain_text(),
        OutputFormat::Legacy => text.to_legacy_string(),
        OutputFormat::Json => serde_json::to_string_pretty(text)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(params: &[(&str, &str)], output: OutputFormat) -> RenderTarget {
        RenderTarget {
            username: "Steve".to_string(),
            server: Some("lobby".to_string()),
            permissions: Vec::new(),
            params: params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            output,
        }
    }

    #[test]
    fn check_lists_formats() {
        let out = execute(&CliCommand::Check, FluxChatConfig::default()).unwrap();
        assert!(out.starts_with("9 formats"));
        assert!(out.contains("whisper-out"));
    }

    #[test]
    fn render_uses_params_and_player() {
        let command = CliCommand::Render {
            template: "<gold>[{rank}]</gold> {username}@{server_name}".to_string(),
            target: target(&[("rank", "Admin")], OutputFormat::Plain),
        };
        let out = execute(&command, FluxChatConfig::default()).unwrap();
        assert_eq!(out, "[Admin] Steve@lobby");
    }

    #[test]
    fn render_legacy_and_json() {
        let legacy = CliCommand::Render {
            template: "<red>hi</red>".to_string(),
            target: target(&[], OutputFormat::Legacy),
        };
        assert_eq!(execute(&legacy, FluxChatConfig::default()).unwrap(), "§r§chi");

        let json = CliCommand::Render {
            template: "<red>hi</red>".to_string(),
            target: target(&[], OutputFormat::Json),
        };
        let out = execute(&json, FluxChatConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["extra"][0]["color"], "red");
    }

    #[test]
    fn format_renders_configured_kind() {
        let command = CliCommand::Format {
            kind: "join".to_string(),
            target: target(&[], OutputFormat::Plain),
        };
        let out = execute(&command, FluxChatConfig::default()).unwrap();
        assert_eq!(out, "Steve joined lobby");

        let missing = CliCommand::Format {
            kind: "broadcast".to_string(),
            target: target(&[], OutputFormat::Plain),
        };
        assert!(execute(&missing, FluxChatConfig::default()).is_err());
    }
}
