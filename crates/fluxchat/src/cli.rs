//! Command-line interface handling for the FluxChat tool.
//!
//! Arguments are parsed with the `clap` builder API into [`CliArgs`].

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// How rendered text is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Text only, styling dropped.
    Plain,
    /// `§`-coded legacy text.
    Legacy,
    /// The JSON form of the styled text tree.
    Json,
}

/// Who a template is rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub username: String,
    pub server: Option<String>,
    pub permissions: Vec<String>,
    pub params: Vec<(String, String)>,
    pub output: OutputFormat,
}

/// The subcommand to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Validate the configuration and list its formats.
    Check,
    /// Render a template given on the command line.
    Render { template: String, target: RenderTarget },
    /// Render a configured format.
    Format { kind: String, target: RenderTarget },
}

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    pub command: CliCommand,
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        let matches = command().get_matches();
        match Self::from_matches(&matches) {
            Ok(args) => args,
            Err(e) => command()
                .error(clap::error::ErrorKind::ValueValidation, e)
                .exit(),
        }
    }

    /// Builds the arguments from already parsed matches.
    ///
    /// # Returns
    ///
    /// The arguments, or a message naming the malformed value
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, String> {
        let command = match matches.subcommand() {
            Some(("render", sub)) => CliCommand::Render {
                template: sub
                    .get_one::<String>("template")
                    .cloned()
                    .unwrap_or_default(),
                target: render_target(sub)?,
            },
            Some(("format", sub)) => CliCommand::Format {
                kind: sub.get_one::<String>("kind").cloned().unwrap_or_default(),
                target: render_target(sub)?,
            },
            _ => CliCommand::Check,
        };

        Ok(Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("fluxchat.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            command,
        })
    }
}

/// The full command definition.
pub fn command() -> Command {
    Command::new("FluxChat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render and check FluxChat chat formats")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("fluxchat.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)")
                .global(true),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("check").about("Validate the configuration and list its formats"))
        .subcommand(
            target_args(Command::new("render").about("Render a template")).arg(
                Arg::new("template")
                    .value_name("TEMPLATE")
                    .help("Markup to render")
                    .required(true),
            ),
        )
        .subcommand(
            target_args(Command::new("format").about("Render a configured format")).arg(
                Arg::new("kind")
                    .value_name("KIND")
                    .help("Format type, e.g. chat or whisper")
                    .required(true),
            ),
        )
}

fn target_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("param")
                .short('p')
                .long("param")
                .value_name("KEY=VALUE")
                .help("Placeholder parameter, repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .value_name("NAME")
                .help("Username of the stand-in player")
                .default_value("Player"),
        )
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .value_name("SERVER")
                .help("Server the stand-in player is on"),
        )
        .arg(
            Arg::new("grant")
                .short('g')
                .long("grant")
                .value_name("PERMISSION")
                .help("Permission of the stand-in player, repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the styled text as JSON")
                .action(ArgAction::SetTrue)
                .conflicts_with("legacy"),
        )
        .arg(
            Arg::new("legacy")
                .long("legacy")
                .help("Print the styled text as legacy color codes")
                .action(ArgAction::SetTrue),
        )
}

fn render_target(matches: &ArgMatches) -> Result<RenderTarget, String> {
    let params = matches
        .get_many::<String>("param")
        .into_iter()
        .flatten()
        .map(|param| parse_param(param))
        .collect::<Result<Vec<_>, _>>()?;

    let output = if matches.get_flag("json") {
        OutputFormat::Json
    } else if matches.get_flag("legacy") {
        OutputFormat::Legacy
    } else {
        OutputFormat::Plain
    };

    Ok(RenderTarget {
        username: matches
            .get_one::<String>("username")
            .cloned()
            .unwrap_or_else(|| "Player".to_string()),
        server: matches.get_one::<String>("server").cloned(),
        permissions: matches
            .get_many::<String>("grant")
            .into_iter()
            .flatten()
            .cloned()
            .collect(),
        params,
        output,
    })
}

/// Split a `key=value` parameter. The value may contain further `=`.
pub fn parse_param(param: &str) -> Result<(String, String), String> {
    match param.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid parameter '{}', expected KEY=VALUE", param)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        let matches = command()
            .try_get_matches_from(args)
            .map_err(|e| e.to_string())?;
        CliArgs::from_matches(&matches)
    }

    #[test]
    fn defaults_to_check() {
        let args = parse(&["fluxchat"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("fluxchat.toml"));
        assert_eq!(args.command, CliCommand::Check);
        assert!(!args.json_logs);
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn render_with_params() {
        let args = parse(&[
            "fluxchat",
            "-c",
            "chat.toml",
            "render",
            "<gold>{rank}</gold> {username}",
            "--param",
            "rank=Admin",
            "-p",
            "formula=a=b",
            "--json",
            "-l",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("chat.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));

        let CliCommand::Render { template, target } = args.command else {
            panic!("expected render");
        };
        assert_eq!(template, "<gold>{rank}</gold> {username}");
        assert_eq!(target.username, "Player");
        assert_eq!(target.output, OutputFormat::Json);
        assert_eq!(
            target.params,
            vec![
                ("rank".to_string(), "Admin".to_string()),
                ("formula".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn format_with_player() {
        let args = parse(&[
            "fluxchat", "format", "chat", "-u", "Steve", "-s", "lobby", "-g", "fluxchat.staff",
            "--legacy",
        ])
        .unwrap();

        let CliCommand::Format { kind, target } = args.command else {
            panic!("expected format");
        };
        assert_eq!(kind, "chat");
        assert_eq!(target.username, "Steve");
        assert_eq!(target.server.as_deref(), Some("lobby"));
        assert_eq!(target.permissions, vec!["fluxchat.staff"]);
        assert_eq!(target.output, OutputFormat::Legacy);
    }

    #[test]
    fn malformed_params_are_rejected() {
        assert!(parse(&["fluxchat", "render", "x", "-p", "novalue"]).is_err());
        assert!(parse(&["fluxchat", "render", "x", "-p", "=value"]).is_err());
        assert!(parse(&["fluxchat", "render", "x", "--json", "--legacy"]).is_err());
    }
}
