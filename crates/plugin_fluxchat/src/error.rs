//! Error types for the FluxChat plugin

use fluxchat_markup::FormatError;
use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {0}: {1}")]
    Io(PathBuf, IoError),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Errors of the chat flows
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No '{kind}' format applies")]
    FormatNotFound { kind: String },

    #[error("Player '{0}' not found")]
    PlayerNotFound(String),

    #[error("Missing permission '{0}'")]
    PermissionDenied(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ChatResult<T> = Result<T, ChatError>;
