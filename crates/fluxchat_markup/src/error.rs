//! Error types for the markup engine

use thiserror::Error;

/// Placeholder lookup failures.
///
/// The converter never propagates these: a failing lookup is logged and the
/// placeholder renders as if it had no value.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Placeholder backend failed for '{key}': {reason}")]
    Backend { key: String, reason: String },

    #[error("Placeholder '{0}' is temporarily unavailable")]
    Unavailable(String),
}

/// Invalid chat format definitions
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid click type '{click_type}' in format '{format}'")]
    InvalidClickType { format: String, click_type: String },

    #[error("Format '{0}' has an empty template")]
    EmptyTemplate(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
pub type FormatResult<T> = Result<T, FormatError>;
