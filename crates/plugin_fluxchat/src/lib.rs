//! # FluxChat plugin
//!
//! Chat formatting for a proxy network, built on [`fluxchat_markup`].
//!
//! The plugin is host agnostic: the proxy hands it players through
//! [`ProxyPlayer`], persists player settings through [`MetaStore`] and
//! delivers messages through [`MessageSink`]. [`FluxChatPlugin`] owns the
//! configuration, the placeholder registry and per-player state, and
//! implements the chat flows on top of them.
//!
//! Placeholders in a format are resolved in this order:
//!
//! 1. Parameters of the render, such as `message` or `receiver`
//! 2. Placeholders a backend server pushed for the player on that server
//! 3. Registered [`Placeholder`]s, starting with [`StandardPlaceholders`]

pub mod config;
pub mod error;
pub mod host;
pub mod parameters;
pub mod placeholders;
pub mod player;
pub mod plugin;
pub mod stats;

pub use config::{FluxChatConfig, Lines, PushEventSettings, RequirePermission, TablistSettings};
pub use error::{ChatError, ChatResult, ConfigError, ConfigResult};
pub use host::{CollectingSink, MemoryMetaStore, MessageSink, MetaStore, OfflinePlayer, ProxyPlayer};
pub use parameters::PlaceholderParameters;
pub use placeholders::{
    generic_placeholder, Placeholder, PlaceholderContext, RegisteredPlaceholders,
    StandardPlaceholders,
};
pub use player::{ChatPlayer, PlayerStatus};
pub use plugin::{
    ActiveConfig, ChatOutcome, FluxChatPlugin, PERMISSION_ALL_COLORS, PERMISSION_RECEIVE,
    PERMISSION_SEND,
};
pub use stats::{ServerStats, TickSample};
