//! Contracts with the proxy hosting the plugin.
//!
//! The plugin never talks to the network or to a permissions backend
//! directly. The host hands it players, a metadata store and a message sink.
//! In-memory versions are provided for tools and tests.

use dashmap::DashMap;
use fluxchat_markup::StyledText;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

/// A player connected to the proxy.
pub trait ProxyPlayer: Send + Sync {
    fn uuid(&self) -> Uuid;
    fn username(&self) -> &str;
    fn has_permission(&self, permission: &str) -> bool;
    /// Round trip time, if the proxy knows it.
    fn ping_ms(&self) -> Option<u64>;
    /// Name of the backend server the player is on.
    fn current_server(&self) -> Option<String>;
}

/// Persistent per-player metadata, usually backed by the permissions plugin.
pub trait MetaStore: Send + Sync {
    fn get_meta(&self, player: Uuid, key: &str) -> Option<String>;
    /// Store `value`, or clear the key when `None`.
    fn set_meta(&self, player: Uuid, key: &str, value: Option<&str>);
}

/// Delivers rendered messages to players.
pub trait MessageSink: Send + Sync {
    fn send(&self, recipient: Uuid, message: &StyledText);
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// A player that exists only in memory.
#[derive(Debug, Clone)]
pub struct OfflinePlayer {
    uuid: Uuid,
    username: String,
    server: Option<String>,
    ping_ms: Option<u64>,
    permissions: HashSet<String>,
    all_permissions: bool,
}

impl OfflinePlayer {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            username: username.into(),
            server: None,
            ping_ms: None,
            permissions: HashSet::new(),
            all_permissions: false,
        }
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn on_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_ping(mut self, ping_ms: u64) -> Self {
        self.ping_ms = Some(ping_ms);
        self
    }

    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Grant every permission.
    pub fn operator(mut self) -> Self {
        self.all_permissions = true;
        self
    }
}

impl ProxyPlayer for OfflinePlayer {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.all_permissions || self.permissions.contains(permission)
    }

    fn ping_ms(&self) -> Option<u64> {
        self.ping_ms
    }

    fn current_server(&self) -> Option<String> {
        self.server.clone()
    }
}

/// Metadata kept in a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    values: DashMap<(Uuid, String), String>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetaStore for MemoryMetaStore {
    fn get_meta(&self, player: Uuid, key: &str) -> Option<String> {
        self.values
            .get(&(player, key.to_string()))
            .map(|value| value.value().clone())
    }

    fn set_meta(&self, player: Uuid, key: &str, value: Option<&str>) {
        let slot = (player, key.to_string());
        match value {
            Some(value) => {
                self.values.insert(slot, value.to_string());
            }
            None => {
                self.values.remove(&slot);
            }
        }
    }
}

/// Remembers every delivered message.
#[derive(Debug, Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<(Uuid, StyledText)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the messages delivered so far.
    pub fn drain(&self) -> Vec<(Uuid, StyledText)> {
        let mut delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *delivered)
    }

    /// Plain text of the messages `recipient` received, in order.
    pub fn received_by(&self, recipient: Uuid) -> Vec<String> {
        let delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        delivered
            .iter()
            .filter(|(uuid, _)| *uuid == recipient)
            .map(|(_, message)| message.plain_text())
            .collect()
    }
}

impl MessageSink for CollectingSink {
    fn send(&self, recipient: Uuid, message: &StyledText) {
        let mut delivered = self.delivered.lock().unwrap_or_else(|e| e.into_inner());
        delivered.push((recipient, message.clone()));
    }
}
