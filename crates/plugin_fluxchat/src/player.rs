//! Per-player chat state.

use crate::host::{MetaStore, ProxyPlayer};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use fluxchat_markup::{MarkupEngine, NamedColor, NoopResolver, Style, StyledText};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

pub const META_NICKNAME: &str = "nickname";
pub const META_NICKNAME_COLOR: &str = "nickname_color";
pub const META_PRONOUNS: &str = "pronouns";
pub const META_TIMEZONE: &str = "timezone";

/// What the backend server last reported about a player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub alive: bool,
    pub invisible: bool,
    pub creative: bool,
    pub spectator: bool,
    pub dimension: Option<String>,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            alive: true,
            invisible: false,
            creative: false,
            spectator: false,
            dimension: None,
        }
    }
}

/// Chat related state of one player.
#[derive(Debug, Clone)]
pub struct ChatPlayer {
    uuid: Uuid,
    username: String,
    nickname: Option<String>,
    nickname_color: Option<NamedColor>,
    pronouns: Option<String>,
    timezone: Option<Tz>,
    afk: bool,
    afk_since: Option<DateTime<Utc>>,
    stationary: bool,
    ticks_since_movement: u32,
    status: PlayerStatus,
    server_placeholders: HashMap<String, HashMap<String, StyledText>>,
}

impl ChatPlayer {
    pub fn new(uuid: Uuid, username: impl Into<String>) -> Self {
        Self {
            uuid,
            username: username.into(),
            nickname: None,
            nickname_color: None,
            pronouns: None,
            timezone: None,
            afk: false,
            afk_since: None,
            stationary: false,
            ticks_since_movement: 0,
            status: PlayerStatus::default(),
            server_placeholders: HashMap::new(),
        }
    }

    /// Build the state of `player` from its stored metadata.
    pub fn load(player: &dyn ProxyPlayer, meta: &dyn MetaStore) -> Self {
        let uuid = player.uuid();
        let mut state = Self::new(uuid, player.username());

        state.set_nickname(meta.get_meta(uuid, META_NICKNAME).as_deref());
        state.nickname_color = meta
            .get_meta(uuid, META_NICKNAME_COLOR)
            .as_deref()
            .and_then(parse_color_code);
        state.pronouns = meta.get_meta(uuid, META_PRONOUNS);
        state.timezone = meta.get_meta(uuid, META_TIMEZONE).and_then(|stored| {
            let timezone = parse_timezone(&stored);
            if timezone.is_none() {
                warn!("⚠️ Ignoring unknown stored timezone '{}' of {}", stored, state.username);
            }
            timezone
        });

        debug!("Loaded chat state of {}", state.username);
        state
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// The nickname if one is set, otherwise the username.
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref() {
            Some(nickname) if !nickname.trim().is_empty() => nickname,
            _ => &self.username,
        }
    }

    /// The display name wrapped in the nickname color tag, if any.
    pub fn coloured_display_name(&self) -> String {
        let name = self.display_name();
        match self.nickname_color {
            Some(color) => format!("<{tag}>{name}</{tag}>", tag = color.name(), name = name),
            None => name.to_string(),
        }
    }

    /// Name shown in the tab list: gray italic `name (AFK)` while away.
    pub fn tab_display_name(&self, engine: &MarkupEngine) -> StyledText {
        if self.afk {
            let style = Style {
                italic: true,
                ..Style::colored(NamedColor::Gray)
            };
            return StyledText::styled(format!("{} (AFK)", self.display_name()), style);
        }

        engine.render(&self.coloured_display_name(), &NoopResolver)
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Set or clear the nickname. Section signs are removed.
    pub fn set_nickname(&mut self, nickname: Option<&str>) {
        self.nickname = nickname.map(|nickname| nickname.replace('§', ""));
    }

    pub fn nickname_color(&self) -> Option<NamedColor> {
        self.nickname_color
    }

    pub fn set_nickname_color(&mut self, color: Option<NamedColor>) {
        self.nickname_color = color;
    }

    /// The nickname color as stored in metadata (`&x`).
    pub fn nickname_color_code(&self) -> Option<String> {
        self.nickname_color
            .map(|color| format!("&{}", color.legacy_code()))
    }

    // ========================================================================
    // Profile
    // ========================================================================

    pub fn pronouns(&self) -> Option<&str> {
        self.pronouns.as_deref()
    }

    pub fn set_pronouns(&mut self, pronouns: Option<&str>) {
        self.pronouns = pronouns.map(str::to_string);
    }

    /// ` (pronouns)`, or nothing when no pronouns are set.
    pub fn pronouns_suffix(&self) -> String {
        match self.pronouns.as_deref() {
            Some(pronouns) if !pronouns.trim().is_empty() => format!(" ({})", pronouns),
            _ => String::new(),
        }
    }

    /// The IANA name of the player's timezone.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.map(|tz| tz.name())
    }

    pub fn set_timezone(&mut self, timezone: Option<Tz>) {
        self.timezone = timezone;
    }

    /// `HH:MM` in the player's timezone, or in server time when it is unknown.
    pub fn local_time(&self, now: DateTime<Utc>) -> String {
        match self.timezone {
            Some(tz) => now.with_timezone(&tz).format("%H:%M").to_string(),
            None => now.with_timezone(&Local).format("%H:%M").to_string(),
        }
    }

    // ========================================================================
    // Activity
    // ========================================================================

    pub fn is_afk(&self) -> bool {
        self.afk
    }

    pub fn afk_since(&self) -> Option<DateTime<Utc>> {
        self.afk_since
    }

    pub fn set_afk(&mut self, afk: bool) {
        if self.afk == afk {
            return;
        }

        self.afk = afk;
        self.afk_since = afk.then(Utc::now);
    }

    pub fn ticks_since_movement(&self) -> u32 {
        self.ticks_since_movement
    }

    /// A smaller counter than last time means the player moved.
    pub fn set_ticks_since_movement(&mut self, ticks: u32) {
        if ticks < self.ticks_since_movement {
            self.set_afk(false);
        }
        self.ticks_since_movement = ticks;
    }

    pub fn is_stationary(&self) -> bool {
        self.stationary
    }

    pub fn set_stationary(&mut self, stationary: bool) {
        if self.stationary == stationary {
            return;
        }
        self.stationary = stationary;
        self.set_afk(stationary);
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut PlayerStatus {
        &mut self.status
    }

    // ========================================================================
    // Server placeholders
    // ========================================================================

    /// Store a styled placeholder a backend server pushed for this player.
    ///
    /// `json` is the logical JSON form of a [`StyledText`]. Invalid JSON is
    /// logged and ignored; returns whether the value was stored.
    pub fn set_server_placeholder(&mut self, server: &str, key: &str, json: &str) -> bool {
        match serde_json::from_str::<StyledText>(json) {
            Ok(value) => {
                self.server_placeholders
                    .entry(server.to_string())
                    .or_default()
                    .insert(key.to_string(), value);
                true
            }
            Err(e) => {
                warn!("⚠️ Ignoring placeholder '{}' from '{}': {}", key, server, e);
                false
            }
        }
    }

    pub fn server_placeholder(&self, server: &str, key: &str) -> Option<&StyledText> {
        self.server_placeholders.get(server)?.get(key)
    }
}

/// Parse a stored `&x` nickname color.
pub fn parse_color_code(code: &str) -> Option<NamedColor> {
    let mut chars = code.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('&'), Some(code), None) => NamedColor::from_legacy_code(code),
        _ => None,
    }
}

/// Look up a timezone by its IANA id, such as `Europe/Brussels` or `NZ`.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
