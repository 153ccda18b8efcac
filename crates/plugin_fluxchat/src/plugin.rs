//! The FluxChat plugin: formats, players and the chat flows.

use crate::config::{FluxChatConfig, Lines};
use crate::error::{ChatError, ChatResult, ConfigResult};
use crate::host::{MessageSink, MetaStore, ProxyPlayer};
use crate::parameters::PlaceholderParameters;
use crate::placeholders::{
    generic_placeholder, Placeholder, PlaceholderContext, RegisteredPlaceholders,
    StandardPlaceholders,
};
use crate::player::{
    parse_timezone, ChatPlayer, META_NICKNAME, META_NICKNAME_COLOR, META_PRONOUNS,
    META_TIMEZONE,
};
use crate::stats::{ServerStats, TickSample};
use chrono::{Local, Utc};
use dashmap::DashMap;
use fluxchat_markup::{
    replace_plain_placeholders, ChatFormat, MarkupEngine, NamedColor, NodeId, NoopResolver,
    PlaceholderResolver, Replacement, ResolveResult, ResolverChain, Style, StyledText, Token,
};
use serde_json::json;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const PERMISSION_SEND: &str = "fluxchat.send";
pub const PERMISSION_RECEIVE: &str = "fluxchat.receive";
pub const PERMISSION_ALL_COLORS: &str = "fluxchat.all_colors";

/// Nickname colors anyone may pick.
const NICKNAME_COLORS: [NamedColor; 9] = [
    NamedColor::DarkGreen,
    NamedColor::DarkAqua,
    NamedColor::DarkRed,
    NamedColor::DarkPurple,
    NamedColor::Blue,
    NamedColor::Green,
    NamedColor::LightPurple,
    NamedColor::Yellow,
    NamedColor::White,
];

/// A validated configuration with its compiled formats.
#[derive(Debug)]
pub struct ActiveConfig {
    pub config: FluxChatConfig,
    /// Highest priority first.
    pub formats: Vec<Arc<ChatFormat>>,
    pub engine: MarkupEngine,
}

impl ActiveConfig {
    fn compile(config: FluxChatConfig) -> ConfigResult<Self> {
        let formats = config.compile()?.into_iter().map(Arc::new).collect();
        let engine = MarkupEngine::new(config.markup.clone());
        Ok(Self {
            config,
            formats,
            engine,
        })
    }
}

/// What became of a chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// The proxy should forward the message unchanged.
    PassThrough,
    /// The message was dropped. `notice` was sent to the sender.
    Denied { notice: Option<StyledText> },
    /// The message was formatted and delivered.
    Delivered {
        message: StyledText,
        recipients: usize,
    },
}

/// Per-server placeholders a backend pushed for one player.
struct ServerValues<'a> {
    state: &'a ChatPlayer,
    server: Option<&'a str>,
}

impl PlaceholderResolver for ServerValues<'_> {
    fn resolve(&self, token: &Token) -> ResolveResult<Option<Replacement>> {
        Ok(self
            .server
            .and_then(|server| self.state.server_placeholder(server, token.content()))
            .cloned()
            .map(Replacement::Styled))
    }
}

/// The FluxChat plugin.
///
/// All methods take `&self`; the plugin is shared between the proxy's event
/// threads. Configuration is swapped atomically on reload, so a render always
/// sees one consistent set of formats.
pub struct FluxChatPlugin {
    active: RwLock<Arc<ActiveConfig>>,
    placeholders: RwLock<Vec<Arc<dyn Placeholder>>>,
    players: DashMap<Uuid, ChatPlayer>,
    stats: ServerStats,
    meta: Arc<dyn MetaStore>,
}

impl FluxChatPlugin {
    /// Creates the plugin with the standard placeholders registered.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration, validated here
    /// * `meta` - Where nicknames, pronouns and timezones are persisted
    pub fn new(config: FluxChatConfig, meta: Arc<dyn MetaStore>) -> ConfigResult<Self> {
        let active = ActiveConfig::compile(config)?;
        info!("💬 FluxChat enabled with {} formats", active.formats.len());

        Ok(Self {
            active: RwLock::new(Arc::new(active)),
            placeholders: RwLock::new(vec![Arc::new(StandardPlaceholders)]),
            players: DashMap::new(),
            stats: ServerStats::new(),
            meta,
        })
    }

    /// Replace the configuration. On error the previous one stays active.
    pub fn reload(&self, config: FluxChatConfig) -> ConfigResult<()> {
        let active = match ActiveConfig::compile(config) {
            Ok(active) => active,
            Err(e) => {
                warn!("⚠️ Reload rejected, keeping previous configuration: {}", e);
                return Err(e);
            }
        };

        info!("🔄 Configuration reloaded with {} formats", active.formats.len());
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(active);
        Ok(())
    }

    pub fn active(&self) -> Arc<ActiveConfig> {
        self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    // ========================================================================
    // Placeholder registry
    // ========================================================================

    /// Add a placeholder, replacing one registered under the same name.
    pub fn register_placeholder(&self, placeholder: Arc<dyn Placeholder>) {
        let mut registry = self.placeholders.write().unwrap_or_else(|e| e.into_inner());
        let existing = registry.iter().position(|p| p.name() == placeholder.name());
        match existing {
            Some(index) => registry[index] = placeholder,
            None => registry.push(placeholder),
        }
    }

    /// Returns whether a placeholder with this name was registered.
    pub fn unregister_placeholder(&self, name: &str) -> bool {
        let mut registry = self.placeholders.write().unwrap_or_else(|e| e.into_inner());
        let before = registry.len();
        registry.retain(|p| p.name() != name);
        registry.len() != before
    }

    fn registry(&self) -> Vec<Arc<dyn Placeholder>> {
        self.placeholders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // ========================================================================
    // Player state
    // ========================================================================

    /// A snapshot of the player's chat state, loaded on first use.
    pub fn player_state(&self, player: &dyn ProxyPlayer) -> ChatPlayer {
        self.players
            .entry(player.uuid())
            .or_insert_with(|| ChatPlayer::load(player, self.meta.as_ref()))
            .value()
            .clone()
    }

    /// Change the player's chat state.
    ///
    /// `update` runs on a copy with no map lock held, so it may call back into
    /// the plugin. The copy is stored afterwards; two concurrent updates of the
    /// same player keep the later one.
    pub fn update_player<R>(
        &self,
        player: &dyn ProxyPlayer,
        update: impl FnOnce(&mut ChatPlayer) -> R,
    ) -> R {
        let mut state = self.player_state(player);
        let result = update(&mut state);
        self.players.insert(player.uuid(), state);
        result
    }

    pub fn forget_player(&self, uuid: Uuid) {
        self.players.remove(&uuid);
    }

    // ========================================================================
    // Formats
    // ========================================================================

    /// The highest priority format of `kind` that `player` may use.
    pub fn get_format(&self, player: &dyn ProxyPlayer, kind: &str) -> Option<Arc<ChatFormat>> {
        self.active()
            .formats
            .iter()
            .find(|format| {
                format.kind().eq_ignore_ascii_case(kind)
                    && (!format.check_permission()
                        || player.has_permission(&format.permission_node()))
            })
            .cloned()
    }

    /// Run `render` with the resolver chain for `player` on `server`:
    /// parameters, then per-server placeholders, then registered placeholders.
    fn with_resolver<T>(
        &self,
        player: &dyn ProxyPlayer,
        server: Option<&str>,
        parameters: &PlaceholderParameters,
        render: impl FnOnce(&MarkupEngine, &dyn PlaceholderResolver) -> T,
    ) -> T {
        let active = self.active();
        let state = self.player_state(player);
        let registry = self.registry();

        let registered = RegisteredPlaceholders::new(
            &registry,
            PlaceholderContext {
                player,
                state: &state,
                stats: &self.stats,
                engine: &active.engine,
                now: Utc::now(),
            },
        );
        let server_values = ServerValues {
            state: &state,
            server,
        };
        let chain = ResolverChain::new()
            .with(parameters)
            .with(&server_values)
            .with(&registered);

        render(&active.engine, &chain)
    }

    /// Render arbitrary markup for `player` as seen on `server`.
    pub fn convert_for(
        &self,
        player: &dyn ProxyPlayer,
        server: Option<&str>,
        source: &str,
        parameters: &PlaceholderParameters,
    ) -> StyledText {
        self.with_resolver(player, server, parameters, |engine, resolver| {
            engine.render(source, resolver)
        })
    }

    fn render_format(
        &self,
        format: &ChatFormat,
        player: &dyn ProxyPlayer,
        server: Option<&str>,
        parameters: &PlaceholderParameters,
    ) -> StyledText {
        self.with_resolver(player, server, parameters, |engine, resolver| {
            format.render(engine, resolver)
        })
    }

    /// Render the `kind` format for `player` as seen on `server`.
    ///
    /// # Returns
    ///
    /// The rendered message, possibly empty, or `FormatNotFound` when no
    /// format of that kind applies
    pub fn format_for(
        &self,
        player: &dyn ProxyPlayer,
        server: Option<&str>,
        kind: &str,
        parameters: &PlaceholderParameters,
    ) -> ChatResult<StyledText> {
        let rendered = self
            .get_format(player, kind)
            .map(|format| self.render_format(&format, player, server, parameters));

        rendered.ok_or_else(|| {
            warn!("⚠️ No usable '{}' format for {}", kind, player.username());
            ChatError::FormatNotFound {
                kind: kind.to_string(),
            }
        })
    }

    /// Render the `kind` format on the player's own server.
    pub fn format(
        &self,
        player: &dyn ProxyPlayer,
        kind: &str,
        parameters: &PlaceholderParameters,
    ) -> ChatResult<StyledText> {
        let server = player.current_server();
        self.format_for(player, server.as_deref(), kind, parameters)
    }

    /// Substitute the player's placeholders in `text` without parsing markup.
    pub fn replace_placeholders(&self, player: &dyn ProxyPlayer, text: &str) -> String {
        let server = player.current_server();
        self.with_resolver(
            player,
            server.as_deref(),
            &PlaceholderParameters::new(),
            |_, resolver| replace_plain_placeholders(text, |key| resolver.resolve_plain(key)),
        )
    }

    /// Substitute placeholders that do not depend on a player.
    pub fn replace_generic_placeholders(&self, text: &str, player_count: usize) -> String {
        let now = Local::now();
        replace_plain_placeholders(text, |key| generic_placeholder(key, player_count, now))
    }

    // ========================================================================
    // Chat flows
    // ========================================================================

    /// Format a chat message and deliver it to everyone allowed to see it.
    ///
    /// The sender's own copy shows the message in aqua.
    pub fn handle_chat(
        &self,
        sender: &dyn ProxyPlayer,
        message: &str,
        online: &[&dyn ProxyPlayer],
        sink: &dyn MessageSink,
    ) -> ChatOutcome {
        let active = self.active();
        let config = &active.config;
        let gate = &config.require_permission;

        if gate.send && !sender.has_permission(PERMISSION_SEND) {
            if gate.passthrough {
                return ChatOutcome::PassThrough;
            }

            let notice = Some(gate.send_fail.as_str())
                .filter(|fail| !fail.is_empty())
                .map(|fail| active.engine.render(fail, &NoopResolver))
                .filter(|notice| !notice.is_empty());
            if let Some(notice) = &notice {
                sink.send(sender.uuid(), notice);
            }
            debug!("{} lacks {}, chat denied", sender.username(), PERMISSION_SEND);
            return ChatOutcome::Denied { notice };
        }

        self.update_player(sender, |state| state.set_afk(false));

        let parameters =
            PlaceholderParameters::new().with_styled("message", StyledText::text(message));
        let own_parameters = PlaceholderParameters::new().with_styled(
            "message",
            StyledText::styled(message, Style::colored(NamedColor::Aqua)),
        );

        let sender_server = sender.current_server();
        let rendered = self.get_format(sender, "chat").map(|format| {
            let server = sender_server.as_deref();
            let message = self.render_format(&format, sender, server, &parameters);
            (format, message)
        });

        let Some((format, outgoing)) = rendered else {
            debug!("No chat format applies to {}", sender.username());
            return if config.passthrough {
                ChatOutcome::PassThrough
            } else {
                ChatOutcome::Denied { notice: None }
            };
        };

        if config.log_chat_global {
            info!("💬 <{}> {}", sender.username(), message);
        }

        let mut recipients = 0;
        for recipient in online {
            let Some(server) = recipient.current_server() else {
                continue;
            };
            if gate.receive && !recipient.has_permission(PERMISSION_RECEIVE) {
                continue;
            }

            let parameters = if recipient.uuid() == sender.uuid() {
                &own_parameters
            } else {
                &parameters
            };

            let message = self.render_format(&format, sender, Some(&server), parameters);
            sink.send(recipient.uuid(), &message);
            recipients += 1;
        }

        ChatOutcome::Delivered {
            message: outgoing,
            recipients,
        }
    }

    /// Send a private message from `sender` to the player called `receiver`.
    pub fn whisper(
        &self,
        sender: &dyn ProxyPlayer,
        receiver: &str,
        message: &str,
        online: &[&dyn ProxyPlayer],
        sink: &dyn MessageSink,
    ) -> ChatResult<()> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.check_send(sender)?;

        let target = self
            .find_by_display_name(receiver, online)
            .ok_or_else(|| ChatError::PlayerNotFound(receiver.to_string()))?;

        self.update_player(sender, |state| state.set_afk(false));

        let parameters = PlaceholderParameters::new()
            .with_styled("message", StyledText::text(message))
            .with("sender", self.player_state(sender).display_name())
            .with("receiver", self.player_state(target).display_name());

        let sender_server = sender.current_server();
        let outgoing =
            self.format_for(sender, sender_server.as_deref(), "whisper-out", &parameters)?;
        let target_server = target.current_server();
        let incoming = self.format_for(target, target_server.as_deref(), "whisper", &parameters)?;

        sink.send(sender.uuid(), &outgoing);
        sink.send(target.uuid(), &incoming);
        debug!("{} whispered to {}", sender.username(), target.username());
        Ok(())
    }

    /// An action message (`/me`), shown to everyone including the sender.
    pub fn me(
        &self,
        sender: &dyn ProxyPlayer,
        message: &str,
        online: &[&dyn ProxyPlayer],
        sink: &dyn MessageSink,
    ) -> ChatResult<usize> {
        self.announce(sender, "me", message, online, sink)
    }

    /// An announcement (`/say`), shown to everyone including the sender.
    pub fn say(
        &self,
        sender: &dyn ProxyPlayer,
        message: &str,
        online: &[&dyn ProxyPlayer],
        sink: &dyn MessageSink,
    ) -> ChatResult<usize> {
        self.announce(sender, "say", message, online, sink)
    }

    fn announce(
        &self,
        sender: &dyn ProxyPlayer,
        kind: &str,
        message: &str,
        online: &[&dyn ProxyPlayer],
        sink: &dyn MessageSink,
    ) -> ChatResult<usize> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.check_send(sender)?;

        let parameters =
            PlaceholderParameters::new().with_styled("message", StyledText::text(message));
        let rendered = self.format(sender, kind, &parameters)?;
        Ok(self.broadcast(&rendered, online, sink))
    }

    fn check_send(&self, sender: &dyn ProxyPlayer) -> ChatResult<()> {
        let required = self.active().config.require_permission.send;
        if required && !sender.has_permission(PERMISSION_SEND) {
            return Err(ChatError::PermissionDenied(PERMISSION_SEND.to_string()));
        }
        Ok(())
    }

    /// Deliver `message` to every player on a server. Returns how many got it.
    pub fn broadcast(
        &self,
        message: &StyledText,
        online: &[&dyn ProxyPlayer],
        sink: &dyn MessageSink,
    ) -> usize {
        let mut delivered = 0;
        for player in online.iter().filter(|p| p.current_server().is_some()) {
            sink.send(player.uuid(), message);
            delivered += 1;
        }
        delivered
    }

    /// The message announcing that `player` switched to `server`.
    ///
    /// Cached state is reloaded so metadata changed elsewhere shows up.
    pub fn join_message(&self, player: &dyn ProxyPlayer, server: &str) -> ChatResult<StyledText> {
        self.forget_player(player.uuid());
        let parameters = PlaceholderParameters::for_server(server);
        self.format_for(player, Some(server), "join", &parameters)
    }

    pub fn login_message(&self, player: &dyn ProxyPlayer) -> ChatResult<StyledText> {
        self.format(player, "login", &PlaceholderParameters::new())
    }

    /// The message announcing that `player` left. Their state is dropped.
    pub fn logout_message(&self, player: &dyn ProxyPlayer) -> ChatResult<StyledText> {
        let message = self.format(player, "logout", &PlaceholderParameters::new());
        self.forget_player(player.uuid());
        message
    }

    /// Find an online player by nickname, falling back to usernames.
    pub fn find_by_display_name<'p>(
        &self,
        name: &str,
        online: &[&'p dyn ProxyPlayer],
    ) -> Option<&'p dyn ProxyPlayer> {
        let wanted = name.trim().to_lowercase();

        let by_nickname = online.iter().find(|player| {
            self.player_state(**player)
                .nickname()
                .is_some_and(|nickname| nickname.trim().to_lowercase() == wanted)
        });

        by_nickname
            .or_else(|| {
                online
                    .iter()
                    .find(|player| player.username().to_lowercase() == wanted)
            })
            .copied()
    }

    // ========================================================================
    // Tab list
    // ========================================================================

    /// Header and footer for `player`, or `None` when the tab list is not configured.
    pub fn tablist_header_footer(
        &self,
        player: &dyn ProxyPlayer,
        player_count: usize,
    ) -> Option<(StyledText, StyledText)> {
        let active = self.active();
        let tablist = &active.config.tablist;
        if !tablist.is_configured() {
            return None;
        }

        let render = |lines: &Option<Lines>| match lines {
            Some(lines) => {
                let text = self.replace_generic_placeholders(&lines.joined(), player_count);
                let text = self.replace_placeholders(player, &text);
                active.engine.render(&text, &NoopResolver)
            }
            None => StyledText::new(),
        };

        Some((render(&tablist.header), render(&tablist.footer)))
    }

    /// How `other` appears in the tab list of `viewer`.
    ///
    /// Players on another server get their server name appended in gray.
    pub fn tab_entry(
        &self,
        other: &dyn ProxyPlayer,
        viewer: &dyn ProxyPlayer,
    ) -> ChatResult<StyledText> {
        let viewer_server = viewer.current_server();
        let mut entry = self.format_for(
            other,
            viewer_server.as_deref(),
            "tab-entry",
            &PlaceholderParameters::new(),
        )?;

        if let Some(server) = other.current_server() {
            if viewer_server.as_deref() != Some(server.as_str()) {
                let suffix =
                    StyledText::styled(format!(" ({})", server), Style::colored(NamedColor::Gray));
                entry.graft(NodeId::ROOT, &suffix);
            }
        }

        Ok(entry)
    }

    // ========================================================================
    // Backend reports
    // ========================================================================

    /// Fold a tick report from a backend server into its statistics.
    pub fn register_ticks(&self, server: &str, mspt: f32, tps: f32, load: i32) -> TickSample {
        self.stats.record(server, mspt, tps, load)
    }

    /// A backend reported how long the player has been standing still.
    pub fn set_ticks_since_movement(&self, player: &dyn ProxyPlayer, ticks: u32) {
        self.update_player(player, |state| state.set_ticks_since_movement(ticks));
    }

    pub fn set_stationary(&self, player: &dyn ProxyPlayer, stationary: bool) {
        self.update_player(player, |state| state.set_stationary(stationary));
    }

    /// Store a styled placeholder a backend server pushed as JSON.
    pub fn set_server_placeholder(
        &self,
        player: &dyn ProxyPlayer,
        server: &str,
        key: &str,
        json: &str,
    ) -> bool {
        self.update_player(player, |state| state.set_server_placeholder(server, key, json))
    }

    // ========================================================================
    // Player settings
    // ========================================================================

    /// Set or clear the nickname and its color.
    ///
    /// A color the player may not use clears the nickname color.
    ///
    /// # Returns
    ///
    /// The confirmation to show the player
    pub fn set_nickname(
        &self,
        player: &dyn ProxyPlayer,
        nickname: Option<&str>,
        color: Option<&str>,
    ) -> StyledText {
        let color = color.and_then(NamedColor::from_name).filter(|color| {
            NICKNAME_COLORS.contains(color)
                || (*color == NamedColor::Gold && player.has_permission(PERMISSION_ALL_COLORS))
        });

        let state = self.update_player(player, |state| {
            state.set_nickname(nickname.filter(|n| !n.trim().is_empty()));
            state.set_nickname_color(color);
            state.clone()
        });

        let uuid = player.uuid();
        self.meta.set_meta(uuid, META_NICKNAME, state.nickname());
        self.meta
            .set_meta(uuid, META_NICKNAME_COLOR, state.nickname_color_code().as_deref());
        info!("✏️ {} is now known as {}", player.username(), state.display_name());

        let active = self.active();
        let name = format!(
            "{}{}",
            state.nickname_color_code().unwrap_or_default(),
            state.display_name()
        );

        let mut confirmation = StyledText::styled(
            "Your nickname has been set to ",
            Style::colored(NamedColor::Aqua),
        );
        confirmation.graft(NodeId::ROOT, &active.engine.render(&name, &NoopResolver));
        confirmation
    }

    pub fn set_pronouns(&self, player: &dyn ProxyPlayer, pronouns: Option<&str>) {
        let pronouns = pronouns.map(str::trim).filter(|p| !p.is_empty());
        self.update_player(player, |state| state.set_pronouns(pronouns));
        self.meta.set_meta(player.uuid(), META_PRONOUNS, pronouns);
    }

    /// Set or clear the timezone, given as an IANA id like `Europe/Brussels`.
    pub fn set_timezone(&self, player: &dyn ProxyPlayer, timezone: Option<&str>) -> ChatResult<()> {
        let timezone = match timezone.map(str::trim).filter(|tz| !tz.is_empty()) {
            Some(name) => Some(
                parse_timezone(name).ok_or_else(|| ChatError::UnknownTimezone(name.to_string()))?,
            ),
            None => None,
        };

        self.update_player(player, |state| state.set_timezone(timezone));
        let stored = timezone.map(|tz| tz.name());
        self.meta.set_meta(player.uuid(), META_TIMEZONE, stored);
        Ok(())
    }

    pub fn set_afk(&self, player: &dyn ProxyPlayer, afk: bool) {
        self.update_player(player, |state| state.set_afk(afk));
    }

    // ========================================================================
    // Push events
    // ========================================================================

    /// The JSON body pushed for `event`, or `None` when pushing is off.
    pub fn event_payload(
        &self,
        event: &str,
        player: &dyn ProxyPlayer,
    ) -> Option<serde_json::Value> {
        if !self.active().config.push_events.is_active() {
            return None;
        }

        let state = self.player_state(player);
        Some(json!({
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "player": {
                "uuid": player.uuid().to_string(),
                "username": player.username(),
                "display_name": state.display_name(),
                "ping": player.ping_ms(),
                "server": player.current_server(),
                "is_afk": state.is_afk(),
                "afk_since": state.afk_since().map(|since| since.to_rfc3339()),
                "status": state.status(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PushEventSettings;
    use crate::host::{CollectingSink, MemoryMetaStore, OfflinePlayer};
    use fluxchat_markup::FormatDefinition;

    fn plugin_with(formats: &[(&str, &str, i32, Option<&str>)]) -> FluxChatPlugin {
        let mut config = FluxChatConfig::default();
        config.formats.clear();
        for (id, template, priority, permission) in formats {
            config.formats.insert(
                id.to_string(),
                FormatDefinition {
                    kind: "chat".to_string(),
                    priority: *priority,
                    check_permission: permission.is_some(),
                    permission: permission.map(str::to_string),
                    format: template.to_string(),
                    extra: Default::default(),
                },
            );
        }
        FluxChatPlugin::new(config, Arc::new(MemoryMetaStore::new())).unwrap()
    }

    fn default_plugin() -> FluxChatPlugin {
        FluxChatPlugin::new(FluxChatConfig::default(), Arc::new(MemoryMetaStore::new())).unwrap()
    }

    #[test]
    fn highest_permitted_priority_wins() {
        let plugin = plugin_with(&[
            ("default", "{name}: {message}", 0, None),
            ("staff", "[Staff] {name}: {message}", 10, Some("fluxchat.staff")),
        ]);

        let staff = OfflinePlayer::new("Admin").grant("fluxchat.staff");
        let member = OfflinePlayer::new("Member");

        assert_eq!(plugin.get_format(&staff, "chat").unwrap().id(), "staff");
        assert_eq!(plugin.get_format(&member, "chat").unwrap().id(), "default");
        assert!(plugin.get_format(&member, "whisper").is_none());
    }

    #[test]
    fn parameters_shadow_placeholders() {
        let plugin = default_plugin();
        let player = OfflinePlayer::new("Steve").on_server("lobby");

        let parameters = PlaceholderParameters::new().with("username", "Impostor");
        let text = plugin.convert_for(&player, Some("lobby"), "{username}/{name}", &parameters);
        assert_eq!(text.plain_text(), "Impostor/Steve");
    }

    #[test]
    fn server_placeholders_apply_per_server() {
        let plugin = default_plugin();
        let player = OfflinePlayer::new("Steve").on_server("lobby");
        let rank = r#"{"text":"VIP","bold":true}"#;
        assert!(plugin.set_server_placeholder(&player, "lobby", "rank", rank));

        let none = PlaceholderParameters::new();
        let in_lobby = plugin.convert_for(&player, Some("lobby"), "[{rank}]", &none);
        assert_eq!(in_lobby.plain_text(), "[VIP]");
        let in_survival = plugin.convert_for(&player, Some("survival"), "[{rank}]", &none);
        assert_eq!(in_survival.plain_text(), "[]");
    }

    #[test]
    fn missing_format_is_an_error() {
        let plugin = plugin_with(&[("default", "{message}", 0, None)]);
        let player = OfflinePlayer::new("Steve");
        assert!(matches!(
            plugin.format(&player, "join", &PlaceholderParameters::new()),
            Err(ChatError::FormatNotFound { .. })
        ));
    }

    #[test]
    fn player_updates_may_read_player_state() {
        let plugin = default_plugin();
        let steve = OfflinePlayer::new("Steve");
        let alex = OfflinePlayer::new("Alex");

        let seen = plugin.update_player(&steve, |state| {
            state.set_afk(true);
            let own = plugin.player_state(&steve).display_name().to_string();
            let other = plugin.player_state(&alex).display_name().to_string();
            (own, other)
        });

        assert_eq!(seen, ("Steve".to_string(), "Alex".to_string()));
        assert!(plugin.player_state(&steve).is_afk());
    }

    #[test]
    fn registry_replaces_by_name() {
        struct Fixed(&'static str);
        impl Placeholder for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn lookup_string(&self, _ctx: &PlaceholderContext<'_>, key: &str) -> Option<String> {
                (key == "motto").then(|| self.0.to_string())
            }
        }

        let plugin = default_plugin();
        let player = OfflinePlayer::new("Steve");
        let none = PlaceholderParameters::new();

        plugin.register_placeholder(Arc::new(Fixed("first")));
        plugin.register_placeholder(Arc::new(Fixed("second")));
        assert_eq!(plugin.convert_for(&player, None, "{motto}", &none).plain_text(), "second");

        assert!(plugin.unregister_placeholder("fixed"));
        assert!(!plugin.unregister_placeholder("fixed"));
        assert_eq!(plugin.convert_for(&player, None, "{motto}", &none).plain_text(), "");
    }

    #[test]
    fn failed_reload_keeps_configuration() {
        let plugin = default_plugin();
        let before = plugin.active().formats.len();

        let mut broken = FluxChatConfig::default();
        broken.formats.clear();
        assert!(plugin.reload(broken).is_err());
        assert_eq!(plugin.active().formats.len(), before);
    }

    #[test]
    fn denied_sender_gets_notice() {
        let mut config = FluxChatConfig::default();
        config.require_permission.send = true;
        config.require_permission.passthrough = false;
        config.require_permission.send_fail = "<red>You may not chat.</red>".to_string();
        let plugin = FluxChatPlugin::new(config, Arc::new(MemoryMetaStore::new())).unwrap();

        let sender = OfflinePlayer::new("Muted").on_server("lobby");
        let sink = CollectingSink::new();
        let outcome = plugin.handle_chat(&sender, "hello", &[&sender], &sink);

        assert!(matches!(outcome, ChatOutcome::Denied { notice: Some(_) }));
        assert_eq!(sink.received_by(sender.uuid()), vec!["You may not chat."]);
    }

    #[test]
    fn whisper_and_me_need_send_permission() {
        let mut config = FluxChatConfig::default();
        config.require_permission.send = true;
        let plugin = FluxChatPlugin::new(config, Arc::new(MemoryMetaStore::new())).unwrap();

        let muted = OfflinePlayer::new("Muted").on_server("lobby");
        let other = OfflinePlayer::new("Other").on_server("lobby");
        let sink = CollectingSink::new();

        assert!(matches!(
            plugin.whisper(&muted, "other", "hi", &[&muted, &other], &sink),
            Err(ChatError::PermissionDenied(permission)) if permission == PERMISSION_SEND
        ));
        assert!(matches!(
            plugin.me(&muted, "waves", &[&muted, &other], &sink),
            Err(ChatError::PermissionDenied(_))
        ));
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn receive_permission_filters_recipients() {
        let mut config = FluxChatConfig::default();
        config.require_permission.receive = true;
        let plugin = FluxChatPlugin::new(config, Arc::new(MemoryMetaStore::new())).unwrap();

        let sender = OfflinePlayer::new("Steve").on_server("lobby").grant(PERMISSION_RECEIVE);
        let deaf = OfflinePlayer::new("Deaf").on_server("lobby");
        let sink = CollectingSink::new();

        let outcome = plugin.handle_chat(&sender, "hi", &[&sender, &deaf], &sink);
        assert!(matches!(outcome, ChatOutcome::Delivered { recipients: 1, .. }));
        assert!(sink.received_by(deaf.uuid()).is_empty());
    }

    #[test]
    fn nickname_colors_are_restricted() {
        let plugin = default_plugin();
        let player = OfflinePlayer::new("Steve");

        let confirmation = plugin.set_nickname(&player, Some("Stevie"), Some("green"));
        assert_eq!(confirmation.plain_text(), "Your nickname has been set to Stevie");
        assert_eq!(plugin.player_state(&player).nickname_color(), Some(NamedColor::Green));

        plugin.set_nickname(&player, Some("Stevie"), Some("gold"));
        assert_eq!(plugin.player_state(&player).nickname_color(), None);

        let op = OfflinePlayer::new("Op").grant(PERMISSION_ALL_COLORS);
        plugin.set_nickname(&op, Some("Boss"), Some("gold"));
        assert_eq!(plugin.player_state(&op).nickname_color(), Some(NamedColor::Gold));
    }

    #[test]
    fn settings_are_written_through() {
        let meta = Arc::new(MemoryMetaStore::new());
        let plugin = FluxChatPlugin::new(FluxChatConfig::default(), meta.clone()).unwrap();
        let player = OfflinePlayer::new("Steve");

        plugin.set_pronouns(&player, Some(" he/him "));
        plugin.set_timezone(&player, Some("America/Sao_Paulo")).unwrap();
        plugin.set_nickname(&player, Some("Stevo"), Some("dark_aqua"));

        assert_eq!(meta.get_meta(player.uuid(), META_PRONOUNS).as_deref(), Some("he/him"));
        assert_eq!(
            meta.get_meta(player.uuid(), META_TIMEZONE).as_deref(),
            Some("America/Sao_Paulo")
        );
        assert_eq!(meta.get_meta(player.uuid(), META_NICKNAME_COLOR).as_deref(), Some("&3"));

        assert!(matches!(
            plugin.set_timezone(&player, Some("Mars/Olympus")),
            Err(ChatError::UnknownTimezone(_))
        ));

        plugin.forget_player(player.uuid());
        assert_eq!(plugin.player_state(&player).display_name(), "Stevo");
    }

    #[test]
    fn event_payload_only_when_enabled() {
        let plugin = default_plugin();
        let player = OfflinePlayer::new("Steve").on_server("lobby").with_ping(30);
        assert!(plugin.event_payload("join", &player).is_none());

        let mut config = FluxChatConfig::default();
        config.push_events = PushEventSettings {
            enabled: true,
            endpoint: "https://hooks.example.com".to_string(),
        };
        plugin.reload(config).unwrap();
        plugin.set_afk(&player, true);

        let payload = plugin.event_payload("join", &player).unwrap();
        assert_eq!(payload["event"], "join");
        assert_eq!(payload["player"]["username"], "Steve");
        assert_eq!(payload["player"]["server"], "lobby");
        assert_eq!(payload["player"]["ping"], 30);
        assert_eq!(payload["player"]["is_afk"], true);
        assert_eq!(payload["player"]["status"]["alive"], true);
    }

    #[test]
    fn ticks_feed_placeholders() {
        let plugin = default_plugin();
        let player = OfflinePlayer::new("Steve").on_server("lobby");
        plugin.register_ticks("lobby", 25.0, 20.0, 70);

        let none = PlaceholderParameters::new();
        let text = plugin.convert_for(&player, Some("lobby"), "{tps}|{server_load}", &none);
        assert_eq!(text.plain_text(), "20.0|70");
    }
}
