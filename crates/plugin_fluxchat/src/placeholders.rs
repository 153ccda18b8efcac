//! Placeholders registered with the plugin.
//!
//! A [`Placeholder`] answers keys for a given player. The plugin keeps an
//! ordered registry of them; [`RegisteredPlaceholders`] adapts that registry
//! to the markup engine's [`PlaceholderResolver`] for one render.

use crate::host::ProxyPlayer;
use crate::player::ChatPlayer;
use crate::stats::ServerStats;
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use fluxchat_markup::{
    MarkupEngine, PlaceholderResolver, Replacement, ResolveResult, StyledText, Token,
};
use std::sync::Arc;

/// Everything a placeholder may look at while answering a key.
pub struct PlaceholderContext<'a> {
    pub player: &'a dyn ProxyPlayer,
    pub state: &'a ChatPlayer,
    pub stats: &'a ServerStats,
    pub engine: &'a MarkupEngine,
    pub now: DateTime<Utc>,
}

/// A source of per-player placeholder values.
///
/// Keys arrive as written in the template. Returning `Some("")` claims a key
/// without giving it a value, which stops later placeholders from answering it.
pub trait Placeholder: Send + Sync {
    /// Registry identity; registering a second placeholder with the same
    /// name replaces the first.
    fn name(&self) -> &str;

    fn lookup_string(&self, ctx: &PlaceholderContext<'_>, key: &str) -> Option<String>;

    fn lookup_styled(&self, _ctx: &PlaceholderContext<'_>, _key: &str) -> Option<StyledText> {
        None
    }
}

// ============================================================================
// Built-in placeholders
// ============================================================================

/// The placeholders every installation has.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPlaceholders;

impl StandardPlaceholders {
    pub const NAME: &'static str = "standard";
}

impl Placeholder for StandardPlaceholders {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn lookup_string(&self, ctx: &PlaceholderContext<'_>, key: &str) -> Option<String> {
        if let Some(permission) = permission_key(key) {
            return Some(ctx.player.has_permission(permission).to_string());
        }

        let server = ctx.player.current_server();
        let server = server.as_deref();

        let value = match key.to_lowercase().as_str() {
            "username" => ctx.player.username().to_string(),
            "name" | "display_name" | "display_username" => ctx.state.display_name().to_string(),
            "coloured_display_name" | "colored_display_name" => ctx.state.coloured_display_name(),
            "server_name" => server.unwrap_or("unknown").to_string(),
            "uuid" => ctx.player.uuid().to_string(),
            "pronouns" => ctx.state.pronouns().unwrap_or_default().to_string(),
            "pronouns_suffix" => ctx.state.pronouns_suffix(),
            "timezone" => ctx.state.timezone().unwrap_or_default().to_string(),
            "now" => ctx.state.local_time(ctx.now),
            "server_load" => ctx.stats.load(server).to_string(),
            "server_load_coloured" | "server_load_colored" => {
                load_coloured(ctx.stats.load(server))
            }
            "mspt" => format!("{:.1}", ctx.stats.mspt(server)),
            "tps" => format!("{:.1}", ctx.stats.tps(server)),
            "ping" => ctx
                .player
                .ping_ms()
                .map_or_else(|| "?".to_string(), |ping| ping.to_string()),
            _ => return None,
        };

        Some(value)
    }

    fn lookup_styled(&self, ctx: &PlaceholderContext<'_>, key: &str) -> Option<StyledText> {
        key.eq_ignore_ascii_case("tab_display_name")
            .then(|| ctx.state.tab_display_name(ctx.engine))
    }
}

/// The permission named by a `has_perm_<permission>` key, case kept.
fn permission_key(key: &str) -> Option<&str> {
    let prefix = key.get(..9)?;
    let permission = key.get(9..)?;
    (prefix.eq_ignore_ascii_case("has_perm_") && !permission.is_empty()).then_some(permission)
}

/// Server load with a legacy color code picked by how busy the server is.
fn load_coloured(load: i32) -> String {
    let code = match load {
        l if l > 100 => '4',
        l if l > 85 => 'c',
        l if l > 65 => '6',
        _ => '2',
    };
    format!("&{}{}", code, load)
}

/// Placeholders that do not depend on a player.
pub fn generic_placeholder(key: &str, player_count: usize, now: DateTime<Local>) -> Option<String> {
    let zoned = |tz: Tz| Some(now.with_timezone(&tz).format("%H:%M").to_string());

    match key.to_lowercase().as_str() {
        "playercount" | "player_count" => Some(player_count.to_string()),
        "server_date" => Some(now.format("%Y-%m-%d").to_string()),
        "server_time" => Some(now.format("%H:%M").to_string()),
        "local_time_nz" => zoned(Tz::NZ),
        "local_time_cet" => zoned(Tz::CET),
        "local_time_est" | "local_time_ny" => zoned(Tz::America__New_York),
        "local_time_pst" | "local_time_la" => zoned(Tz::America__Los_Angeles),
        _ => None,
    }
}

// ============================================================================
// Resolver adapter
// ============================================================================

/// The registered placeholders, bound to one player for one render.
pub struct RegisteredPlaceholders<'a> {
    registry: &'a [Arc<dyn Placeholder>],
    ctx: PlaceholderContext<'a>,
}

impl<'a> RegisteredPlaceholders<'a> {
    pub fn new(registry: &'a [Arc<dyn Placeholder>], ctx: PlaceholderContext<'a>) -> Self {
        Self { registry, ctx }
    }

    /// First styled value, then first string value, in registration order.
    pub fn lookup(&self, key: &str) -> Option<Replacement> {
        if let Some(styled) = self
            .registry
            .iter()
            .find_map(|placeholder| placeholder.lookup_styled(&self.ctx, key))
        {
            return Some(Replacement::Styled(styled));
        }

        self.registry
            .iter()
            .find_map(|placeholder| placeholder.lookup_string(&self.ctx, key))
            .map(Replacement::Text)
    }
}

impl PlaceholderResolver for RegisteredPlaceholders<'_> {
    fn resolve(&self, token: &Token) -> ResolveResult<Option<Replacement>> {
        Ok(self.lookup(token.content()))
    }
}
