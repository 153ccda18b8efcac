//! Values passed to a single format render.

use fluxchat_markup::{PlaceholderResolver, Replacement, ResolveResult, StyledText, Token};
use std::collections::HashMap;

/// Placeholder values for one render, such as `message` or `receiver`.
///
/// A key can hold a string, a styled value, or both; the styled value wins.
/// String values go back through the markup pipeline like any other
/// resolved string.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderParameters {
    strings: HashMap<String, String>,
    styled: HashMap<String, StyledText>,
}

impl PlaceholderParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters describing the server a player is on.
    pub fn for_server(server: &str) -> Self {
        Self::new()
            .with("server", server)
            .with("server_name", server)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.strings.insert(key.to_lowercase(), value.into());
    }

    pub fn set_styled(&mut self, key: &str, value: StyledText) {
        self.styled.insert(key.to_lowercase(), value);
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_styled(mut self, key: &str, value: StyledText) -> Self {
        self.set_styled(key, value);
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.strings.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn get_styled(&self, key: &str) -> Option<&StyledText> {
        self.styled.get(&key.to_lowercase())
    }

    /// The styled value, or the string value as a single text leaf.
    pub fn get(&self, key: &str) -> Option<StyledText> {
        self.get_styled(key)
            .cloned()
            .or_else(|| self.get_string(key).map(StyledText::text))
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.styled.is_empty()
    }
}

impl PlaceholderResolver for PlaceholderParameters {
    fn resolve(&self, token: &Token) -> ResolveResult<Option<Replacement>> {
        let key = token.content();
        if let Some(styled) = self.get_styled(key) {
            return Ok(Some(Replacement::Styled(styled.clone())));
        }
        Ok(self
            .get_string(key)
            .map(|value| Replacement::Text(value.to_string())))
    }
}
