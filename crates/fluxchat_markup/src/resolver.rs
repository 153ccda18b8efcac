//! Placeholder lookup.

use crate::error::ResolveResult;
use crate::text::StyledText;
use crate::token::Token;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// The value a placeholder resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// A string. Parsed as markup when the placeholder allows decoration.
    Text(String),
    /// Pre-built styled content, inserted as is.
    Styled(StyledText),
}

impl From<String> for Replacement {
    fn from(text: String) -> Self {
        Replacement::Text(text)
    }
}

impl From<&str> for Replacement {
    fn from(text: &str) -> Self {
        Replacement::Text(text.to_string())
    }
}

impl From<StyledText> for Replacement {
    fn from(text: StyledText) -> Self {
        Replacement::Styled(text)
    }
}

/// Maps placeholder tokens to replacement content.
///
/// `Ok(None)` means "no value here"; an unresolved placeholder renders as
/// nothing. Errors and panics never escape a conversion: they are logged and
/// treated like `Ok(None)` for that one placeholder.
pub trait PlaceholderResolver {
    fn resolve(&self, token: &Token) -> ResolveResult<Option<Replacement>>;

    /// Look up `key` as plain text, for places where markup is not parsed.
    fn resolve_plain(&self, key: &str) -> Option<String> {
        let token = Token::literal_placeholder(key);
        match guarded_resolve(self, &token)? {
            Replacement::Text(text) => Some(text),
            Replacement::Styled(text) => Some(text.plain_text()),
        }
    }
}

impl<F> PlaceholderResolver for F
where
    F: Fn(&Token) -> ResolveResult<Option<Replacement>>,
{
    fn resolve(&self, token: &Token) -> ResolveResult<Option<Replacement>> {
        self(token)
    }
}

/// Invoke a resolver, absorbing errors and panics.
pub fn guarded_resolve<R>(resolver: &R, token: &Token) -> Option<Replacement>
where
    R: PlaceholderResolver + ?Sized,
{
    match catch_unwind(AssertUnwindSafe(|| resolver.resolve(token))) {
        Ok(Ok(replacement)) => replacement,
        Ok(Err(e)) => {
            warn!("⚠️ Placeholder '{}' failed: {}", token.content(), e);
            None
        }
        Err(_) => {
            warn!("💥 Placeholder '{}' panicked, rendering it empty", token.content());
            None
        }
    }
}

/// A resolver that never has a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl PlaceholderResolver for NoopResolver {
    fn resolve(&self, _token: &Token) -> ResolveResult<Option<Replacement>> {
        Ok(None)
    }
}

/// Resolvers consulted in order; the first value wins.
#[derive(Default)]
pub struct ResolverChain<'a> {
    links: Vec<&'a dyn PlaceholderResolver>,
}

impl<'a> ResolverChain<'a> {
    pub fn new() -> Self {
        Self { links: Vec::new() }
    }

    pub fn with(mut self, resolver: &'a dyn PlaceholderResolver) -> Self {
        self.links.push(resolver);
        self
    }

    pub fn push(&mut self, resolver: &'a dyn PlaceholderResolver) {
        self.links.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl PlaceholderResolver for ResolverChain<'_> {
    fn resolve(&self, token: &Token) -> ResolveResult<Option<Replacement>> {
        Ok(self
            .links
            .iter()
            .find_map(|link| guarded_resolve(*link, token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;

    fn fixed(
        key: &'static str,
        value: &'static str,
    ) -> impl Fn(&Token) -> ResolveResult<Option<Replacement>> {
        move |token: &Token| Ok((token.content() == key).then(|| Replacement::from(value)))
    }

    #[test]
    fn closures_are_resolvers() {
        let resolver = fixed("name", "Steve");
        assert_eq!(resolver.resolve_plain("name").as_deref(), Some("Steve"));
        assert_eq!(resolver.resolve_plain("other"), None);
    }

    #[test]
    fn noop_never_resolves() {
        assert!(NoopResolver.resolve(&Token::placeholder("x")).unwrap().is_none());
    }

    #[test]
    fn chain_prefers_earlier_links() {
        let first = fixed("name", "first");
        let second = fixed("name", "second");
        let fallback = fixed("server", "lobby");
        let chain = ResolverChain::new().with(&first).with(&second).with(&fallback);

        assert_eq!(chain.resolve_plain("name").as_deref(), Some("first"));
        assert_eq!(chain.resolve_plain("server").as_deref(), Some("lobby"));
        assert_eq!(chain.resolve_plain("missing"), None);
    }

    #[test]
    fn failing_links_are_skipped() {
        let failing = |token: &Token| -> ResolveResult<Option<Replacement>> {
            Err(ResolveError::Backend {
                key: token.content().to_string(),
                reason: "store offline".to_string(),
            })
        };
        let panicking = |_: &Token| -> ResolveResult<Option<Replacement>> { panic!("boom") };
        let working = fixed("name", "Alex");
        let chain = ResolverChain::new().with(&failing).with(&panicking).with(&working);

        assert_eq!(chain.resolve_plain("name").as_deref(), Some("Alex"));
    }

    #[test]
    fn styled_values_flatten_to_plain_text() {
        let styled = |_: &Token| -> ResolveResult<Option<Replacement>> {
            Ok(Some(StyledText::text("lobby-1").into()))
        };
        assert_eq!(styled.resolve_plain("server").as_deref(), Some("lobby-1"));
    }
}
