//! The markup pipeline as one reusable value.

use crate::chain::TokenList;
use crate::converter::Converter;
use crate::resolver::PlaceholderResolver;
use crate::text::StyledText;
use crate::token::Token;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};

/// Behaviour switches of the pipeline, usually read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupOptions {
    /// Accept `&` as a legacy code marker next to `§`.
    pub ampersand_codes: bool,
    /// How deep placeholder values may expand into further placeholders.
    pub max_depth: usize,
    /// Render unresolved placeholders as their literal `{key}` instead of nothing.
    pub echo_unresolved: bool,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            ampersand_codes: true,
            max_depth: 8,
            echo_unresolved: false,
        }
    }
}

/// Tokenizer, normalizer and tree builder behind one set of options.
///
/// Holds no mutable state, so one engine can be shared by every thread that
/// formats messages.
#[derive(Debug, Clone, Default)]
pub struct MarkupEngine {
    options: MarkupOptions,
    tokenizer: Tokenizer,
}

impl MarkupEngine {
    pub fn new(options: MarkupOptions) -> Self {
        let tokenizer = Tokenizer::new(options.ampersand_codes);
        Self { options, tokenizer }
    }

    pub fn options(&self) -> &MarkupOptions {
        &self.options
    }

    /// Raw tokens of `input`, before normalization.
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        self.tokenizer.tokenize(input)
    }

    /// Tokenize and normalize `input`.
    pub fn parse(&self, input: &str) -> TokenList {
        self.tokenize(input).into_iter().collect()
    }

    /// Build a tree from already parsed tokens.
    pub fn convert(&self, tokens: &TokenList, resolver: &dyn PlaceholderResolver) -> StyledText {
        Converter::new(tokens, resolver, self).convert()
    }

    /// Parse and convert `input` in one go.
    pub fn render(&self, input: &str, resolver: &dyn PlaceholderResolver) -> StyledText {
        let tokens = self.parse(input);
        self.convert(&tokens, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NoopResolver;

    #[test]
    fn options_deserialize_with_defaults() {
        let options: MarkupOptions = toml::from_str("max_depth = 2").unwrap();
        assert_eq!(
            options,
            MarkupOptions {
                max_depth: 2,
                ..MarkupOptions::default()
            }
        );
    }

    #[test]
    fn ampersand_codes_can_be_disabled() {
        let engine = MarkupEngine::new(MarkupOptions {
            ampersand_codes: false,
            ..MarkupOptions::default()
        });
        let tree = engine.render("&ctext", &NoopResolver);
        assert_eq!(tree.plain_text(), "&ctext");
    }

    #[test]
    fn echo_unresolved_keeps_the_placeholder() {
        let engine = MarkupEngine::new(MarkupOptions {
            echo_unresolved: true,
            ..MarkupOptions::default()
        });
        assert_eq!(engine.render("hi {who}", &NoopResolver).plain_text(), "hi {who}");
        assert_eq!(MarkupEngine::default().render("hi {who}", &NoopResolver).plain_text(), "hi ");
    }
}
