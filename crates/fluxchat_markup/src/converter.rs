//! Builds a [`StyledText`] tree from a normalized token list.

use crate::chain::TokenList;
use crate::engine::MarkupEngine;
use crate::resolver::{guarded_resolve, PlaceholderResolver, Replacement};
use crate::text::{HoverEvent, NodeId, StyledText};
use crate::token::{Token, TokenKind};
use tracing::debug;

/// One conversion of a token list into a tree.
///
/// Opening tags allocate detached nodes; a node is attached to its parent
/// when it is closed. Placeholders go through the resolver and string values
/// are converted recursively with the same resolver.
pub struct Converter<'a> {
    tokens: &'a TokenList,
    resolver: &'a dyn PlaceholderResolver,
    engine: &'a MarkupEngine,
    /// Placeholder keys currently being expanded, outermost first.
    expanding: Vec<String>,
    tree: StyledText,
    current: NodeId,
    open: Vec<NodeId>,
}

impl<'a> Converter<'a> {
    pub fn new(
        tokens: &'a TokenList,
        resolver: &'a dyn PlaceholderResolver,
        engine: &'a MarkupEngine,
    ) -> Self {
        Self::nested(tokens, resolver, engine, Vec::new())
    }

    fn nested(
        tokens: &'a TokenList,
        resolver: &'a dyn PlaceholderResolver,
        engine: &'a MarkupEngine,
        expanding: Vec<String>,
    ) -> Self {
        Self {
            tokens,
            resolver,
            engine,
            expanding,
            tree: StyledText::new(),
            current: NodeId::ROOT,
            open: Vec::new(),
        }
    }

    /// Run the conversion. Never fails.
    pub fn convert(mut self) -> StyledText {
        let tokens = self.tokens;
        for token in tokens {
            self.handle(token);
        }

        self.close_all();
        self.tree
    }

    fn handle(&mut self, token: &Token) {
        if token.is_reset() {
            self.close_all();
            return;
        }

        match token.kind() {
            TokenKind::OpeningTag | TokenKind::ColorCode => self.open(token),
            TokenKind::ClosingTag => self.close(),
            TokenKind::PlainText => {
                self.tree.push_text(self.current, token.content());
            }
            TokenKind::Placeholder => self.placeholder(token),
        }
    }

    fn open(&mut self, token: &Token) {
        let id = self.tree.alloc(token.style().clone());
        let node = self.tree.node_mut(id);

        if let Some(click) = token.click() {
            node.set_click(Some(click.clone()));
        }
        if let Some(hover) = token.hover_text() {
            node.set_hover(Some(HoverEvent::ShowText(StyledText::text(hover))));
        }

        self.open.push(id);
        self.current = id;
    }

    fn close(&mut self) {
        if self.current == NodeId::ROOT {
            return;
        }

        if let Some(finished) = self.open.pop() {
            self.current = self.open.last().copied().unwrap_or(NodeId::ROOT);
            self.tree.attach(self.current, finished);
        }
    }

    fn close_all(&mut self) {
        while !self.open.is_empty() {
            self.close();
        }
    }

    fn placeholder(&mut self, token: &Token) {
        let key = token.content();

        let replacement = if self.expanding.iter().any(|outer| outer == key) {
            debug!("Placeholder '{}' refers to itself, skipping", key);
            None
        } else {
            guarded_resolve(self.resolver, token)
        };

        match replacement {
            Some(Replacement::Styled(styled)) => {
                self.tree.graft(self.current, &styled);
            }
            Some(Replacement::Text(value)) => {
                if token.allows_decoration() && value != key {
                    if self.expanding.len() < self.engine.options().max_depth {
                        let expanded = self.expand(key, &value);
                        self.tree.graft(self.current, &expanded);
                        return;
                    }
                    debug!("Placeholder nesting limit reached at '{}'", key);
                }
                self.tree.push_text(self.current, value);
            }
            None => {
                if self.engine.options().echo_unresolved {
                    self.tree.push_text(self.current, token.raw());
                }
            }
        }
    }

    fn expand(&self, key: &str, value: &str) -> StyledText {
        let tokens = self.engine.parse(value);
        let mut expanding = self.expanding.clone();
        expanding.push(key.to_string());

        Converter::nested(&tokens, self.resolver, self.engine, expanding).convert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{NamedColor, TextColor};
    use crate::error::ResolveResult;
    use crate::resolver::NoopResolver;
    use crate::text::Style;

    fn convert(input: &str, resolver: &dyn PlaceholderResolver) -> StyledText {
        let engine = MarkupEngine::default();
        let tokens = engine.parse(input);
        Converter::new(&tokens, resolver, &engine).convert()
    }

    #[test]
    fn stray_closing_tag_at_root_is_ignored() {
        let tree = convert("a</b>c", &NoopResolver);
        assert_eq!(tree.plain_text(), "ac");
        assert_eq!(tree.root().child_count(), 2);
    }

    #[test]
    fn unclosed_tags_are_flushed_into_the_root() {
        let tree = convert("<b>a<i>b", &NoopResolver);
        let bold = tree.root().child(0).unwrap();
        assert!(bold.style().bold);
        assert_eq!(bold.child_count(), 2);
        assert!(bold.child(1).unwrap().style().italic);
    }

    #[test]
    fn reset_closes_every_span() {
        let tree = convert("&cred &lbold&r plain", &NoopResolver);
        let root = tree.root();
        assert_eq!(root.child_count(), 2);
        assert_eq!(root.child(1).unwrap().text(), " plain");
        assert!(root.child(1).unwrap().style().is_plain());
    }

    #[test]
    fn node_local_click_and_hover() {
        let tree = convert(
            "<click:run_command:/spawn><hover:Teleport>go</hover></click>",
            &NoopResolver,
        );
        let click = tree.root().child(0).unwrap();
        assert_eq!(click.click().map(|c| c.value.as_str()), Some("/spawn"));
        let hover = click.child(0).unwrap();
        match hover.hover() {
            Some(HoverEvent::ShowText(text)) => assert_eq!(text.plain_text(), "Teleport"),
            None => panic!("hover missing"),
        }
    }

    #[test]
    fn self_referencing_placeholder_terminates() {
        let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
            Ok(match token.content() {
                "loop" => Some("again {loop}".into()),
                _ => None,
            })
        };
        let tree = convert("{loop}", &resolver);
        assert_eq!(tree.plain_text(), "again ");
    }

    #[test]
    fn mutual_recursion_terminates() {
        let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
            Ok(match token.content() {
                "a" => Some("A{b}".into()),
                "b" => Some("B{a}".into()),
                _ => None,
            })
        };
        assert_eq!(convert("{a}", &resolver).plain_text(), "AB");
    }

    #[test]
    fn nesting_is_capped() {
        let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
            let depth: usize = token.content().trim_start_matches('p').parse().unwrap_or(0);
            Ok(Some(format!("<red>{{p{}}}</red>", depth + 1).into()))
        };
        let engine = MarkupEngine::default();
        let tokens = engine.parse("{p0}");
        let tree = Converter::new(&tokens, &resolver, &engine).convert();

        let max_depth = engine.options().max_depth;
        assert_eq!(tree.plain_text(), format!("<red>{{p{}}}</red>", max_depth + 1));
    }

    #[test]
    fn styled_replacement_is_grafted() {
        let resolver = |_: &Token| -> ResolveResult<Option<Replacement>> {
            Ok(Some(
                StyledText::styled("lobby", Style::colored(NamedColor::Gold)).into(),
            ))
        };
        let tree = convert("[{server}]", &resolver);
        assert_eq!(tree.plain_text(), "[lobby]");
        let server = tree.root().child(1).unwrap();
        assert_eq!(server.style().color, Some(TextColor::Named(NamedColor::Gold)));
    }

    #[test]
    fn value_equal_to_key_is_literal() {
        let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
            Ok(Some(token.content().into()))
        };
        let tree = convert("{name}", &resolver);
        assert_eq!(tree.plain_text(), "name");
        assert_eq!(tree.root().child_count(), 1);
    }
}
