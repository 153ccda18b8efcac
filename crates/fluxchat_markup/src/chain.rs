//! Keeps a token stream well nested.
//!
//! [`TagChain`] decides, one token at a time, what has to be emitted so that
//! every closing tag closes the innermost open span. [`TokenList`] stores the
//! emitted tokens.

use crate::token::{Token, TokenKind};
use tracing::debug;

/// Stack of currently open tags.
#[derive(Debug, Clone, Default)]
pub struct TagChain {
    open: Vec<Token>,
}

impl TagChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one token and get back the tokens to emit, in order.
    ///
    /// - A reset clears the chain and is emitted alone.
    /// - An opening tag is pushed and emitted.
    /// - A closing tag without a matching open tag is dropped. Otherwise every
    ///   tag opened after the match is closed first, innermost first.
    /// - A legacy color code closes the oldest open legacy code and everything
    ///   above it before being pushed, so consecutive colors become siblings.
    ///   Markup tags closed that way are opened again inside the new color.
    /// - Text and placeholders pass through.
    pub fn append(&mut self, token: Token) -> Vec<Token> {
        if token.is_reset() {
            self.open.clear();
            return vec![token];
        }

        match token.kind() {
            TokenKind::OpeningTag => {
                self.open.push(token.clone());
                vec![token]
            }
            TokenKind::ColorCode => {
                let index = match self.open.iter().position(Token::is_color_code) {
                    Some(index) if token.is_legacy_color() => index,
                    _ => {
                        self.open.push(token.clone());
                        return vec![token];
                    }
                };

                let reopen: Vec<Token> = self.open[index..]
                    .iter()
                    .filter(|open| !open.is_color_code())
                    .cloned()
                    .collect();
                let mut emitted = self.close_from(index);
                self.open.push(token.clone());
                emitted.push(token);

                self.open.extend(reopen.iter().cloned());
                emitted.extend(reopen);
                emitted
            }
            TokenKind::ClosingTag => {
                let name = token.tag_name();
                match self.open.iter().rposition(|open| open.tag_name() == name) {
                    Some(index) => {
                        let mut emitted = self.close_from(index + 1);
                        self.open.truncate(index);
                        emitted.push(token);
                        emitted
                    }
                    None => {
                        debug!("Dropping unmatched closing tag {}", token.raw());
                        Vec::new()
                    }
                }
            }
            TokenKind::PlainText | TokenKind::Placeholder => vec![token],
        }
    }

    /// Number of open tags.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Open tags, outermost first.
    pub fn open_tags(&self) -> impl Iterator<Item = &Token> {
        self.open.iter()
    }

    /// Pop every entry from `index` up and synthesize their closing tags, top first.
    fn close_from(&mut self, index: usize) -> Vec<Token> {
        self.open
            .drain(index..)
            .rev()
            .filter_map(|open| open.tag_name().map(Token::closing_tag))
            .collect()
    }
}

/// A normalized token sequence.
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
    chain: TagChain,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token, together with whatever the chain synthesizes for it.
    pub fn push(&mut self, token: Token) {
        let emitted = self.chain.append(token);
        self.tokens.extend(emitted);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Tags still open after the last push.
    pub fn open_tags(&self) -> impl Iterator<Item = &Token> {
        self.chain.open_tags()
    }

    /// Source text of the normalized sequence.
    pub fn raw(&self) -> String {
        self.tokens.iter().map(Token::raw).collect()
    }
}

impl Extend<Token> for TokenList {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        for token in iter {
            self.push(token);
        }
    }
}

impl FromIterator<Token> for TokenList {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        let mut list = TokenList::new();
        list.extend(iter);
        list
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
