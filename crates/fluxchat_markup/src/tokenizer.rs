//! Splits a template string into raw tokens.
//!
//! Scanning is a single left-to-right pass driven by [`ScanState`]. Each
//! state either consumes a complete token or falls back to plain text, so no
//! input is ever rejected. A second pass splits the plain runs at legacy
//! color codes.

use crate::color::LegacyCode;
use crate::token::{Token, TokenKind};
use tracing::trace;

const SECTION: char = '§';
const AMPERSAND: char = '&';

/// What the scanner is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    PlainText,
    OpenTagCandidate,
    CloseTagCandidate,
    PlaceholderCandidate,
}

/// Turns template strings into token sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    ampersand_codes: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Tokenizer {
    /// Create a tokenizer.
    ///
    /// # Arguments
    ///
    /// * `ampersand_codes` - Also treat `&` followed by a legacy code
    ///   character as a color code, next to the always accepted `§`.
    pub fn new(ampersand_codes: bool) -> Self {
        Self { ampersand_codes }
    }

    /// Tokenize `input`.
    ///
    /// Concatenating [`Token::raw`] over the result reproduces `input`.
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        if input.is_empty() {
            return Vec::new();
        }

        let scanned = Scanner::new(input).run();
        let mut tokens = Vec::with_capacity(scanned.len());

        for token in scanned {
            if token.kind() == TokenKind::PlainText {
                self.split_color_codes(token.content(), &mut tokens);
            } else {
                tokens.push(token);
            }
        }

        trace!("Tokenized {} chars into {} tokens", input.len(), tokens.len());
        tokens
    }

    fn split_color_codes(&self, text: &str, out: &mut Vec<Token>) {
        let mut run = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            let code = match (c, chars.peek()) {
                (SECTION, Some(&next)) => Some(next),
                (AMPERSAND, Some(&next))
                    if self.ampersand_codes && LegacyCode::from_char(next).is_some() =>
                {
                    Some(next)
                }
                _ => None,
            };

            match code {
                Some(code) => {
                    chars.next();
                    if !run.is_empty() {
                        out.push(Token::plain(std::mem::take(&mut run)));
                    }
                    out.push(Token::color_code(c, code));
                }
                None => run.push(c),
            }
        }

        if !run.is_empty() {
            out.push(Token::plain(run));
        }
    }
}

// ============================================================================
// First pass
// ============================================================================

struct Scanner<'a> {
    source: &'a str,
    position: usize,
    state: ScanState,
    plain: String,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            state: ScanState::PlainText,
            plain: String::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.position < self.source.len() {
            self.state = self.classify();

            match self.state {
                ScanState::PlainText => self.take_char(),
                ScanState::PlaceholderCandidate => self.take_placeholder(),
                ScanState::OpenTagCandidate | ScanState::CloseTagCandidate => self.take_tag(),
            }
        }

        self.flush();
        self.tokens
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn classify(&self) -> ScanState {
        let rest = self.rest();

        if rest.starts_with('{') {
            return ScanState::PlaceholderCandidate;
        }

        if let Some(body) = tag_body(rest) {
            if body.starts_with('/') {
                return ScanState::CloseTagCandidate;
            }
            if body
                .chars()
                .next()
                .map_or(false, |c| c.is_alphabetic() || c == '#')
            {
                return ScanState::OpenTagCandidate;
            }
        }

        ScanState::PlainText
    }

    fn take_char(&mut self) {
        if let Some(c) = self.rest().chars().next() {
            self.plain.push(c);
            self.position += c.len_utf8();
        }
    }

    fn take_placeholder(&mut self) {
        let rest = self.rest();

        match rest[1..].find('}') {
            Some(end) => {
                self.flush();
                self.tokens.push(Token::placeholder(&rest[1..1 + end]));
                self.position += end + 2;
            }
            None => {
                // Unterminated: everything left is literal.
                self.plain.push_str(rest);
                self.position = self.source.len();
            }
        }
    }

    fn take_tag(&mut self) {
        let Some(body) = tag_body(self.rest()) else {
            self.take_char();
            return;
        };

        self.flush();
        let token = match (self.state, body.strip_prefix('/')) {
            (ScanState::CloseTagCandidate, Some(name)) => Token::closing_tag(name),
            _ => Token::opening_tag(body),
        };
        self.tokens.push(token);
        self.position += body.len() + 2;
    }

    fn flush(&mut self) {
        if !self.plain.is_empty() {
            self.tokens.push(Token::plain(std::mem::take(&mut self.plain)));
        }
    }
}

/// The text between a leading `<` and the next `>`, if that span contains no
/// other `<` or `{`.
fn tag_body(rest: &str) -> Option<&str> {
    let after = rest.strip_prefix('<')?;
    let end = after.find('>')?;
    let body = &after[..end];

    if body.contains('<') || body.contains('{') {
        return None;
    }

    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(Token::kind).collect()
    }

    fn raw(tokens: &[Token]) -> String {
        tokens.iter().map(Token::raw).collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(Tokenizer::default().tokenize("").is_empty());
    }

    #[test]
    fn plain_text_is_one_token() {
        let tokens = Tokenizer::default().tokenize("just some words");
        assert_eq!(tokens, vec![Token::plain("just some words")]);
    }

    #[test]
    fn tags_and_placeholders() {
        let tokens = Tokenizer::default().tokenize("<b>Hi {username}</b>!");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::OpeningTag,
                TokenKind::PlainText,
                TokenKind::Placeholder,
                TokenKind::ClosingTag,
                TokenKind::PlainText,
            ]
        );
        assert_eq!(tokens[2].content(), "username");
        assert_eq!(tokens[3].content(), "b");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        let tokens = Tokenizer::default().tokenize("a {b <i>c");
        assert_eq!(tokens, vec![Token::plain("a {b <i>c")]);
    }

    #[test]
    fn ambiguous_angle_brackets_stay_literal() {
        let tokens = Tokenizer::default().tokenize("1 < 2 and 3 > 2");
        assert_eq!(tokens, vec![Token::plain("1 < 2 and 3 > 2")]);

        let tokens = Tokenizer::default().tokenize("<<b>x");
        assert_eq!(
            tokens,
            vec![Token::plain("<"), Token::opening_tag("b"), Token::plain("x")]
        );

        let tokens = Tokenizer::default().tokenize("<a{x}>");
        assert_eq!(
            tokens,
            vec![Token::plain("<a"), Token::placeholder("x"), Token::plain(">")]
        );
    }

    #[test]
    fn hex_tags_are_opening_tags() {
        let tokens = Tokenizer::default().tokenize("<#ff8800>x</#ff8800>");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::OpeningTag, TokenKind::PlainText, TokenKind::ClosingTag]
        );
    }

    #[test]
    fn legacy_codes_split_plain_runs() {
        let tokens = Tokenizer::default().tokenize("&eYellow §cRed");
        assert_eq!(
            tokens,
            vec![
                Token::color_code('&', 'e'),
                Token::plain("Yellow "),
                Token::color_code('§', 'c'),
                Token::plain("Red"),
            ]
        );
    }

    #[test]
    fn ampersand_needs_a_code_character() {
        let tokens = Tokenizer::default().tokenize("fish & chips &z");
        assert_eq!(tokens, vec![Token::plain("fish & chips &z")]);

        let tokens = Tokenizer::new(false).tokenize("&ex");
        assert_eq!(tokens, vec![Token::plain("&ex")]);
    }

    #[test]
    fn trailing_section_sign_is_literal() {
        let tokens = Tokenizer::default().tokenize("end§");
        assert_eq!(tokens, vec![Token::plain("end§")]);
    }

    #[test]
    fn raw_reproduces_input() {
        let inputs = [
            "<gold>[{server_name}]</gold> {!username}: {message}",
            "&l&cAlert§r <click:run_command:/spawn>here</click> {oops",
            "<<>> </> <1> {} §",
            "ünïcödé <b>テキスト</b> &a✓",
        ];

        for input in inputs {
            assert_eq!(raw(&Tokenizer::default().tokenize(input)), input);
        }
    }
}
