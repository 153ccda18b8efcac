//! Lexical units of a template string.

use crate::color::{LegacyCode, TextColor};
use crate::text::{ClickAction, ClickEvent, Style};
use once_cell::sync::OnceCell;
use std::fmt;

/// What a [`Token`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Literal text.
    PlainText,
    /// A `{name}` reference, content without the braces.
    Placeholder,
    /// A `<tag>`, content without the angle brackets.
    OpeningTag,
    /// A `</tag>`, content without `</` and `>`.
    ClosingTag,
    /// A two character legacy code such as `§e` or `&l`.
    ColorCode,
}

/// Attributes derived from a token's content and kind.
#[derive(Debug, Clone, Default, PartialEq)]
struct Attributes {
    tag_name: Option<String>,
    style: Style,
    click: Option<ClickEvent>,
    hover: Option<String>,
    reset: bool,
    legacy_color: bool,
}

/// One lexical unit of a template.
///
/// The kind never changes after construction. Everything derived from the
/// content (tag name, color, decorations, reset) is computed on first use and
/// cached, so a token list shared between threads is parsed at most once.
#[derive(Debug, Clone)]
pub struct Token {
    content: String,
    kind: TokenKind,
    allows_decoration: bool,
    attributes: OnceCell<Attributes>,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.content == other.content
            && self.allows_decoration == other.allows_decoration
    }
}

impl Eq for Token {}

impl Token {
    fn with_kind(kind: TokenKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind,
            allows_decoration: true,
            attributes: OnceCell::new(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::with_kind(TokenKind::PlainText, text)
    }

    /// A placeholder from the text between `{` and `}`.
    ///
    /// A leading `!` is stripped and disables decoration of the replacement.
    pub fn placeholder(raw: &str) -> Self {
        match raw.strip_prefix('!') {
            Some(key) => Self::literal_placeholder(key),
            None => Self::with_kind(TokenKind::Placeholder, raw),
        }
    }

    /// A placeholder whose replacement is always inserted verbatim.
    pub fn literal_placeholder(key: impl Into<String>) -> Self {
        let mut token = Self::with_kind(TokenKind::Placeholder, key);
        token.allows_decoration = false;
        token
    }

    pub fn opening_tag(body: impl Into<String>) -> Self {
        Self::with_kind(TokenKind::OpeningTag, body)
    }

    pub fn closing_tag(name: impl Into<String>) -> Self {
        Self::with_kind(TokenKind::ClosingTag, name)
    }

    /// A legacy code: the marker character followed by the code character.
    pub fn color_code(marker: char, code: char) -> Self {
        let mut content = String::with_capacity(marker.len_utf8() + code.len_utf8());
        content.push(marker);
        content.push(code);
        Self::with_kind(TokenKind::ColorCode, content)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Whether a string replacement of this placeholder may be parsed as markup.
    pub fn allows_decoration(&self) -> bool {
        self.allows_decoration
    }

    pub fn is_plain_text(&self) -> bool {
        self.kind == TokenKind::PlainText
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == TokenKind::Placeholder
    }

    /// True for opening tags and for legacy codes, which open a span too.
    pub fn is_opening_tag(&self) -> bool {
        matches!(self.kind, TokenKind::OpeningTag | TokenKind::ColorCode)
    }

    pub fn is_closing_tag(&self) -> bool {
        self.kind == TokenKind::ClosingTag
    }

    pub fn is_color_code(&self) -> bool {
        self.kind == TokenKind::ColorCode
    }

    /// A legacy code selecting a color (as opposed to a decoration).
    pub fn is_legacy_color(&self) -> bool {
        self.attributes().legacy_color
    }

    /// `§r`, `&r`, `<reset>` and `<r>`.
    pub fn is_reset(&self) -> bool {
        self.attributes().reset
    }

    /// Normalized tag name, for tags and legacy codes.
    ///
    /// Lower-cased and trimmed; for `name:argument` tags only the name. Legacy
    /// codes normalize to `§` plus the lower-cased code, so `&E` and `§e` match.
    pub fn tag_name(&self) -> Option<&str> {
        self.attributes().tag_name.as_deref()
    }

    pub fn style(&self) -> &Style {
        &self.attributes().style
    }

    pub fn color(&self) -> Option<TextColor> {
        self.attributes().style.color
    }

    pub fn is_bold(&self) -> bool {
        self.attributes().style.bold
    }

    pub fn is_italic(&self) -> bool {
        self.attributes().style.italic
    }

    pub fn is_obfuscated(&self) -> bool {
        self.attributes().style.obfuscated
    }

    pub fn is_underlined(&self) -> bool {
        self.attributes().style.underlined
    }

    pub fn is_strikethrough(&self) -> bool {
        self.attributes().style.strikethrough
    }

    /// Click action declared by a `<click:action:value>` tag.
    pub fn click(&self) -> Option<&ClickEvent> {
        self.attributes().click.as_ref()
    }

    /// Tooltip declared by a `<hover:text>` tag.
    pub fn hover_text(&self) -> Option<&str> {
        self.attributes().hover.as_deref()
    }

    /// The source text this token was scanned from.
    pub fn raw(&self) -> String {
        match self.kind {
            TokenKind::PlainText | TokenKind::ColorCode => self.content.clone(),
            TokenKind::Placeholder if self.allows_decoration => format!("{{{}}}", self.content),
            TokenKind::Placeholder => format!("{{!{}}}", self.content),
            TokenKind::OpeningTag => format!("<{}>", self.content),
            TokenKind::ClosingTag => format!("</{}>", self.content),
        }
    }

    fn attributes(&self) -> &Attributes {
        self.attributes.get_or_init(|| derive_attributes(self.kind, &self.content))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

fn derive_attributes(kind: TokenKind, content: &str) -> Attributes {
    let mut attributes = Attributes::default();

    match kind {
        TokenKind::PlainText | TokenKind::Placeholder => {}
        TokenKind::ColorCode => {
            let Some(code) = content.chars().nth(1) else {
                return attributes;
            };
            let code = code.to_ascii_lowercase();
            attributes.tag_name = Some(format!("§{}", code));

            match LegacyCode::from_char(code) {
                Some(LegacyCode::Color(color)) => {
                    attributes.style.color = Some(TextColor::Named(color));
                    attributes.legacy_color = true;
                }
                Some(LegacyCode::Bold) => attributes.style.bold = true,
                Some(LegacyCode::Italic) => attributes.style.italic = true,
                Some(LegacyCode::Obfuscated) => attributes.style.obfuscated = true,
                Some(LegacyCode::Underlined) => attributes.style.underlined = true,
                Some(LegacyCode::Strikethrough) => attributes.style.strikethrough = true,
                Some(LegacyCode::Reset) => attributes.reset = true,
                None => {}
            }
        }
        TokenKind::ClosingTag => {
            let (name, _) = split_tag(content);
            attributes.tag_name = Some(name);
        }
        TokenKind::OpeningTag => {
            let (name, argument) = split_tag(content);
            apply_tag(&name, argument, &mut attributes);
            attributes.tag_name = Some(name);
        }
    }

    attributes
}

/// Split `name:argument` into the normalized name and the raw argument.
fn split_tag(content: &str) -> (String, Option<&str>) {
    let content = content.trim();
    match content.split_once(':') {
        Some((name, argument)) => (name.trim().to_lowercase(), Some(argument)),
        None => (content.to_lowercase(), None),
    }
}

fn apply_tag(name: &str, argument: Option<&str>, attributes: &mut Attributes) {
    let style = &mut attributes.style;

    match name {
        "reset" | "r" => attributes.reset = true,
        "b" | "bold" => style.bold = true,
        "i" | "em" | "italic" => style.italic = true,
        "u" | "underline" | "underlined" => style.underlined = true,
        "s" | "st" | "strikethrough" => style.strikethrough = true,
        "obf" | "obfuscated" => style.obfuscated = true,
        "c" | "color" | "colour" => style.color = argument.and_then(TextColor::parse),
        "click" => {
            attributes.click = argument.and_then(|argument| {
                let (action, value) = argument.split_once(':')?;
                let action = ClickAction::parse(action)?;
                Some(ClickEvent::new(action, value))
            });
        }
        "hover" => attributes.hover = argument.map(str::to_string),
        other => style.color = TextColor::parse(other),
    }
}
