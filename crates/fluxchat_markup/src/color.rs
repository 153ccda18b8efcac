//! Legacy color codes, named colors and hex colors.
//!
//! The table is constant data: every lookup is a pure function, so nothing in
//! here needs to be initialized or shared between threads.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One of the sixteen fixed colors selectable with a legacy code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

/// Legacy code, canonical name and RGB value for every named color.
static NAMED_COLORS: [(char, NamedColor, &str, u32); 16] = [
    ('0', NamedColor::Black, "black", 0x000000),
    ('1', NamedColor::DarkBlue, "dark_blue", 0x0000aa),
    ('2', NamedColor::DarkGreen, "dark_green", 0x00aa00),
    ('3', NamedColor::DarkAqua, "dark_aqua", 0x00aaaa),
    ('4', NamedColor::DarkRed, "dark_red", 0xaa0000),
    ('5', NamedColor::DarkPurple, "dark_purple", 0xaa00aa),
    ('6', NamedColor::Gold, "gold", 0xffaa00),
    ('7', NamedColor::Gray, "gray", 0xaaaaaa),
    ('8', NamedColor::DarkGray, "dark_gray", 0x555555),
    ('9', NamedColor::Blue, "blue", 0x5555ff),
    ('a', NamedColor::Green, "green", 0x55ff55),
    ('b', NamedColor::Aqua, "aqua", 0x55ffff),
    ('c', NamedColor::Red, "red", 0xff5555),
    ('d', NamedColor::LightPurple, "light_purple", 0xff55ff),
    ('e', NamedColor::Yellow, "yellow", 0xffff55),
    ('f', NamedColor::White, "white", 0xffffff),
];

impl NamedColor {
    /// Look up a color by its legacy code character (`0-9`, `a-f`).
    pub fn from_legacy_code(code: char) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(c, ..)| *c == code)
            .map(|(_, color, ..)| *color)
    }

    /// Look up a color by name.
    ///
    /// Matching ignores case and every non-alphanumeric character, so
    /// `dark_red`, `DarkRed` and `dark-red` all resolve to [`NamedColor::DarkRed`].
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = squash(name);
        if wanted.is_empty() {
            return None;
        }

        NAMED_COLORS
            .iter()
            .find(|(_, _, canonical, _)| squash(canonical) == wanted)
            .map(|(_, color, ..)| *color)
    }

    /// The canonical snake_case name.
    pub fn name(self) -> &'static str {
        self.entry().2
    }

    /// The legacy code character selecting this color.
    pub fn legacy_code(self) -> char {
        self.entry().0
    }

    /// The RGB value the client renders for this color.
    pub fn rgb(self) -> (u8, u8, u8) {
        split_rgb(self.entry().3)
    }

    fn entry(self) -> &'static (char, NamedColor, &'static str, u32) {
        // Every variant has a row in the table.
        &NAMED_COLORS[self as usize]
    }
}

/// A text color: either one of the named legacy colors or an arbitrary RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextColor {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

impl TextColor {
    /// Parse a color as written inside a tag: a color name or `#RRGGBB`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex).map(|rgb| {
                let (r, g, b) = split_rgb(rgb);
                TextColor::Rgb(r, g, b)
            });
        }

        NamedColor::from_name(value).map(TextColor::Named)
    }

    /// The RGB value of this color.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            TextColor::Named(named) => named.rgb(),
            TextColor::Rgb(r, g, b) => (r, g, b),
        }
    }
}

impl From<NamedColor> for TextColor {
    fn from(color: NamedColor) -> Self {
        TextColor::Named(color)
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextColor::Named(named) => f.write_str(named.name()),
            TextColor::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
        }
    }
}

impl Serialize for TextColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TextColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TextColor::parse(&raw).ok_or_else(|| de::Error::custom(format!("unknown color '{}'", raw)))
    }
}

/// What a single legacy code character selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCode {
    Color(NamedColor),
    Bold,
    Italic,
    Obfuscated,
    Underlined,
    Strikethrough,
    Reset,
}

impl LegacyCode {
    /// Decode the character following a `§`/`&` marker.
    pub fn from_char(code: char) -> Option<Self> {
        let code = code.to_ascii_lowercase();

        if let Some(color) = NamedColor::from_legacy_code(code) {
            return Some(LegacyCode::Color(color));
        }

        match code {
            'l' => Some(LegacyCode::Bold),
            'o' => Some(LegacyCode::Italic),
            'k' => Some(LegacyCode::Obfuscated),
            'n' => Some(LegacyCode::Underlined),
            'm' => Some(LegacyCode::Strikethrough),
            'r' => Some(LegacyCode::Reset),
            _ => None,
        }
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn parse_hex(hex: &str) -> Option<u32> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    u32::from_str_radix(hex, 16).ok()
}

fn split_rgb(rgb: u32) -> (u8, u8, u8) {
    (
        ((rgb >> 16) & 0xff) as u8,
        ((rgb >> 8) & 0xff) as u8,
        (rgb & 0xff) as u8,
    )
}
