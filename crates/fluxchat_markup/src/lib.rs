//! # FluxChat Markup
//!
//! Turns operator-written chat templates into styled text trees.
//!
//! A template mixes literal text with three kinds of markup:
//!
//! * **Tags** - `<gold>`, `<b>`, `<#ff8800>`, `<click:run_command:/spawn>`,
//!   `<hover:Some tooltip>`, closed with `</name>`
//! * **Legacy codes** - `§e` / `&e` colors, `&l` style codes, `&r` reset
//! * **Placeholders** - `{username}`, or `{!username}` to insert the value
//!   without interpreting markup inside it
//!
//! ## Pipeline
//!
//! 1. [`Tokenizer`] splits the template into [`Token`]s. Malformed markup
//!    becomes plain text; tokenizing never fails.
//! 2. [`TagChain`] rewrites the stream so every span is properly nested:
//!    unmatched closing tags are dropped, and closing an outer tag closes
//!    everything opened inside it first. [`TokenList`] stores the result.
//! 3. [`Converter`] builds a [`StyledText`] tree, asking a
//!    [`PlaceholderResolver`] for each placeholder.
//!
//! [`MarkupEngine`] wraps the three steps behind one set of [`MarkupOptions`],
//! and [`ChatFormat`] adds format-wide hover and click actions on top.
//!
//! ```
//! use fluxchat_markup::{MarkupEngine, Replacement, ResolveResult, Token};
//!
//! let engine = MarkupEngine::default();
//! let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
//!     Ok((token.content() == "username").then(|| "Steve".into()))
//! };
//!
//! let tree = engine.render("<gold>{username}</gold> joined", &resolver);
//! assert_eq!(tree.plain_text(), "Steve joined");
//! ```

pub mod chain;
pub mod color;
pub mod converter;
pub mod engine;
pub mod error;
pub mod format;
pub mod resolver;
pub mod text;
pub mod token;
pub mod tokenizer;

pub use chain::{TagChain, TokenList};
pub use color::{LegacyCode, NamedColor, TextColor};
pub use converter::Converter;
pub use engine::{MarkupEngine, MarkupOptions};
pub use error::{FormatError, FormatResult, ResolveError, ResolveResult};
pub use format::{
    replace_plain_placeholders, ChatFormat, ClickDefinition, ClickTemplate, FormatDefinition,
    FormatExtra, Template,
};
pub use resolver::{guarded_resolve, NoopResolver, PlaceholderResolver, Replacement, ResolverChain};
pub use text::{ClickAction, ClickEvent, HoverEvent, Node, NodeId, NodeRef, Style, StyledText};
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
