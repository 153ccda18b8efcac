//! Chat formats: a template plus optional format-wide hover and click.

use crate::chain::TokenList;
use crate::engine::MarkupEngine;
use crate::error::{FormatError, FormatResult};
use crate::resolver::PlaceholderResolver;
use crate::text::{ClickAction, ClickEvent, HoverEvent, StyledText};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_kind() -> String {
    "chat".to_string()
}

fn default_true() -> bool {
    true
}

fn default_click_type() -> String {
    "none".to_string()
}

/// A format as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDefinition {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub check_permission: bool,
    #[serde(default)]
    pub permission: Option<String>,
    pub format: String,
    #[serde(default)]
    pub extra: FormatExtra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatExtra {
    #[serde(default)]
    pub hover: Option<String>,
    #[serde(default)]
    pub click: Option<ClickDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickDefinition {
    #[serde(rename = "type", default = "default_click_type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Template source with its parsed tokens cached.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    tokens: OnceCell<TokenList>,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tokens: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed tokens. The first caller's engine decides how they are parsed.
    pub fn tokens(&self, engine: &MarkupEngine) -> &TokenList {
        self.tokens.get_or_init(|| engine.parse(&self.source))
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A click action whose value may reference placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickTemplate {
    pub action: ClickAction,
    pub value: String,
}

/// A validated chat format.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatFormat {
    id: String,
    kind: String,
    priority: i32,
    check_permission: bool,
    permission: Option<String>,
    template: Template,
    hover: Option<Template>,
    click: Option<ClickTemplate>,
}

impl ChatFormat {
    /// A `chat` format with priority 0 and a permission check.
    pub fn new(id: &str, template: impl Into<String>) -> Self {
        Self {
            id: id.to_lowercase(),
            kind: default_kind(),
            priority: 0,
            check_permission: true,
            permission: None,
            template: Template::new(template),
            hover: None,
            click: None,
        }
    }

    /// Validate a configured definition.
    ///
    /// # Arguments
    ///
    /// * `id` - The key the format was configured under
    /// * `definition` - The deserialized definition
    ///
    /// # Returns
    ///
    /// The format, or the first problem found in the definition
    pub fn from_definition(id: &str, definition: &FormatDefinition) -> FormatResult<Self> {
        if definition.format.is_empty() {
            return Err(FormatError::EmptyTemplate(id.to_string()));
        }

        let click = match &definition.extra.click {
            Some(click) => parse_click(id, click)?,
            None => None,
        };

        let hover = definition
            .extra
            .hover
            .as_deref()
            .filter(|hover| !hover.is_empty())
            .map(Template::new);

        Ok(Self {
            id: id.to_lowercase(),
            kind: definition.kind.to_lowercase(),
            priority: definition.priority,
            check_permission: definition.check_permission,
            permission: definition.permission.clone(),
            template: Template::new(definition.format.clone()),
            hover,
            click,
        })
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_lowercase();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_check_permission(mut self, check: bool) -> Self {
        self.check_permission = check;
        self
    }

    pub fn with_hover(mut self, hover: impl Into<String>) -> Self {
        self.hover = Some(Template::new(hover));
        self
    }

    pub fn with_click(mut self, action: ClickAction, value: impl Into<String>) -> Self {
        self.click = Some(ClickTemplate {
            action,
            value: value.into(),
        });
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn check_permission(&self) -> bool {
        self.check_permission
    }

    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn hover(&self) -> Option<&Template> {
        self.hover.as_ref()
    }

    pub fn click(&self) -> Option<&ClickTemplate> {
        self.click.as_ref()
    }

    /// The permission a sender needs for this format.
    pub fn permission_node(&self) -> String {
        match &self.permission {
            Some(permission) => permission.clone(),
            None => format!("fluxchat.format.{}", self.id),
        }
    }

    /// Render the format.
    ///
    /// The tree may be empty when every placeholder in the template vanished.
    /// Format-wide hover and click apply to every node that does not set its own.
    pub fn render(&self, engine: &MarkupEngine, resolver: &dyn PlaceholderResolver) -> StyledText {
        let mut main = engine.convert(self.template.tokens(engine), resolver);
        if main.is_empty() {
            debug!("Format '{}' rendered empty", self.id);
        }

        if self.hover.is_none() && self.click.is_none() {
            return main;
        }

        let hover = self
            .hover
            .as_ref()
            .map(|hover| engine.convert(hover.tokens(engine), resolver))
            .filter(|hover| !hover.is_empty())
            .map(HoverEvent::ShowText);

        let click = self.click.as_ref().map(|click| {
            let value = replace_plain_placeholders(&click.value, |key| resolver.resolve_plain(key));
            ClickEvent::new(click.action, value)
        });

        main.apply_deep(|node| {
            if node.hover().is_none() && hover.is_some() {
                node.set_hover(hover.clone());
            }
            if node.click().is_none() && click.is_some() {
                node.set_click(click.clone());
            }
        });

        main
    }
}

fn parse_click(id: &str, click: &ClickDefinition) -> FormatResult<Option<ClickTemplate>> {
    let Some(value) = &click.value else {
        return Ok(None);
    };

    let kind = click.kind.trim().to_lowercase();
    if kind == "none" {
        return Ok(None);
    }

    match ClickAction::parse(&kind) {
        Some(action) => Ok(Some(ClickTemplate {
            action,
            value: value.clone(),
        })),
        None => Err(FormatError::InvalidClickType {
            format: id.to_string(),
            click_type: click.kind.clone(),
        }),
    }
}

/// Substitute `{key}` references without parsing any markup.
///
/// A key must not contain braces. References whose lookup returns `None` are
/// kept as written. A leading `!` on the key is ignored.
pub fn replace_plain_placeholders<F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find(|c: char| c == '{' || c == '}') {
            Some(end) if after[end..].starts_with('}') && end > 0 => {
                let key = &after[..end];
                match lookup(key.strip_prefix('!').unwrap_or(key)) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            Some(end) => {
                out.push('{');
                out.push_str(&after[..end]);
                rest = &after[end..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
