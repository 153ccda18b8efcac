//! Styled text trees.
//!
//! A [`StyledText`] is an arena of nodes addressed by [`NodeId`]. Node 0 is the
//! root. Every node owns an ordered list of child ids; a child is attached to
//! its parent only once it is finished, so a tree is always built bottom-up
//! and can never contain a cycle.

use crate::color::{LegacyCode, NamedColor, TextColor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Index of a node inside its [`StyledText`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);
}

/// Visual style of a span.
///
/// Decorations are either unset or set; a style never forces a decoration
/// off, so merging styles only ever adds to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub color: Option<TextColor>,
    pub bold: bool,
    pub italic: bool,
    pub obfuscated: bool,
    pub underlined: bool,
    pub strikethrough: bool,
}

impl Style {
    /// Style with only a color set.
    pub fn colored(color: impl Into<TextColor>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    /// Whether nothing is set.
    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }

    /// Layer `other` on top of this style.
    pub fn merge(&mut self, other: &Style) {
        if other.color.is_some() {
            self.color = other.color;
        }
        self.bold |= other.bold;
        self.italic |= other.italic;
        self.obfuscated |= other.obfuscated;
        self.underlined |= other.underlined;
        self.strikethrough |= other.strikethrough;
    }

    /// This style layered on top of `parent`.
    pub fn inherit(&self, parent: &Style) -> Style {
        let mut effective = parent.clone();
        effective.merge(self);
        effective
    }
}

/// What happens when a span is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    SuggestCommand,
    RunCommand,
    OpenUrl,
}

impl ClickAction {
    /// Parse a configured click type (`suggest_command`, `run_command`, `open_url`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "suggest_command" => Some(ClickAction::SuggestCommand),
            "run_command" => Some(ClickAction::RunCommand),
            "open_url" => Some(ClickAction::OpenUrl),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClickAction::SuggestCommand => "suggest_command",
            ClickAction::RunCommand => "run_command",
            ClickAction::OpenUrl => "open_url",
        }
    }
}

impl fmt::Display for ClickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub action: ClickAction,
    pub value: String,
}

impl ClickEvent {
    pub fn new(action: ClickAction, value: impl Into<String>) -> Self {
        Self {
            action,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "contents", rename_all = "snake_case")]
pub enum HoverEvent {
    ShowText(StyledText),
}

/// One span of a [`StyledText`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    text: String,
    style: Style,
    click: Option<ClickEvent>,
    hover: Option<HoverEvent>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut Style {
        &mut self.style
    }

    pub fn click(&self) -> Option<&ClickEvent> {
        self.click.as_ref()
    }

    pub fn hover(&self) -> Option<&HoverEvent> {
        self.hover.as_ref()
    }

    pub fn set_click(&mut self, click: Option<ClickEvent>) {
        self.click = click;
    }

    pub fn set_hover(&mut self, hover: Option<HoverEvent>) {
        self.hover = hover;
    }
}

/// A tree of styled spans.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledText {
    nodes: Vec<Node>,
}

impl Default for StyledText {
    fn default() -> Self {
        Self::new()
    }
}

impl StyledText {
    /// An empty tree: a root with no text and no children.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// A tree holding a single unstyled text span.
    pub fn text(text: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.nodes[0].text = text.into();
        tree
    }

    /// A tree holding a single styled text span.
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        let mut tree = Self::text(text);
        tree.nodes[0].style = style;
        tree
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId::ROOT)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Allocate a detached node. It becomes part of the tree once attached.
    pub fn alloc(&mut self, style: Style) -> NodeId {
        self.nodes.push(Node {
            style,
            ..Node::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Append `child` as the last child of `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(parent != child, "a node cannot contain itself");
        self.nodes[parent.0].children.push(child);
    }

    /// Append an unstyled text leaf under `parent`.
    pub fn push_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.alloc(Style::default());
        self.nodes[id.0].text = text.into();
        self.attach(parent, id);
        id
    }

    /// Copy `other` below `parent`, returning the id of the copied root.
    pub fn graft(&mut self, parent: NodeId, other: &StyledText) -> NodeId {
        let id = self.copy_subtree(other, NodeId::ROOT);
        self.attach(parent, id);
        id
    }

    fn copy_subtree(&mut self, other: &StyledText, source: NodeId) -> NodeId {
        let original = &other.nodes[source.0];
        let id = self.alloc(original.style.clone());
        {
            let node = &mut self.nodes[id.0];
            node.text = original.text.clone();
            node.click = original.click.clone();
            node.hover = original.hover.clone();
        }

        for child in &original.children {
            let copied = self.copy_subtree(other, *child);
            self.attach(id, copied);
        }

        id
    }

    /// Visit every node reachable from the root, parents before children.
    pub fn apply_deep<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Node),
    {
        let mut pending = vec![NodeId::ROOT];
        while let Some(id) = pending.pop() {
            f(&mut self.nodes[id.0]);
            pending.extend(self.nodes[id.0].children.iter().rev().copied());
        }
    }

    /// True when no node carries text, a click action or hover content.
    pub fn is_empty(&self) -> bool {
        self.root()
            .walk()
            .all(|node| node.text().is_empty() && node.click().is_none() && node.hover().is_none())
    }

    /// All text of the tree, depth first, without any styling.
    pub fn plain_text(&self) -> String {
        self.root().walk().map(|node| node.text()).collect()
    }

    /// Render the tree as `§`-coded legacy text.
    ///
    /// RGB colors are approximated by the closest named color.
    pub fn to_legacy_string(&self) -> String {
        let mut out = String::new();
        let mut active = Style::default();
        self.write_legacy(NodeId::ROOT, &Style::default(), &mut active, &mut out);
        out
    }

    fn write_legacy(&self, id: NodeId, parent: &Style, active: &mut Style, out: &mut String) {
        let node = &self.nodes[id.0];
        let effective = node.style.inherit(parent);

        if !node.text.is_empty() {
            if effective != *active {
                push_legacy_style(&effective, out);
                *active = effective.clone();
            }
            out.push_str(&node.text);
        }

        for child in &node.children {
            self.write_legacy(*child, &effective, active, out);
        }
    }
}

fn push_legacy_style(style: &Style, out: &mut String) {
    out.push_str("§r");

    if let Some(color) = style.color {
        out.push('§');
        out.push(nearest_named(color).legacy_code());
    }

    let decorations = [
        (style.obfuscated, 'k'),
        (style.bold, 'l'),
        (style.strikethrough, 'm'),
        (style.underlined, 'n'),
        (style.italic, 'o'),
    ];
    for (set, code) in decorations {
        if set {
            out.push('§');
            out.push(code);
        }
    }
}

fn nearest_named(color: TextColor) -> NamedColor {
    let (r, g, b) = color.rgb();
    let distance = |candidate: NamedColor| {
        let (cr, cg, cb) = candidate.rgb();
        let dr = i32::from(r) - i32::from(cr);
        let dg = i32::from(g) - i32::from(cg);
        let db = i32::from(b) - i32::from(cb);
        dr * dr + dg * dg + db * db
    };

    ('0'..='9')
        .chain('a'..='f')
        .filter_map(|code| match LegacyCode::from_char(code) {
            Some(LegacyCode::Color(named)) => Some(named),
            _ => None,
        })
        .min_by_key(|named| distance(*named))
        .unwrap_or(NamedColor::White)
}

/// Read-only view of one node together with its tree.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a StyledText,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn data(&self) -> &'a Node {
        &self.tree.nodes[self.id.0]
    }

    pub fn text(&self) -> &'a str {
        &self.data().text
    }

    pub fn style(&self) -> &'a Style {
        &self.data().style
    }

    pub fn click(&self) -> Option<&'a ClickEvent> {
        self.data().click.as_ref()
    }

    pub fn hover(&self) -> Option<&'a HoverEvent> {
        self.data().hover.as_ref()
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        self.data()
            .children
            .get(index)
            .map(|id| NodeRef { tree, id: *id })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |id| NodeRef { tree, id: *id })
    }

    /// This node and all of its descendants, depth first.
    pub fn walk(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let mut pending = vec![*self];
        std::iter::from_fn(move || {
            let next = pending.pop()?;
            let children: Vec<NodeRef<'a>> = next.children().collect();
            pending.extend(children.into_iter().rev());
            Some(next)
        })
    }
}

// ============================================================================
// Serialization
// ============================================================================

fn is_false(value: &bool) -> bool {
    !*value
}

/// Nested, owned form of a node used for the JSON logical model.
#[derive(Debug, Default, Serialize, Deserialize)]
struct NodeRepr {
    #[serde(default)]
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<TextColor>,
    #[serde(default, skip_serializing_if = "is_false")]
    bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    obfuscated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    underlined: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    strikethrough: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    click_event: Option<ClickEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hover_event: Option<HoverEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    extra: Vec<NodeRepr>,
}

impl NodeRepr {
    fn from_node(node: NodeRef<'_>) -> Self {
        let style = node.style();
        Self {
            text: node.text().to_string(),
            color: style.color,
            bold: style.bold,
            italic: style.italic,
            obfuscated: style.obfuscated,
            underlined: style.underlined,
            strikethrough: style.strikethrough,
            click_event: node.click().cloned(),
            hover_event: node.hover().cloned(),
            extra: node.children().map(NodeRepr::from_node).collect(),
        }
    }

    fn fill(self, tree: &mut StyledText, id: NodeId) {
        {
            let node = tree.node_mut(id);
            node.text = self.text;
            node.style = Style {
                color: self.color,
                bold: self.bold,
                italic: self.italic,
                obfuscated: self.obfuscated,
                underlined: self.underlined,
                strikethrough: self.strikethrough,
            };
            node.click = self.click_event;
            node.hover = self.hover_event;
        }

        for child in self.extra {
            let child_id = tree.alloc(Style::default());
            child.fill(tree, child_id);
            tree.attach(id, child_id);
        }
    }
}

impl Serialize for StyledText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeRepr::from_node(self.root()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StyledText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = NodeRepr::deserialize(deserializer)?;
        let mut tree = StyledText::new();
        repr.fill(&mut tree, NodeId::ROOT);
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StyledText {
        let mut tree = StyledText::new();
        let bold = tree.alloc(Style {
            bold: true,
            ..Style::default()
        });
        tree.push_text(bold, "bold ");
        let red = tree.alloc(Style::colored(NamedColor::Red));
        tree.push_text(red, "red");
        tree.attach(bold, red);
        tree.attach(NodeId::ROOT, bold);
        tree.push_text(NodeId::ROOT, " plain");
        tree
    }

    #[test]
    fn new_tree_is_empty() {
        let tree = StyledText::new();
        assert!(tree.is_empty());
        assert_eq!(tree.root().child_count(), 0);
        assert_eq!(tree.plain_text(), "");
    }

    #[test]
    fn click_or_hover_without_text_is_not_empty() {
        let mut tree = StyledText::new();
        let link = tree.alloc(Style::default());
        tree.attach(NodeId::ROOT, link);
        assert!(tree.is_empty());

        tree.node_mut(link)
            .set_click(Some(ClickEvent::new(ClickAction::RunCommand, "/spawn")));
        assert!(!tree.is_empty());
        assert_eq!(tree.plain_text(), "");
    }

    #[test]
    fn plain_text_walks_depth_first() {
        assert_eq!(sample().plain_text(), "bold red plain");
    }

    #[test]
    fn style_merge_only_adds() {
        let mut style = Style::colored(NamedColor::Gold);
        style.merge(&Style {
            italic: true,
            ..Style::default()
        });
        assert_eq!(style.color, Some(TextColor::Named(NamedColor::Gold)));
        assert!(style.italic);

        style.merge(&Style::default());
        assert!(style.italic);
        assert_eq!(style.color, Some(TextColor::Named(NamedColor::Gold)));
    }

    #[test]
    fn graft_copies_the_whole_subtree() {
        let mut tree = StyledText::new();
        let copied = tree.graft(NodeId::ROOT, &sample());
        assert_eq!(tree.root().child_count(), 1);
        assert_eq!(tree.node(copied).child_count(), 2);
        assert_eq!(tree.plain_text(), "bold red plain");
    }

    #[test]
    fn apply_deep_reaches_every_attached_node() {
        let mut tree = sample();
        let mut visited = 0;
        tree.apply_deep(|node| {
            visited += 1;
            node.set_click(Some(ClickEvent::new(ClickAction::RunCommand, "/spawn")));
        });
        assert_eq!(visited, 6);
        assert!(tree.root().walk().all(|node| node.click().is_some()));
    }

    #[test]
    fn legacy_rendering_tracks_inherited_style() {
        assert_eq!(
            sample().to_legacy_string(),
            "§r§lbold §r§c§lred§r plain"
        );
    }

    #[test]
    fn rgb_is_rendered_as_nearest_named_color() {
        let tree = StyledText::styled("x", Style::colored(TextColor::Rgb(250, 80, 80)));
        assert_eq!(tree.to_legacy_string(), "§r§cx");
    }

    #[test]
    fn json_round_trip_keeps_structure() {
        let mut tree = sample();
        tree.node_mut(NodeId::ROOT)
            .set_hover(Some(HoverEvent::ShowText(StyledText::text("tip"))));

        let json = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(json["extra"][0]["bold"], true);
        assert_eq!(json["extra"][0]["extra"][1]["color"], "red");
        assert_eq!(json["hover_event"]["action"], "show_text");
        assert!(json["extra"][1].get("bold").is_none());

        let back: StyledText = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.plain_text(), tree.plain_text());
        assert_eq!(back.root().child(0).map(|n| n.style().bold), Some(true));
    }
}
