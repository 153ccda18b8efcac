//! End-to-end tests of tokenizing, normalizing and converting templates.

use fluxchat_markup::{
    MarkupEngine, NamedColor, NodeRef, NoopResolver, Replacement, ResolveResult, Style, TextColor,
    Token, TokenKind, Tokenizer,
};

fn engine() -> MarkupEngine {
    MarkupEngine::default()
}

fn effective_style(node: &NodeRef<'_>, parent: &Style) -> Style {
    node.style().inherit(parent)
}

/// Every closing tag must close the innermost open tag.
fn assert_well_nested(tokens: &[Token]) {
    let mut open: Vec<String> = Vec::new();
    let mut opened = 0;
    let mut closed = 0;

    for token in tokens {
        match token.kind() {
            TokenKind::OpeningTag => {
                opened += 1;
                open.push(token.tag_name().unwrap().to_string());
            }
            TokenKind::ClosingTag => {
                closed += 1;
                assert_eq!(open.pop().as_deref(), token.tag_name(), "in {:?}", tokens);
            }
            _ => {}
        }
    }

    assert_eq!(opened, closed);
}

#[test]
fn text_without_markup_is_a_single_token() {
    for input in ["hello world", "a + b = c", "100% sure; 5 > 3", "emoji 🎉 ok"] {
        let tokens = Tokenizer::default().tokenize(input);
        assert_eq!(tokens, vec![Token::plain(input)]);
    }
}

#[test]
fn normalized_streams_are_well_nested() {
    let inputs = [
        "<b>bold <i>and italic</i> still bold</b>",
        "<b>bold <i>nested</b> after",
        "<a><b><c>x</a>",
        "</i>stray<u>u</u></b>",
        "<gold><b>x</gold></b>",
    ];

    for input in inputs {
        assert_well_nested(engine().parse(input).as_slice());
    }
}

#[test]
fn nested_spans() {
    let tree = engine().render("<b>bold <i>and italic</i> still bold</b>", &NoopResolver);
    let root = tree.root();
    assert_eq!(root.child_count(), 1);

    let bold = root.child(0).unwrap();
    assert!(bold.style().bold);
    let children: Vec<_> = bold.children().collect();
    assert_eq!(children.len(), 3);
    assert_eq!(children[0].text(), "bold ");

    let italic = &children[1];
    let italic_style = effective_style(italic, bold.style());
    assert!(italic_style.bold && italic_style.italic);
    assert_eq!(italic.child(0).unwrap().text(), "and italic");

    assert_eq!(children[2].text(), " still bold");
    assert!(children[2].style().is_plain());
}

#[test]
fn missing_inner_close_is_synthesized() {
    let engine = engine();
    let list = engine.parse("<b>bold <i>nested</b> after");
    assert_eq!(list.raw(), "<b>bold <i>nested</i></b> after");

    let tree = engine.convert(&list, &NoopResolver);
    let root = tree.root();
    assert_eq!(root.child_count(), 2);

    let after = root.child(1).unwrap();
    assert_eq!(after.text(), " after");
    assert!(after.style().is_plain());
    assert_eq!(after.child_count(), 0);
}

#[test]
fn unresolved_placeholder_renders_nothing() {
    let tree = engine().render("{unknown_key}", &NoopResolver);
    assert_eq!(tree.root().child_count(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.plain_text(), "");
}

#[test]
fn bang_placeholder_is_inserted_literally() {
    let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
        Ok((token.content() == "name").then(|| "<b>X</b>".into()))
    };

    let tree = engine().render("{!name}", &resolver);
    let root = tree.root();
    assert_eq!(root.child_count(), 1);

    let leaf = root.child(0).unwrap();
    assert_eq!(leaf.text(), "<b>X</b>");
    assert!(leaf.style().is_plain());
    assert_eq!(leaf.child_count(), 0);

    let decorated = engine().render("{name}", &resolver);
    assert_eq!(decorated.plain_text(), "X");
    assert!(decorated.root().walk().any(|node| node.style().bold));
}

#[test]
fn legacy_colors_become_siblings() {
    let tokens = Tokenizer::default().tokenize("&eYellow &cRed");
    assert_eq!(
        tokens.iter().map(Token::kind).collect::<Vec<_>>(),
        vec![
            TokenKind::ColorCode,
            TokenKind::PlainText,
            TokenKind::ColorCode,
            TokenKind::PlainText,
        ]
    );
    assert_eq!(tokens[0].content(), "&e");
    assert_eq!(tokens[1].content(), "Yellow ");
    assert_eq!(tokens[2].content(), "&c");
    assert_eq!(tokens[3].content(), "Red");

    let tree = engine().render("&eYellow &cRed", &NoopResolver);
    let spans: Vec<_> = tree.root().children().collect();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].style().color, Some(TextColor::Named(NamedColor::Yellow)));
    assert_eq!(spans[0].child(0).unwrap().text(), "Yellow ");
    assert_eq!(spans[1].style().color, Some(TextColor::Named(NamedColor::Red)));
    assert_eq!(spans[1].child(0).unwrap().text(), "Red");
}

fn leaves(node: &NodeRef<'_>, parent: &Style, out: &mut Vec<(String, Style)>) {
    let style = effective_style(node, parent);
    if !node.text().is_empty() {
        out.push((node.text().to_string(), style.clone()));
    }
    for child in node.children() {
        leaves(&child, &style, out);
    }
}

#[test]
fn legacy_color_inside_a_tag_keeps_the_tag() {
    let input = "&e<b>bold &cred</b> after";
    let tokens = engine().parse(input);
    assert_well_nested(tokens.as_slice());

    let tree = engine().render(input, &NoopResolver);
    let mut out = Vec::new();
    leaves(&tree.root(), &Style::default(), &mut out);

    let summary: Vec<_> = out
        .iter()
        .map(|(text, style)| (text.as_str(), style.bold, style.color))
        .collect();
    let yellow = Some(TextColor::Named(NamedColor::Yellow));
    let red = Some(TextColor::Named(NamedColor::Red));
    assert_eq!(
        summary,
        vec![("bold ", true, yellow), ("red", true, red), (" after", false, red)]
    );
}

#[test]
fn flattened_output_renders_unchanged() {
    let engine = engine();
    let inputs = [
        "<gold>Hello</gold> <b>world</b>",
        "&aGreen &lbold &rplain",
        "<click:open_url:https://example.com>link</click> text",
    ];

    for input in inputs {
        let flattened = engine.render(input, &NoopResolver).plain_text();
        let again = engine.render(&flattened, &NoopResolver);
        assert_eq!(again.plain_text(), flattened);
        assert!(again.root().walk().all(|node| node.style().is_plain()));
        assert!(again.root().walk().all(|node| node.click().is_none()));
    }
}

#[test]
fn legacy_string_round_trip_keeps_text() {
    let engine = engine();
    let tree = engine.render("<red>Alert:</red> <b>read this</b>", &NoopResolver);
    let legacy = tree.to_legacy_string();

    let reparsed = engine.render(&legacy, &NoopResolver);
    assert_eq!(reparsed.plain_text(), tree.plain_text());
}

#[test]
fn one_failing_placeholder_does_not_spoil_the_rest() {
    let resolver = |token: &Token| -> ResolveResult<Option<Replacement>> {
        match token.content() {
            "broken" => panic!("backing store exploded"),
            "name" => Ok(Some("Alex".into())),
            _ => Ok(None),
        }
    };

    let tree = engine().render("[{broken}] {name}", &resolver);
    assert_eq!(tree.plain_text(), "[] Alex");
}
