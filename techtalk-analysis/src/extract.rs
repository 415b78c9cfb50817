//! Plain-text extraction from fetched HTML.

use scraper::{Html, Node};

/// Default cap on extracted text, in characters.
pub const MAX_CHARS: usize = 8000;

/// Extract readable text from an HTML document, capped at [`MAX_CHARS`].
pub fn extract(html: &str) -> String {
    extract_with_limit(html, MAX_CHARS)
}

/// Extract readable text and keep at most `max_chars` characters.
///
/// Text inside `script` and `style` never contributes. Line structure is
/// flattened: every line and every double-space separated phrase becomes one
/// chunk, and chunks are joined with a single space.
pub fn extract_with_limit(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let mut raw = String::with_capacity(html.len() / 2);
    push_text(&document, &mut raw);

    truncate_chars(normalize_whitespace(&raw), max_chars)
}

fn push_text(document: &Html, out: &mut String) {
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .any(|ancestor| element_named(ancestor.value(), &["script", "style"]));
        if hidden {
            continue;
        }
        let in_noscript = node
            .parent()
            .is_some_and(|parent| element_named(parent.value(), &["noscript"]));
        if in_noscript {
            // parsed with scripting on, so noscript content is still raw markup
            push_text(&Html::parse_fragment(text), out);
        } else {
            out.push_str(text);
        }
    }
}

fn element_named(node: &Node, names: &[&str]) -> bool {
    matches!(node, Node::Element(el) if names.contains(&el.name()))
}

/// Collapse the text into space-separated chunks.
pub fn normalize_whitespace(text: &str) -> String {
    text.split(is_line_break)
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}
