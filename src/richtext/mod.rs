//! Prismic structured text
//!
//! Blocks are carried through normalization untouched and only turned into
//! markup here, at render time. Text is escaped; embed HTML is trusted since
//! it comes from the authoring side.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::helpers::html_escape;

/// One block of structured text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RichTextNode {
    /// Block type: `paragraph`, `heading2`, `list-item`, `image`, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub spans: Vec<Span>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Value>,

    /// Fields this renderer does not use, kept for round trips
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RichTextNode {
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new("paragraph", text)
    }

    pub fn with_span(mut self, start: usize, end: usize, kind: &str) -> Self {
        self.spans.push(Span {
            start,
            end,
            kind: kind.to_string(),
            data: None,
        });
        self
    }
}

/// Inline formatting over a range of a block's text, in UTF-16 code units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Plain text of all blocks, separated by spaces
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render blocks to HTML
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut html = String::new();
    let mut list: Option<&'static str> = None;

    for node in nodes {
        let wanted = match node.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };
        if list != wanted {
            if let Some(tag) = list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = wanted {
                html.push_str(&format!("<{}>", tag));
            }
            list = wanted;
        }
        html.push_str(&render_block(node));
    }

    if let Some(tag) = list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_block(node: &RichTextNode) -> String {
    let inner = || render_spans(&node.text, &node.spans);
    match node.kind.as_str() {
        "paragraph" => format!("<p>{}</p>", inner()),
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        kind @ ("heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6") => {
            let level = &kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, inner(), level)
        }
        "image" => format!(
            r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
            html_escape(node.url.as_deref().unwrap_or("")),
            html_escape(node.alt.as_deref().unwrap_or(""))
        ),
        "embed" => render_embed(node),
        _ => format!("<p>{}</p>", html_escape(&node.text)),
    }
}

fn render_embed(node: &RichTextNode) -> String {
    let field = |name: &str| {
        node.oembed
            .as_ref()
            .and_then(|o| o.get(name))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        html_escape(&field("embed_url")),
        html_escape(&field("type")),
        html_escape(&field("provider_name")),
        field("html")
    )
}

/// Apply spans to text; span offsets count UTF-16 code units
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();

    // UTF-16 offset where each char starts, then the total length
    let mut units = Vec::with_capacity(chars.len() + 1);
    let mut total = 0;
    for c in &chars {
        units.push(total);
        total += c.len_utf16();
    }
    units.push(total);
    let char_index = |unit: usize| units.partition_point(|&u| u < unit);

    let mut sorted: Vec<(usize, usize, &Span)> = spans
        .iter()
        .filter(|s| s.start < s.end && s.end <= total)
        .map(|s| (char_index(s.start), char_index(s.end), s))
        .filter(|(start, end, _)| start < end)
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<(usize, &Span)> = Vec::new();
    let mut next = 0;

    for i in 0..=chars.len() {
        // Close the innermost span ending here, reopening anything it crossed
        while let Some(pos) = open.iter().rposition(|(end, _)| *end == i) {
            let closed: Vec<(usize, &Span)> = open.drain(pos..).collect();
            for (_, span) in closed.iter().rev() {
                out.push_str(close_tag(span));
            }
            for (end, span) in closed.into_iter().skip(1) {
                out.push_str(&open_tag(span));
                open.push((end, span));
            }
        }

        while next < sorted.len() && sorted[next].0 == i {
            let (_, end, span) = sorted[next];
            out.push_str(&open_tag(span));
            open.push((end, span));
            next += 1;
        }

        if let Some(&c) = chars.get(i) {
            match c {
                '\n' => out.push_str("<br />"),
                _ => out.push_str(&html_escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
    }

    out
}

fn open_tag(span: &Span) -> String {
    let data = |name: &str| {
        span.data
            .as_ref()
            .and_then(|d| d.get(name))
            .and_then(Value::as_str)
            .map(html_escape)
    };
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let href = data("url").unwrap_or_default();
            match data("target") {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener noreferrer">"#,
                    href, target
                ),
                None => format!(r#"<a href="{}">"#, href),
            }
        }
        "label" => format!(r#"<span class="{}">"#, data("label").unwrap_or_default()),
        _ => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "</span>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_is_escaped() {
        let html = as_html(&[RichTextNode::paragraph("a < b & c")]);
        assert_eq!(html, "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_nested_spans() {
        let node = RichTextNode::paragraph("bold and italic")
            .with_span(0, 15, "strong")
            .with_span(9, 15, "em");
        assert_eq!(
            as_html(&[node]),
            "<p><strong>bold and <em>italic</em></strong></p>"
        );
    }

    #[test]
    fn test_crossing_spans_stay_well_formed() {
        let node = RichTextNode::paragraph("abcd")
            .with_span(0, 3, "strong")
            .with_span(1, 4, "em");
        assert_eq!(
            as_html(&[node]),
            "<p><strong>a<em>bc</em></strong><em>d</em></p>"
        );
    }

    #[test]
    fn test_span_offsets_count_utf16_units() {
        // The rocket is two UTF-16 units, so "go" starts at unit 3
        let node = RichTextNode::paragraph("🚀 go fast").with_span(3, 5, "strong");
        assert_eq!(as_html(&[node]), "<p>🚀 <strong>go</strong> fast</p>");
    }

    #[test]
    fn test_hyperlink() {
        let mut node = RichTextNode::paragraph("veja a documentação");
        node.spans.push(Span {
            start: 7,
            end: 19,
            kind: "hyperlink".to_string(),
            data: Some(serde_json::json!({
                "link_type": "Web",
                "url": "https://reactjs.org/docs",
                "target": "_blank"
            })),
        });
        assert_eq!(
            as_html(&[node]),
            r#"<p>veja a <a href="https://reactjs.org/docs" target="_blank" rel="noopener noreferrer">documentação</a></p>"#
        );
    }

    #[test]
    fn test_lists_are_grouped() {
        let html = as_html(&[
            RichTextNode::new("list-item", "one"),
            RichTextNode::new("list-item", "two"),
            RichTextNode::new("o-list-item", "first"),
            RichTextNode::paragraph("after"),
        ]);
        assert_eq!(
            html,
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
        );
    }

    #[test]
    fn test_headings_and_line_breaks() {
        let html = as_html(&[
            RichTextNode::new("heading2", "Title"),
            RichTextNode::new("preformatted", "line1\nline2"),
        ]);
        assert_eq!(html, "<h2>Title</h2><pre>line1<br />line2</pre>");
    }

    #[test]
    fn test_image_and_unknown_blocks() {
        let mut image = RichTextNode::new("image", "");
        image.url = Some("https://images.prismic.io/a.png".to_string());
        image.alt = Some("a \"quoted\" alt".to_string());
        let html = as_html(&[image, RichTextNode::new("table", "raw <text>")]);
        assert_eq!(
            html,
            r#"<p class="block-img"><img src="https://images.prismic.io/a.png" alt="a &quot;quoted&quot; alt" /></p><p>raw &lt;text&gt;</p>"#
        );
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = serde_json::json!({
            "type": "paragraph",
            "text": "x",
            "spans": [],
            "direction": "ltr"
        });
        let node: RichTextNode = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(node.extra.get("direction"), Some(&serde_json::json!("ltr")));
        assert_eq!(serde_json::to_value(&node).unwrap(), json);
    }

    #[test]
    fn test_as_text() {
        let nodes = [
            RichTextNode::paragraph("Lorem ipsum"),
            RichTextNode::paragraph("dolor"),
        ];
        assert_eq!(as_text(&nodes), "Lorem ipsum dolor");
    }
}
