//! Structured (rich) text rendering
//!
//! Rich-text fields arrive as an array of blocks, each carrying its plain
//! text and a list of spans addressed by character offsets. Only the HTML
//! and plain-text serializations live here; decoding is plain serde.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A rich-text field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "paragraph")]
    Paragraph(TextBlock),
    #[serde(rename = "heading1")]
    Heading1(TextBlock),
    #[serde(rename = "heading2")]
    Heading2(TextBlock),
    #[serde(rename = "heading3")]
    Heading3(TextBlock),
    #[serde(rename = "heading4")]
    Heading4(TextBlock),
    #[serde(rename = "heading5")]
    Heading5(TextBlock),
    #[serde(rename = "heading6")]
    Heading6(TextBlock),
    #[serde(rename = "preformatted")]
    Preformatted(TextBlock),
    #[serde(rename = "list-item")]
    ListItem(TextBlock),
    #[serde(rename = "o-list-item")]
    OListItem(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(rename = "embed")]
    Embed(EmbedBlock),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// Inline formatting over `text[start..end]`, in characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    #[serde(default)]
    pub oembed: Oembed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Oembed {
    #[serde(default)]
    pub embed_url: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl Block {
    fn text(&self) -> Option<&TextBlock> {
        match self {
            Block::Paragraph(t)
            | Block::Heading1(t)
            | Block::Heading2(t)
            | Block::Heading3(t)
            | Block::Heading4(t)
            | Block::Heading5(t)
            | Block::Heading6(t)
            | Block::Preformatted(t)
            | Block::ListItem(t)
            | Block::OListItem(t) => Some(t),
            Block::Image(_) | Block::Embed(_) | Block::Unknown => None,
        }
    }
}

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain text of every text block, joined by a space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter_map(|b| b.text().map(|t| t.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialize to HTML
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in &self.0 {
            let list = match block {
                Block::ListItem(_) => Some("ul"),
                Block::OListItem(_) => Some("ol"),
                _ => None,
            };
            if open_list != list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }
            html.push_str(&render_block(block));
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph(t) => wrap("p", t),
        Block::Heading1(t) => wrap("h1", t),
        Block::Heading2(t) => wrap("h2", t),
        Block::Heading3(t) => wrap("h3", t),
        Block::Heading4(t) => wrap("h4", t),
        Block::Heading5(t) => wrap("h5", t),
        Block::Heading6(t) => wrap("h6", t),
        Block::Preformatted(t) => wrap("pre", t),
        Block::ListItem(t) | Block::OListItem(t) => wrap("li", t),
        Block::Image(img) => format!(
            r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
            html_escape(&img.url),
            html_escape(img.alt.as_deref().unwrap_or(""))
        ),
        Block::Embed(embed) => {
            let oembed = &embed.oembed;
            let provider = oembed
                .provider_name
                .as_deref()
                .map(|p| format!(r#" data-oembed-provider="{}""#, html_escape(&p.to_lowercase())))
                .unwrap_or_default();
            format!(
                r#"<div data-oembed="{}" data-oembed-type="{}"{}>{}</div>"#,
                html_escape(&oembed.embed_url),
                html_escape(&oembed.kind),
                provider,
                oembed.html.as_deref().unwrap_or("")
            )
        }
        Block::Unknown => String::new(),
    }
}

fn wrap(tag: &str, block: &TextBlock) -> String {
    format!("<{tag}>{}</{tag}>", render_spans(block))
}

/// A span and the spans nested inside it
#[derive(Debug)]
struct Node<'a> {
    start: usize,
    end: usize,
    span: &'a Span,
    children: Vec<Node<'a>>,
}

impl<'a> Node<'a> {
    fn contains(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Insert `span[start..end]` into a sibling list. A span that overlaps the
/// last sibling without fitting inside it is split at the sibling's end.
fn insert<'a>(nodes: &mut Vec<Node<'a>>, span: &'a Span, start: usize, end: usize) {
    if start >= end {
        return;
    }
    if let Some(last) = nodes.last_mut() {
        if last.contains(start, end) {
            insert(&mut last.children, span, start, end);
            return;
        }
        if start < last.end {
            let split = last.end;
            insert(&mut last.children, span, start, split);
            insert(nodes, span, split, end);
            return;
        }
    }
    nodes.push(Node {
        start,
        end,
        span,
        children: Vec::new(),
    });
}

fn render_spans(block: &TextBlock) -> String {
    let chars: Vec<char> = block.text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<&Span> = block.spans.iter().collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut roots = Vec::new();
    for span in spans {
        insert(&mut roots, span, span.start.min(len), span.end.min(len));
    }

    let mut out = String::new();
    render_range(&chars, 0, len, &roots, &mut out);
    out
}

fn render_range(chars: &[char], start: usize, end: usize, nodes: &[Node], out: &mut String) {
    let mut pos = start;
    for node in nodes {
        push_text(chars, pos, node.start, out);
        let (open, close) = span_tags(node.span);
        out.push_str(&open);
        render_range(chars, node.start, node.end, &node.children, out);
        out.push_str(&close);
        pos = node.end;
    }
    push_text(chars, pos, end, out);
}

fn push_text(chars: &[char], start: usize, end: usize, out: &mut String) {
    if start >= end {
        return;
    }
    let text: String = chars[start..end].iter().collect();
    out.push_str(&html_escape(&text).replace('\n', "<br />"));
}

fn span_tags(span: &Span) -> (String, String) {
    let data = span.data.as_ref();
    match span.kind.as_str() {
        "strong" => ("<strong>".to_string(), "</strong>".to_string()),
        "em" => ("<em>".to_string(), "</em>".to_string()),
        "hyperlink" => {
            let url = data
                .and_then(|d| d.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or("");
            let target = data
                .and_then(|d| d.get("target"))
                .and_then(|t| t.as_str())
                .map(|t| format!(r#" target="{}" rel="noopener noreferrer""#, html_escape(t)))
                .unwrap_or_default();
            (
                format!(r#"<a href="{}"{}>"#, html_escape(url), target),
                "</a>".to_string(),
            )
        }
        "label" => {
            let label = data
                .and_then(|d| d.get("label"))
                .and_then(|l| l.as_str())
                .unwrap_or("");
            (
                format!(r#"<span class="{}">"#, html_escape(label)),
                "</span>".to_string(),
            )
        }
        _ => (String::new(), String::new()),
    }
}
