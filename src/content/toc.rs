//! Heading ids and table of contents

use crate::helpers::escape_html;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

lazy_static! {
    static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9_\s\x{4e00}-\x{9fff}-]").unwrap();
    static ref SEPARATORS: Regex = Regex::new(r"[\s-]+").unwrap();
}

/// One h2/h3 heading in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// TOC entry with its h3 children attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocNode {
    pub level: u8,
    pub text: String,
    pub id: String,
    pub children: Vec<TocNode>,
}

/// Derive an anchor id from heading text
///
/// # Examples
/// ```ignore
/// heading_id("Hello, World!") // -> "hello-world"
/// heading_id("安装 Rust") // -> "安装-rust"
/// ```
pub fn heading_id(text: &str) -> String {
    let lower = text.to_lowercase();
    let kept = DISALLOWED.replace_all(&lower, "");
    let collapsed = SEPARATORS.replace_all(kept.trim(), "-");
    collapsed.trim_matches('-').to_string()
}

/// Assigns unique ids to headings as the renderer emits them
#[derive(Debug, Default)]
pub struct TocBuilder {
    ordinal: usize,
    used: HashSet<String>,
    entries: Vec<TocEntry>,
}

impl TocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heading and return the id it must carry
    ///
    /// Empty or already-used ids fall back to `heading-<ordinal>`, where the
    /// ordinal is the heading's 1-based position among all h2/h3 headings.
    pub fn push(&mut self, level: u8, text: &str) -> String {
        self.ordinal += 1;
        let text = text.trim();

        let mut id = heading_id(text);
        if id.is_empty() || self.used.contains(&id) {
            id = format!("heading-{}", self.ordinal);
            let base = id.clone();
            let mut n = 1;
            while self.used.contains(&id) {
                id = format!("{}-{}", base, n);
                n += 1;
            }
        }

        self.used.insert(id.clone());
        self.entries.push(TocEntry {
            level,
            text: text.to_string(),
            id: id.clone(),
        });
        id
    }

    /// Flat entry list, or `None` when no heading was recorded
    pub fn finish(self) -> Option<Vec<TocEntry>> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries)
        }
    }
}

/// Nest each h3 under the closest preceding h2
///
/// An h3 before any h2 stays at the top level.
pub fn nest(entries: &[TocEntry]) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    for entry in entries {
        let node = TocNode {
            level: entry.level,
            text: entry.text.clone(),
            id: entry.id.clone(),
            children: Vec::new(),
        };
        match roots.last_mut() {
            Some(parent) if entry.level > 2 && parent.level == 2 => parent.children.push(node),
            _ => roots.push(node),
        }
    }
    roots
}

/// Render a nested TOC as an ordered list of anchor links
pub fn render_toc_html(nodes: &[TocNode]) -> String {
    if nodes.is_empty() {
        return String::new();
    }
    let mut html = String::from(r#"<ol class="toc">"#);
    render_items(nodes, &mut html);
    html.push_str("</ol>");
    html
}

fn render_items(nodes: &[TocNode], html: &mut String) {
    for node in nodes {
        html.push_str(&format!(
            r##"<li class="toc-item toc-level-{}"><a class="toc-link" href="#{}">{}</a>"##,
            node.level,
            escape_html(&node.id),
            escape_html(&node.text)
        ));
        if !node.children.is_empty() {
            html.push_str(r#"<ol class="toc-child">"#);
            render_items(&node.children, html);
            html.push_str("</ol>");
        }
        html.push_str("</li>");
    }
}
