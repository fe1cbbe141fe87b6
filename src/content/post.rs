//! Post model and the derivations that populate it

use super::toc::TocEntry;
use crate::helpers::escape_html;
use chrono::{DateTime, Datelike, Local};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

const WORDS_PER_MINUTE: usize = 200;

lazy_static! {
    static ref DATE_PREFIX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}-(.+)$").unwrap();
    static ref HEADER_MARKS: Regex = Regex::new(r"(?m)^#{1,6}\s+").unwrap();
}

/// A blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub title: String,

    /// Publication date (file mtime when the front-matter has none)
    pub date: DateTime<Local>,

    /// Last updated date, defaults to `date`
    pub updated: DateTime<Local>,

    pub author: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,

    /// Excerpt HTML
    pub excerpt: String,

    /// Rendered HTML content, headings carry ids
    pub content: String,

    #[serde(rename = "tableOfContents")]
    pub table_of_contents: Option<Vec<TocEntry>>,

    /// Minutes
    #[serde(rename = "readingTime")]
    pub reading_time: u32,

    pub layout: String,
    pub published: bool,
    pub slug: String,

    /// Permalink path without trailing slash, e.g. `2024/03/05/hello-world`
    pub url: String,

    #[serde(rename = "sourcePath")]
    pub source_path: PathBuf,

    /// Custom front-matter fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// Slug from a file stem, dropping a leading `YYYY-MM-DD-` date
///
/// Stripping repeats so that deriving from an already derived slug is a no-op.
///
/// # Examples
/// ```ignore
/// derive_slug("2024-03-05-hello-world") // -> "hello-world"
/// derive_slug("about") // -> "about"
/// ```
pub fn derive_slug(stem: &str) -> String {
    let mut slug = stem;
    while let Some(caps) = DATE_PREFIX.captures(slug) {
        match caps.get(1) {
            Some(rest) => slug = rest.as_str(),
            None => break,
        }
    }
    slug.to_string()
}

/// Substitute `:year`, `:month`, `:day` and `:title`, then drop any trailing slash
pub fn expand_permalink(template: &str, date: &DateTime<Local>, slug: &str) -> String {
    let url = template
        .replace(":year", &date.year().to_string())
        .replace(":month", &format!("{:02}", date.month()))
        .replace(":day", &format!("{:02}", date.day()))
        .replace(":title", slug);
    url.split('/')
        .filter(|s| !matches!(*s, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

/// Whitespace-delimited words at 200 per minute, rounded up, at least 1
pub fn reading_time(markdown: &str) -> u32 {
    let words = markdown.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Plain-text preview of a markdown body
///
/// Header markers, emphasis markers and backticks are removed, newlines
/// become spaces, and text longer than `max_chars` is cut with `...`.
pub fn auto_excerpt(markdown: &str, max_chars: usize) -> String {
    let text = HEADER_MARKS.replace_all(markdown, "");
    let text: String = text
        .chars()
        .filter(|c| !matches!(c, '*' | '`' | '\r'))
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    let text = text.trim();

    let excerpt = if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    };
    escape_html(&excerpt)
}

/// Trim labels and drop empty or repeated ones, keeping first occurrences
pub fn dedupe_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug("2024-03-05-hello-world"), "hello-world");
        assert_eq!(derive_slug("about"), "about");
        assert_eq!(derive_slug("2024-03-05"), "2024-03-05");
        assert_eq!(derive_slug("2024-3-5-short"), "2024-3-5-short");
    }

    #[test]
    fn test_derive_slug_is_idempotent() {
        for stem in ["2024-03-05-hello", "2024-03-05-2023-01-01-nested", "plain"] {
            let once = derive_slug(stem);
            assert_eq!(derive_slug(&once), once);
        }
    }

    #[test]
    fn test_expand_permalink() {
        let date = Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(
            expand_permalink(":year/:month/:day/:title/", &date, "hello-world"),
            "2024/03/05/hello-world"
        );
        assert_eq!(expand_permalink("posts/:title", &date, "x"), "posts/x");
        assert_eq!(expand_permalink(":title//", &date, "x"), "x");
        assert_eq!(
            expand_permalink(":year/:title/", &date, "../../etc"),
            "2024/etc"
        );
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time("one two three"), 1);
        assert_eq!(reading_time(&"word ".repeat(200)), 1);
        assert_eq!(reading_time(&"word ".repeat(201)), 2);
    }

    #[test]
    fn test_auto_excerpt() {
        let md = "# Title\n\nSome **bold** and `code`.\n## Next\nMore";
        assert_eq!(auto_excerpt(md, 200), "Title  Some bold and code. Next More");
        assert_eq!(auto_excerpt("abcdef", 3), "abc...");
        assert_eq!(auto_excerpt("日本語のテキスト", 3), "日本語...");
        assert_eq!(auto_excerpt("a < b", 10), "a &lt; b");
    }

    #[test]
    fn test_dedupe_labels() {
        let labels = vec![
            "rust".to_string(),
            " web ".to_string(),
            "rust".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedupe_labels(labels), vec!["rust", "web"]);
    }
}
