//! Markdown rendering with syntax highlighting

use super::toc::{TocBuilder, TocEntry};
use crate::config::SyntaxConfig;
use crate::helpers::escape_html;
use anyhow::Result;
use pulldown_cmark::{
    html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use std::borrow::Cow;
use std::sync::Arc;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Highlighted code, one HTML fragment per source line
#[derive(Debug, Clone)]
pub struct HighlightedCode {
    pub language: String,
    pub lines: Vec<String>,
}

impl HighlightedCode {
    /// Escaped, unstyled rendition used when highlighting fails
    pub fn plain(code: &str, lang: Option<&str>) -> Self {
        Self {
            language: lang.unwrap_or("plaintext").to_string(),
            lines: code.lines().map(escape_html).collect(),
        }
    }
}

/// Language-aware code highlighter
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &str, lang: Option<&str>) -> Result<HighlightedCode>;
}

/// syntect-backed highlighter producing inline-styled spans
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntectHighlighter {
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                tracing::warn!(
                    "Unknown syntax theme {:?}, using {}",
                    theme_name,
                    DEFAULT_THEME
                );
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    /// Requested language first, then first-line detection, then plain text
    fn find_syntax(&self, code: &str, lang: Option<&str>) -> (&SyntaxReference, String) {
        if let Some(lang) = lang {
            let found = self
                .syntax_set
                .find_syntax_by_token(lang)
                .or_else(|| self.syntax_set.find_syntax_by_extension(lang));
            if let Some(syntax) = found {
                return (syntax, lang.to_string());
            }
        }

        let detected = code
            .lines()
            .next()
            .and_then(|line| self.syntax_set.find_syntax_by_first_line(line));
        match detected {
            Some(syntax) => (syntax, syntax.name.to_lowercase().replace(' ', "-")),
            None => (
                self.syntax_set.find_syntax_plain_text(),
                lang.unwrap_or("plaintext").to_string(),
            ),
        }
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, lang: Option<&str>) -> Result<HighlightedCode> {
        let (syntax, language) = self.find_syntax(code, lang);
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(code) {
            let regions = highlighter.highlight_line(line, &self.syntax_set)?;
            let regions: Vec<_> = regions
                .into_iter()
                .map(|(style, text)| (style, text.trim_end_matches(['\n', '\r'])))
                .collect();
            lines.push(styled_line_to_highlighted_html(
                &regions[..],
                IncludeBackground::No,
            )?);
        }

        Ok(HighlightedCode { language, lines })
    }
}

/// Rendered post body
#[derive(Debug, Clone)]
pub struct Rendered {
    pub html: String,
    /// h2/h3 headings in document order, `None` when there are none
    pub toc: Option<Vec<TocEntry>>,
}

/// Markdown renderer with syntax highlighting
#[derive(Clone)]
pub struct MarkdownRenderer {
    highlighter: Arc<dyn Highlighter>,
    line_numbers: bool,
}

impl MarkdownRenderer {
    pub fn new(highlighter: Arc<dyn Highlighter>, line_numbers: bool) -> Self {
        Self {
            highlighter,
            line_numbers,
        }
    }

    pub fn from_config(config: &SyntaxConfig) -> Self {
        Self::new(
            Arc::new(SyntectHighlighter::new(&config.theme)),
            config.line_numbers,
        )
    }

    /// Render markdown to HTML, assigning ids to h2/h3 headings
    pub fn render(&self, markdown: &str) -> Rendered {
        let source = repair_markdown(markdown);

        // Smart punctuation would turn the repaired `&#42;` runs into other text
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(&source, options);

        let mut events: Vec<Event> = Vec::new();
        let mut toc = TocBuilder::new();
        let mut heading: Option<(usize, HeadingLevel, String)> = None;
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in parser {
            if let Some((lang, code)) = &mut code_block {
                match event {
                    Event::Text(text) => code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let html = self.render_code(code, lang.as_deref());
                        events.push(Event::Html(CowStr::from(html)));
                        code_block = None;
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split(|c: char| c.is_whitespace() || c == ',')
                            .next()
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::Start(Tag::Heading { level, .. })
                    if matches!(level, HeadingLevel::H2 | HeadingLevel::H3) =>
                {
                    heading = Some((events.len(), level, String::new()));
                    events.push(event);
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((index, level, text)) = heading.take() {
                        let id = toc.push(level as u8, &text);
                        events[index] = Event::Start(Tag::Heading {
                            level,
                            id: Some(CowStr::from(id)),
                            classes: Vec::new(),
                            attrs: Vec::new(),
                        });
                    }
                    events.push(event);
                }
                Event::Text(ref text) | Event::Code(ref text) => {
                    if let Some((_, _, buf)) = &mut heading {
                        buf.push_str(text);
                    }
                    events.push(event);
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some((_, _, buf)) = &mut heading {
                        buf.push(' ');
                    }
                    events.push(Event::HardBreak);
                }
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Rendered {
            html: html_output,
            toc: toc.finish(),
        }
    }

    /// Highlight a code block, degrading to escaped plain code on failure
    fn render_code(&self, code: &str, lang: Option<&str>) -> String {
        let highlighted = match self.highlighter.highlight(code, lang) {
            Ok(highlighted) => highlighted,
            Err(e) => {
                tracing::debug!("Highlighting failed, rendering plain code: {}", e);
                HighlightedCode::plain(code, lang)
            }
        };
        let lang = escape_html(&highlighted.language);

        if self.line_numbers {
            add_line_numbers(&highlighted.lines, &lang)
        } else {
            format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                lang,
                highlighted.lines.join("\n")
            )
        }
    }
}

/// Wrap highlighted lines in a gutter/code table
fn add_line_numbers(lines: &[String], lang: &str) -> String {
    let gutter: Vec<String> = (1..=lines.len())
        .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
        .collect();

    format!(
        r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre><code class="language-{}">{}</code></pre></td></tr></table></figure>"#,
        lang,
        gutter.join("\n"),
        lang,
        lines.join("\n")
    )
}

/// Line-wise fixes applied before parsing; fenced code is left untouched
pub fn repair_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<&str> = None;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            out.push_str(line);
            continue;
        }
        if let Some(marker) = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m)) {
            fence = Some(marker);
            out.push_str(line);
            continue;
        }

        let escaped = fix_escapes(line);
        out.push_str(&repair_emphasis(&escaped));
    }

    out
}

/// Escaped asterisks become entities so they never pair up as emphasis
fn fix_escapes(line: &str) -> Cow<'_, str> {
    if line.contains("\\*") {
        Cow::Owned(line.replace("\\**", "&#42;&#42;").replace("\\*", "&#42;"))
    } else {
        Cow::Borrowed(line)
    }
}

/// Close a dangling `**` before the next sentence punctuation or line end
///
/// Lines with an even number of markers, or where the last marker is
/// directly followed by punctuation or another `*`, are returned unchanged.
pub fn repair_emphasis(line: &str) -> Cow<'_, str> {
    let content = line.trim_end_matches(['\n', '\r']);
    let ending = &line[content.len()..];

    if content.matches("**").count() % 2 == 0 {
        return Cow::Borrowed(line);
    }
    let Some(open) = content.rfind("**") else {
        return Cow::Borrowed(line);
    };
    let start = open + 2;
    let rest = &content[start..];
    if rest.trim().is_empty() {
        return Cow::Borrowed(line);
    }

    let mut insert_at = None;
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '*' {
            return Cow::Borrowed(line);
        }
        let next = chars.peek().map(|&(_, n)| n);
        if is_sentence_break(c, next) {
            if i == 0 {
                return Cow::Borrowed(line);
            }
            insert_at = Some(start + i);
            break;
        }
    }
    let at = insert_at.unwrap_or(start + rest.trim_end().len());

    Cow::Owned(format!(
        "{}**{}{}",
        &content[..at],
        &content[at..],
        ending
    ))
}

/// Full-width punctuation always breaks; ASCII only when followed by space or line end
fn is_sentence_break(c: char, next: Option<char>) -> bool {
    match c {
        '，' | '。' | '！' | '？' | '；' | '：' | '、' => true,
        '.' | ',' | '!' | '?' | ';' | ':' => next.map_or(true, char::is_whitespace),
        _ => false,
    }
}
