//! Page template language
//!
//! Supports exactly three constructs:
//!
//! - `{{ path.to.value }}` prints a value, or nothing when it does not resolve
//! - `{% for item in path.to.list %}...{% endfor %}` repeats its body per element
//! - `{% if path.to.value %}...{% endif %}` keeps its body when the value is truthy
//!
//! Templates are parsed once into a tree and evaluated against any [`Resolve`]
//! implementation. Tags that do not fit the grammar, stray end tags and
//! blocks that are never closed are emitted as literal text.

use super::value::{Resolve, Scope, Value};
use crate::helpers::{format_date, parse_date_string};

/// Path segment that triggers date formatting when printed
const DATE_SEGMENT: &str = "date";

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Var(Vec<String>),
    Tag { raw: String, kind: TagKind },
}

#[derive(Debug, Clone, PartialEq)]
enum TagKind {
    For { item: String, list: Vec<String> },
    EndFor,
    If { path: Vec<String> },
    EndIf,
}

impl TagKind {
    fn is_open(&self) -> bool {
        matches!(self, TagKind::For { .. } | TagKind::If { .. })
    }

    /// Whether `self` is the end tag closing `open`
    fn closes(&self, open: &TagKind) -> bool {
        matches!(
            (open, self),
            (TagKind::For { .. }, TagKind::EndFor) | (TagKind::If { .. }, TagKind::EndIf)
        )
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut text = String::new();

        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            let Some(start) = find_tag_start(rest) else {
                text.push_str(rest);
                break;
            };
            text.push_str(&rest[..start]);
            self.pos += start;

            match self.read_tag() {
                Some(token) => {
                    if !text.is_empty() {
                        tokens.push(Token::Text(std::mem::take(&mut text)));
                    }
                    tokens.push(token);
                }
                None => {
                    // Opening delimiter without a usable tag: keep it as text
                    text.push_str(&self.input[self.pos..self.pos + 2]);
                    self.pos += 2;
                }
            }
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        tokens
    }

    /// Read `{{ ... }}` or `{% ... %}` at the current position
    fn read_tag(&mut self) -> Option<Token> {
        let rest = &self.input[self.pos..];
        let close = if rest.starts_with("{{") { "}}" } else { "%}" };
        let end = rest[2..].find(close)? + 2;
        let raw = &rest[..end + 2];
        let inner = rest[2..end].trim();

        let token = if close == "}}" {
            Token::Var(parse_path(inner)?)
        } else {
            Token::Tag {
                raw: raw.to_string(),
                kind: parse_tag(inner)?,
            }
        };
        self.pos += raw.len();
        Some(token)
    }
}

fn find_tag_start(s: &str) -> Option<usize> {
    match (s.find("{{"), s.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '$')
}

/// `a.b.c` into segments; anything else is not a path
fn parse_path(s: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = s.split('.').map(str::to_string).collect();
    if segments.iter().all(|seg| is_identifier(seg)) {
        Some(segments)
    } else {
        None
    }
}

fn parse_tag(inner: &str) -> Option<TagKind> {
    let words: Vec<&str> = inner.split_whitespace().collect();
    match words.as_slice() {
        ["for", item, "in", list] if is_identifier(item) => Some(TagKind::For {
            item: item.to_string(),
            list: parse_path(list)?,
        }),
        ["endfor"] => Some(TagKind::EndFor),
        ["if", path] => Some(TagKind::If {
            path: parse_path(path)?,
        }),
        ["endif"] => Some(TagKind::EndIf),
        _ => None,
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Syntax tree node
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(Vec<String>),
    For {
        item: String,
        list: Vec<String>,
        body: Vec<Node>,
    },
    If {
        path: Vec<String>,
        body: Vec<Node>,
    },
}

/// Pair every block opener with its end tag
///
/// An end tag closes the innermost open block of its kind; openers skipped
/// over that way, and end tags with no open block, stay unpaired.
fn match_blocks(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut partner = vec![None; tokens.len()];
    let mut open: Vec<usize> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Token::Tag { kind, .. } = token else {
            continue;
        };
        if kind.is_open() {
            open.push(i);
            continue;
        }
        let matching = open.iter().rposition(|&o| match &tokens[o] {
            Token::Tag { kind: open_kind, .. } => kind.closes(open_kind),
            _ => false,
        });
        if let Some(at) = matching {
            let opener = open[at];
            open.truncate(at);
            partner[opener] = Some(i);
            partner[i] = Some(opener);
        }
    }

    partner
}

fn build(tokens: &[Token], partner: &[Option<usize>], start: usize, end: usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut i = start;

    while i < end {
        match &tokens[i] {
            Token::Text(text) => push_text(&mut nodes, text),
            Token::Var(path) => nodes.push(Node::Var(path.clone())),
            Token::Tag { raw, kind } => match (kind, partner[i]) {
                (TagKind::For { item, list }, Some(close)) if close > i => {
                    nodes.push(Node::For {
                        item: item.clone(),
                        list: list.clone(),
                        body: build(tokens, partner, i + 1, close),
                    });
                    i = close;
                }
                (TagKind::If { path }, Some(close)) if close > i => {
                    nodes.push(Node::If {
                        path: path.clone(),
                        body: build(tokens, partner, i + 1, close),
                    });
                    i = close;
                }
                _ => push_text(&mut nodes, raw),
            },
        }
        i += 1;
    }

    nodes
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

// ============================================================================
// Template
// ============================================================================

/// A parsed page template
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template source; never fails, malformed tags become text
    pub fn parse(source: &str) -> Self {
        let tokens = Lexer::new(source).tokenize();
        let partner = match_blocks(&tokens);
        Self {
            nodes: build(&tokens, &partner, 0, tokens.len()),
        }
    }

    /// Render against `scope`, formatting `date` paths with `date_format`
    pub fn render(&self, scope: &dyn Resolve, date_format: &str) -> String {
        let mut out = String::new();
        Evaluator { date_format }.eval(&self.nodes, scope, &mut out);
        out
    }
}

struct Evaluator<'f> {
    date_format: &'f str,
}

impl Evaluator<'_> {
    fn eval(&self, nodes: &[Node], scope: &dyn Resolve, out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var(path) => {
                    if let Some(value) = scope.resolve(path) {
                        out.push_str(&self.stringify(path, value));
                    }
                }
                Node::For { item, list, body } => {
                    // Non-arrays iterate zero times
                    if let Some(Value::Array(items)) = scope.resolve(list) {
                        for value in items {
                            let inner = Scope {
                                parent: scope,
                                name: item,
                                value,
                            };
                            self.eval(body, &inner, out);
                        }
                    }
                }
                Node::If { path, body } => {
                    if scope.resolve(path).is_some_and(Value::is_truthy) {
                        self.eval(body, scope, out);
                    }
                }
            }
        }
    }

    fn stringify(&self, path: &[String], value: &Value) -> String {
        if path.iter().any(|seg| seg == DATE_SEGMENT) {
            if let Value::String(s) = value {
                if let Some(date) = parse_date_string(s) {
                    return format_date(&date, self.date_format);
                }
            }
        }
        value.to_output_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::value::Context;
    use serde_json::json;

    fn render(template: &str, data: serde_json::Value) -> String {
        let mut ctx = Context::new();
        if let serde_json::Value::Object(map) = data {
            for (k, v) in map {
                ctx.set(&k, Value::from_json(&v));
            }
        }
        Template::parse(template).render(&ctx, "YYYY-MM-DD")
    }

    #[test]
    fn test_variables() {
        let data = json!({"site": {"title": "Blog"}, "n": 3});
        assert_eq!(render("<h1>{{ site.title }}</h1>", data.clone()), "<h1>Blog</h1>");
        assert_eq!(render("{{n}} min", data.clone()), "3 min");
        assert_eq!(render("[{{ site.missing }}][{{ nope.x }}]", data), "[][]");
    }

    #[test]
    fn test_for_loop() {
        let data = json!({"posts": [{"title": "A"}, {"title": "B"}], "tags": ["x", "y"]});
        assert_eq!(
            render("{% for post in posts %}<li>{{ post.title }}</li>{% endfor %}", data.clone()),
            "<li>A</li><li>B</li>"
        );
        assert_eq!(render("{% for t in tags %}#{{t}} {% endfor %}", data), "#x #y ");
    }

    #[test]
    fn test_for_over_non_array_is_empty() {
        let data = json!({"posts": "nope"});
        assert_eq!(render("a{% for p in posts %}x{% endfor %}b", data), "ab");
        assert_eq!(render("a{% for p in missing %}x{% endfor %}b", json!({})), "ab");
    }

    #[test]
    fn test_if_on_arrays() {
        let tmpl = "{% if tags %}<ul>{% for t in tags %}<li>{{t}}</li>{% endfor %}</ul>{% endif %}";
        assert_eq!(render(tmpl, json!({"tags": []})), "");
        assert_eq!(render(tmpl, json!({"tags": ["one"]})), "<ul><li>one</li></ul>");
    }

    #[test]
    fn test_if_scalars() {
        let tmpl = "{% if page.author %}by {{page.author}}{% endif %}";
        assert_eq!(render(tmpl, json!({"page": {"author": "Ann"}})), "by Ann");
        assert_eq!(render(tmpl, json!({"page": {"author": ""}})), "");
        assert_eq!(render(tmpl, json!({})), "");
    }

    #[test]
    fn test_nested_loops_and_scope_chain() {
        let data = json!({
            "site": {"title": "S"},
            "archive": [
                {"year": 2024, "months": [{"month": 2, "posts": [{"title": "A"}]}]},
                {"year": 2023, "months": [{"month": 12, "posts": [{"title": "B"}, {"title": "C"}]}]}
            ]
        });
        let tmpl = "{% for y in archive %}{{y.year}}:{% for m in y.months %}{{m.month}}={% for p in m.posts %}{{p.title}}{{site.title}}{% endfor %};{% endfor %}|{% endfor %}";
        assert_eq!(render(tmpl, data), "2024:2=AS;|2023:12=BSCS;|");
    }

    #[test]
    fn test_if_inside_loop_uses_item() {
        let data = json!({"posts": [{"t": "A", "e": "ex"}, {"t": "B", "e": ""}]});
        let tmpl = "{% for p in posts %}{{p.t}}{% if p.e %}({{p.e}}){% endif %} {% endfor %}";
        assert_eq!(render(tmpl, data), "A(ex) B ");
    }

    #[test]
    fn test_date_paths_are_formatted() {
        let data = json!({"page": {"date": "2024-03-05T10:00:00+00:00", "title": "2024-03-05T10:00:00+00:00"}});
        let out = render("{{page.date}}|{{page.title}}", data);
        let (date, title) = out.split_once('|').unwrap();
        assert_eq!(date.len(), 10);
        assert!(date.starts_with("2024-03-0"));
        assert_eq!(title, "2024-03-05T10:00:00+00:00");
        assert_eq!(render("{{date}}", json!({"date": "not a date"})), "not a date");
    }

    #[test]
    fn test_malformed_tags_pass_through() {
        let data = json!({"x": "v"});
        assert_eq!(render("{{ x + 1 }}", data.clone()), "{{ x + 1 }}");
        assert_eq!(
            render("{% if a == 2 %}y{% else %}n{% endif %}", data.clone()),
            "{% if a == 2 %}y{% else %}n{% endif %}"
        );
        assert_eq!(render("{% if x %}never closed {{x}}", data.clone()), "{% if x %}never closed v");
        assert_eq!(render("stray {% endfor %} {{x}}", data.clone()), "stray {% endfor %} v");
        assert_eq!(render("a {{ unterminated", data.clone()), "a {{ unterminated");
        assert_eq!(render("css { color: red }", data), "css { color: red }");
    }

    #[test]
    fn test_unclosed_inner_block_is_literal() {
        let data = json!({"items": [1, 2]});
        assert_eq!(
            render("{% for i in items %}[{% if i %}{{i}}]{% endfor %}", data),
            "[{% if i %}1][{% if i %}2]"
        );
    }
}
