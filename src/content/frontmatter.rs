//! Front-matter parsing

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;

/// Marker separating an explicit excerpt from the rest of the body
pub const DEFAULT_EXCERPT_SEPARATOR: &str = "<!-- more -->";

/// Render a YAML scalar as text; sequences and maps have no text form
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Accept any scalar (`date: 2024-01-15`, `title: 1984`) as an optional string
fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Handles both a single scalar and a list of scalars
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(&other).into_iter().collect(),
        None => Vec::new(),
    })
}

fn default_published() -> bool {
    true
}

/// Only an explicit `false` (boolean or string) unpublishes a post
fn published_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value.as_ref().and_then(scalar_to_string) {
        Some(flag) => !flag.trim().eq_ignore_ascii_case("false"),
        None => true,
    })
}

/// Metadata block at the top of a post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "opt_scalar")]
    pub title: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub date: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub updated: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub author: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub slug: Option<String>,
    pub layout: Option<String>,
    #[serde(default = "default_published", deserialize_with = "published_flag")]
    pub published: bool,
    pub excerpt_separator: Option<String>,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            title: None,
            date: None,
            updated: None,
            author: None,
            categories: Vec::new(),
            tags: Vec::new(),
            slug: None,
            layout: None,
            published: true,
            excerpt_separator: None,
            extra: HashMap::new(),
        }
    }
}

impl FrontMatter {
    /// Parse a leading `---` fenced YAML block
    ///
    /// Returns the metadata and the remaining body. Content without a
    /// front-matter block yields default metadata and the whole text.
    pub fn parse(content: &str) -> Result<(Self, &str), serde_yaml::Error> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let trimmed = content.trim_start();
        let Some(rest) = trimmed.strip_prefix("---") else {
            return Ok((FrontMatter::default(), content));
        };
        if !(rest.starts_with('\n') || rest.starts_with("\r\n")) {
            return Ok((FrontMatter::default(), content));
        }
        let rest = rest.trim_start_matches(['\n', '\r']);

        // Closing fence may sit on the very first line of an empty block
        let (yaml, remaining) = if let Some(after) = rest.strip_prefix("---") {
            ("", after)
        } else if let Some(end) = rest.find("\n---") {
            (&rest[..end], &rest[end + 4..])
        } else {
            return Ok((FrontMatter::default(), content));
        };
        let remaining = remaining.trim_start_matches(['\n', '\r']);

        if yaml.trim().is_empty() {
            return Ok((FrontMatter::default(), remaining));
        }

        // A `---` thematic break followed by prose is not a metadata block
        if !has_yaml_structure(yaml) {
            return Ok((FrontMatter::default(), content));
        }

        let fm = serde_yaml::from_str::<FrontMatter>(yaml)?;
        Ok((fm, remaining))
    }

    /// Separator used to cut an explicit excerpt out of the body
    pub fn excerpt_separator(&self) -> &str {
        self.excerpt_separator
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_EXCERPT_SEPARATOR)
    }
}

/// At least one line must look like `key: value`
fn has_yaml_structure(yaml: &str) -> bool {
    yaml.lines().any(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return false;
        }
        let Some(colon_pos) = trimmed.find(':') else {
            return false;
        };
        let key = &trimmed[..colon_pos];
        let is_valid_key = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && !matches!(key, "http" | "https" | "ftp");
        let after = &trimmed[colon_pos + 1..];
        is_valid_key && (after.is_empty() || after.starts_with(' '))
    })
}

/// A source file split into metadata, markdown body and optional excerpt
#[derive(Debug)]
pub struct Document<'a> {
    pub front_matter: FrontMatter,
    /// Full markdown body, excerpt marker included
    pub body: &'a str,
    /// Markdown before the excerpt marker, when the marker is present
    pub excerpt: Option<&'a str>,
}

impl<'a> Document<'a> {
    pub fn parse(content: &'a str) -> Result<Self, serde_yaml::Error> {
        let (front_matter, body) = FrontMatter::parse(content)?;
        let excerpt = body
            .find(front_matter.excerpt_separator())
            .map(|pos| body[..pos].trim())
            .filter(|e| !e.is_empty());

        Ok(Self {
            front_matter,
            body,
            excerpt,
        })
    }
}
