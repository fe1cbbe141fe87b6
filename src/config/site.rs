//! Site configuration (shiori.config.yml)

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names probed in the site root, in priority order
pub const CONFIG_FILES: [&str; 4] = [
    "shiori.config.yml",
    "shiori.config.yaml",
    "shiori.config.json",
    "shiori.config.toml",
];

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteInfo,

    // URL
    pub url: String,
    pub permalink: String,

    pub paths: PathsConfig,
    pub theme: ThemeConfig,
    pub pagination: PaginationConfig,
    pub posts: PostsConfig,
    pub syntax: SyntaxConfig,
    pub preview: PreviewConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteInfo::default(),
            url: String::new(),
            permalink: ":year/:month/:day/:title/".to_string(),
            paths: PathsConfig::default(),
            theme: ThemeConfig::default(),
            pagination: PaginationConfig::default(),
            posts: PostsConfig::default(),
            syntax: SyntaxConfig::default(),
            preview: PreviewConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file, picking the format from its extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let config: SiteConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?,
            _ => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?,
        };

        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Find and load the config file in `base_dir`, falling back to defaults
    pub fn discover<P: AsRef<Path>>(base_dir: P) -> Result<(Self, Option<PathBuf>)> {
        let base_dir = base_dir.as_ref();
        for name in CONFIG_FILES {
            let path = base_dir.join(name);
            if path.is_file() {
                let config = Self::load(&path)?;
                tracing::debug!("Loaded config from {:?}", path);
                return Ok((config, Some(path)));
            }
        }

        tracing::warn!("Config file not found, using defaults");
        Ok((Self::default(), None))
    }

    /// Check invariants the rest of the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.pagination.posts_per_page == 0 {
            bail!("pagination.posts_per_page must be at least 1");
        }
        if self.permalink.trim_matches('/').is_empty() {
            bail!("permalink must not be empty");
        }
        Ok(())
    }
}

/// Site identity shown by templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,
    pub avatar: String,
    pub bio: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "Shiori Blog".to_string(),
            subtitle: String::new(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            avatar: String::new(),
            bio: String::new(),
        }
    }
}

/// Directory layout, relative to the site root (or output root for the
/// category/tag/archive segments)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub source: String,
    pub output: String,
    pub posts: String,
    pub categories: String,
    pub tags: String,
    pub archives: String,
    pub assets: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: "source".to_string(),
            output: "dist".to_string(),
            posts: "_posts".to_string(),
            categories: "categories".to_string(),
            tags: "tags".to_string(),
            archives: "archives".to_string(),
            assets: "assets".to_string(),
        }
    }
}

/// Theme selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub name: String,
    pub colors: IndexMap<String, String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        let colors = [
            ("background", "#FAFAF9"),
            ("surface", "#FFFFFF"),
            ("text_primary", "#1C1917"),
            ("text_secondary", "#57534E"),
            ("accent", "#292524"),
            ("border", "#E7E5E4"),
            ("code_bg", "#1C1917"),
            ("code_text", "#E7E5E4"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            name: "minimalist".to_string(),
            colors,
        }
    }
}

/// Home page pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub posts_per_page: usize,
    pub path: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            path: "page".to_string(),
        }
    }
}

/// Post defaults and display switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostsConfig {
    pub default_layout: String,
    pub excerpt_length: usize,
    pub show_excerpt: bool,
    pub date_format: String,
    pub show_reading_time: bool,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            default_layout: "post".to_string(),
            excerpt_length: 200,
            show_excerpt: true,
            date_format: "YYYY-MM-DD".to_string(),
            show_reading_time: true,
        }
    }
}

/// Code highlighting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_numbers: true,
        }
    }
}

/// Local preview server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub port: u16,
    pub live_reload: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            live_reload: true,
        }
    }
}
