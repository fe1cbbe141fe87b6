//! Post loader - reads markdown files and builds Post records

use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::error::ContentError;
use super::frontmatter::Document;
use super::post::{auto_excerpt, dedupe_labels, derive_slug, expand_permalink, reading_time};
use super::{MarkdownRenderer, Post};
use crate::config::SiteConfig;
use crate::helpers::parse_date_string;

/// Computed post fields a custom front-matter key must not shadow
const DERIVED_KEYS: [&str; 9] = [
    "excerpt",
    "content",
    "tableOfContents",
    "readingTime",
    "url",
    "sourcePath",
    "permalink",
    "category_links",
    "tag_links",
];

/// Loads posts from a directory of markdown files
pub struct PostLoader<'a> {
    config: &'a SiteConfig,
    renderer: &'a MarkdownRenderer,
}

impl<'a> PostLoader<'a> {
    pub fn new(config: &'a SiteConfig, renderer: &'a MarkdownRenderer) -> Self {
        Self { config, renderer }
    }

    /// Load every published post under `dir`, recursively
    ///
    /// Posts come back in file-name order; callers sort by date.
    pub fn load_posts(&self, dir: &Path) -> Result<Vec<Post>, ContentError> {
        if !dir.exists() {
            tracing::debug!("Posts directory {:?} does not exist", dir);
            return Ok(Vec::new());
        }

        let mut posts = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| ContentError::Read {
                path: e.path().unwrap_or(dir).to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) {
                continue;
            }

            let post = self.load_post(path)?;
            if post.published {
                posts.push(post);
            } else {
                tracing::debug!("Skipping unpublished post {:?}", path);
            }
        }

        Ok(posts)
    }

    /// Load a single post from a file
    pub fn load_post(&self, path: &Path) -> Result<Post, ContentError> {
        let read_err = |source| ContentError::Read {
            path: path.to_path_buf(),
            source,
        };
        let content = fs::read_to_string(path).map_err(read_err)?;
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(read_err)?;

        self.parse_post(path, &content, DateTime::<Local>::from(modified))
    }

    /// Build a post from file content; `modified` is the date fallback
    pub fn parse_post(
        &self,
        path: &Path,
        content: &str,
        modified: DateTime<Local>,
    ) -> Result<Post, ContentError> {
        let doc = Document::parse(content).map_err(|source| ContentError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
        let fm = doc.front_matter;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");

        let date = match fm.date.as_deref() {
            Some(raw) => parse_date_string(raw).unwrap_or_else(|| {
                tracing::warn!(
                    "Unrecognized date {:?} in {:?}, using file modification time",
                    raw,
                    path
                );
                modified
            }),
            None => modified,
        };
        let updated = fm
            .updated
            .as_deref()
            .and_then(parse_date_string)
            .unwrap_or(date);

        let slug = fm
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| derive_slug(stem));
        let url = expand_permalink(&self.config.permalink, &date, &slug);

        let rendered = self.renderer.render(doc.body);
        let excerpt = match doc.excerpt {
            Some(markdown) => self.renderer.render(markdown).html,
            None => auto_excerpt(doc.body, self.config.posts.excerpt_length),
        };

        Ok(Post {
            title: fm.title.unwrap_or_else(|| stem.to_string()),
            date,
            updated,
            author: fm
                .author
                .unwrap_or_else(|| self.config.site.author.clone()),
            categories: dedupe_labels(fm.categories),
            tags: dedupe_labels(fm.tags),
            excerpt,
            content: rendered.html,
            table_of_contents: rendered.toc,
            reading_time: reading_time(doc.body),
            layout: fm
                .layout
                .unwrap_or_else(|| self.config.posts.default_layout.clone()),
            published: fm.published,
            slug,
            url,
            source_path: path.to_path_buf(),
            extra: fm
                .extra
                .into_iter()
                .filter(|(key, _)| !DERIVED_KEYS.contains(&key.as_str()))
                .collect(),
        })
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::from_config(&Default::default())
    }

    fn mtime() -> DateTime<Local> {
        Local.with_ymd_and_hms(2023, 7, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_post_from_dated_filename() {
        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);

        let content = "---\ntitle: Hello\ndate: 2024-03-05 10:00:00\n---\nBody text.";
        let post = loader
            .parse_post(Path::new("_posts/2024-03-05-hello-world.md"), content, mtime())
            .unwrap();

        assert_eq!(post.title, "Hello");
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.url, "2024/03/05/hello-world");
        assert_eq!(post.updated, post.date);
        assert_eq!(post.layout, "post");
        assert_eq!(post.excerpt, "Body text.");
        assert!(post.reading_time >= 1);
        assert!(post.table_of_contents.is_none());
    }

    #[test]
    fn test_missing_date_uses_mtime() {
        let mut config = SiteConfig::default();
        config.site.author = "Site Author".to_string();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);

        let post = loader
            .parse_post(Path::new("notes.md"), "Just text", mtime())
            .unwrap();
        assert_eq!(post.date, mtime());
        assert_eq!(post.title, "notes");
        assert_eq!(post.slug, "notes");
        assert_eq!(post.author, "Site Author");
        assert_eq!(post.url, "2023/07/01/notes");
    }

    #[test]
    fn test_unparsable_date_falls_back() {
        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);

        let post = loader
            .parse_post(Path::new("a.md"), "---\ndate: someday\n---\nx", mtime())
            .unwrap();
        assert_eq!(post.date, mtime());
    }

    #[test]
    fn test_explicit_excerpt_and_slug() {
        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);

        let content = "---\nslug: custom\ntags: [a, b, a]\n---\n**Lead**\n\n<!-- more -->\n\n## Section\n";
        let post = loader
            .parse_post(Path::new("2024-01-01-ignored.md"), content, mtime())
            .unwrap();
        assert_eq!(post.slug, "custom");
        assert_eq!(post.tags, vec!["a", "b"]);
        assert!(post.excerpt.contains("<strong>Lead</strong>"));
        assert!(post.content.contains("<strong>Lead</strong>"));
        assert!(post.content.contains(r#"<h2 id="section">"#));
        assert_eq!(post.table_of_contents.unwrap()[0].id, "section");
    }

    #[test]
    fn test_malformed_front_matter_names_file() {
        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);

        let err = loader
            .parse_post(Path::new("broken.md"), "---\ntitle: [x\ntags: y\n---\n", mtime())
            .unwrap_err();
        assert!(matches!(err, ContentError::Metadata { .. }));
        assert!(err.to_string().contains("broken.md"));
    }

    #[test]
    fn test_custom_fields_cannot_shadow_derived_ones() {
        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);

        let content = "---
cover: /img/a.png
url: /elsewhere
---
Text";
        let post = loader
            .parse_post(Path::new("2024-01-01-a.md"), content, mtime())
            .unwrap();
        assert!(post.extra.contains_key("cover"));
        assert!(!post.extra.contains_key("url"));
    }

    #[test]
    fn test_load_posts_skips_unpublished_and_non_markdown() {
        let dir = TempDir::new().unwrap();
        let posts_dir = dir.path().join("_posts");
        fs::create_dir_all(posts_dir.join("nested")).unwrap();
        fs::write(posts_dir.join("2024-01-02-b.md"), "---\ntitle: B\n---\nb").unwrap();
        fs::write(posts_dir.join("nested/2024-01-01-a.markdown"), "a").unwrap();
        fs::write(posts_dir.join("draft.md"), "---\npublished: false\n---\nd").unwrap();
        fs::write(posts_dir.join("image.png"), "png").unwrap();

        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);
        let posts = loader.load_posts(&posts_dir).unwrap();

        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }

    #[test]
    fn test_draft_flags_in_any_scalar_form() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bom.md"), "\u{feff}---\npublished: false\n---\nd").unwrap();
        fs::write(dir.path().join("quoted.md"), "---\npublished: \"false\"\n---\nd").unwrap();
        fs::write(dir.path().join("yes.md"), "---\ntitle: Kept\npublished: no\n---\nk").unwrap();

        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);
        let posts = loader.load_posts(dir.path()).unwrap();

        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Kept"]);
    }

    #[test]
    fn test_missing_posts_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::default();
        let renderer = renderer();
        let loader = PostLoader::new(&config, &renderer);
        assert!(loader.load_posts(&dir.path().join("nope")).unwrap().is_empty());
    }
}
