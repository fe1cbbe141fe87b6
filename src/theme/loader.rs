//! Theme loader - page templates, the stylesheet and static assets
//!
//! A theme lives in `themes/<name>/`. Any `<kind>.html` found there replaces
//! the embedded default template of that page kind, `assets/css/style.css`
//! becomes the inline stylesheet, and `assets/` is copied to the output.

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use super::engine::PageKind;

const DEFAULT_STYLESHEET: &str = include_str!("defaults/style.css");

/// Embedded template used when the theme does not provide one
pub fn default_template(kind: PageKind) -> &'static str {
    match kind {
        PageKind::Post => include_str!("defaults/post.html"),
        PageKind::Index => include_str!("defaults/index.html"),
        PageKind::Category => include_str!("defaults/category.html"),
        PageKind::Tag => include_str!("defaults/tag.html"),
        PageKind::Archive => include_str!("defaults/archive.html"),
        PageKind::Categories => include_str!("defaults/categories.html"),
        PageKind::Tags => include_str!("defaults/tags.html"),
    }
}

/// Loads templates and styles from a theme directory
pub struct ThemeLoader {
    theme_dir: PathBuf,
    colors: IndexMap<String, String>,
    styles: OnceLock<String>,
}

impl ThemeLoader {
    /// The directory may be missing; everything then falls back to defaults
    pub fn new<P: AsRef<Path>>(theme_dir: P, colors: &IndexMap<String, String>) -> Self {
        let theme_dir = theme_dir.as_ref().to_path_buf();
        if !theme_dir.is_dir() {
            tracing::debug!("Theme directory {:?} not found, using built-in theme", theme_dir);
        }
        Self {
            theme_dir,
            colors: colors.clone(),
            styles: OnceLock::new(),
        }
    }

    /// Template source for a page kind, theme file first
    pub fn template_source(&self, kind: PageKind) -> Result<Cow<'static, str>> {
        let path = self
            .theme_dir
            .join(format!("{}.html", kind.template_name()));
        if path.is_file() {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            tracing::debug!("Using theme template {:?}", path);
            Ok(Cow::Owned(source))
        } else {
            Ok(Cow::Borrowed(default_template(kind)))
        }
    }

    /// Inline stylesheet: theme colors as custom properties, then the theme CSS
    ///
    /// Read from disk once per loader and reused for every page.
    pub fn styles(&self) -> Result<&str> {
        if let Some(styles) = self.styles.get() {
            return Ok(styles.as_str());
        }

        let path = self.theme_dir.join("assets").join("css").join("style.css");
        let css = if path.is_file() {
            Cow::Owned(
                fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read stylesheet {}", path.display()))?,
            )
        } else {
            Cow::Borrowed(DEFAULT_STYLESHEET)
        };

        let mut styles = String::from(":root {");
        for (name, value) in &self.colors {
            styles.push_str(&format!(" --color-{}: {};", name.replace('_', "-"), value));
        }
        styles.push_str(" }\n");
        styles.push_str(&css);

        Ok(self.styles.get_or_init(|| styles).as_str())
    }

    /// Copy theme assets, then site assets, into `<output>/assets`
    ///
    /// Site assets overwrite theme assets with the same path.
    pub fn copy_assets(&self, site_assets: &Path, output_dir: &Path) -> Result<usize> {
        let dest = output_dir.join("assets");
        let mut copied = copy_dir(&self.theme_dir.join("assets"), &dest)?;
        if copied > 0 {
            tracing::debug!("Copied {} theme assets", copied);
        }
        let site = copy_dir(site_assets, &dest)?;
        if site > 0 {
            tracing::debug!("Copied {} site assets", site);
        }
        copied += site;
        Ok(copied)
    }
}

/// Recursively copy `from` into `to`, skipping dot-files; a missing source is a no-op
fn copy_dir(from: &Path, to: &Path) -> Result<usize> {
    if !from.is_dir() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = path.strip_prefix(from)?;
        let hidden = relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(path, &target)
            .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn colors() -> IndexMap<String, String> {
        IndexMap::from([("text_primary".to_string(), "#111".to_string())])
    }

    #[test]
    fn test_defaults_without_theme_dir() {
        let dir = TempDir::new().unwrap();
        let loader = ThemeLoader::new(dir.path().join("missing"), &colors());

        let source = loader.template_source(PageKind::Post).unwrap();
        assert!(source.contains("{{page.content}}"));

        let styles = loader.styles().unwrap();
        assert!(styles.starts_with(":root { --color-text-primary: #111; }"));
        assert!(styles.contains(DEFAULT_STYLESHEET));
    }

    #[test]
    fn test_theme_overrides() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/css")).unwrap();
        fs::write(dir.path().join("index.html"), "custom {{site.title}}").unwrap();
        fs::write(dir.path().join("assets/css/style.css"), "body{}").unwrap();

        let loader = ThemeLoader::new(dir.path(), &IndexMap::new());
        assert_eq!(
            loader.template_source(PageKind::Index).unwrap(),
            "custom {{site.title}}"
        );
        assert!(loader.template_source(PageKind::Tag).unwrap().contains("{{tag}}"));
        assert_eq!(loader.styles().unwrap(), ":root { }\nbody{}");
    }

    #[test]
    fn test_styles_are_read_once() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/css")).unwrap();
        let css = dir.path().join("assets/css/style.css");
        fs::write(&css, "a{}").unwrap();

        let loader = ThemeLoader::new(dir.path(), &IndexMap::new());
        assert!(loader.styles().unwrap().ends_with("a{}"));
        fs::write(&css, "b{}").unwrap();
        assert!(loader.styles().unwrap().ends_with("a{}"));
    }

    #[test]
    fn test_copy_assets_site_wins() {
        let dir = TempDir::new().unwrap();
        let theme = dir.path().join("theme");
        let site_assets = dir.path().join("source/assets");
        let output = dir.path().join("dist");
        fs::create_dir_all(theme.join("assets/img")).unwrap();
        fs::create_dir_all(&site_assets).unwrap();
        fs::write(theme.join("assets/img/logo.png"), "theme").unwrap();
        fs::write(theme.join("assets/.DS_Store"), "x").unwrap();
        fs::write(theme.join("assets/app.js"), "theme").unwrap();
        fs::write(site_assets.join("app.js"), "site").unwrap();

        let loader = ThemeLoader::new(&theme, &IndexMap::new());
        let copied = loader.copy_assets(&site_assets, &output).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(fs::read_to_string(output.join("assets/app.js")).unwrap(), "site");
        assert!(output.join("assets/img/logo.png").exists());
        assert!(!output.join("assets/.DS_Store").exists());
    }
}
