//! shiori: a minimalist static blog generator
//!
//! Markdown posts with YAML front-matter are rendered to HTML, grouped into
//! paginated listings, category/tag pages and a date archive, and written
//! through a small built-in template language.

pub mod collection;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod theme;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::content::{MarkdownRenderer, Post, PostLoader};

/// The main Shiori application
#[derive(Debug, Clone)]
pub struct Shiori {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Config file the configuration was read from, if any
    pub config_path: Option<PathBuf>,
    /// Base directory
    pub base_dir: PathBuf,
    /// Source directory
    pub source_dir: PathBuf,
    /// Directory scanned for posts
    pub posts_dir: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    /// Theme directory
    pub theme_dir: PathBuf,
}

impl Shiori {
    /// Create a new Shiori instance from a site directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let (config, config_path) = config::SiteConfig::discover(&base_dir)?;
        Ok(Self::with_config(base_dir, config, config_path))
    }

    /// Resolve the site directories for an already loaded configuration
    pub fn with_config(
        base_dir: PathBuf,
        config: config::SiteConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        let source_dir = base_dir.join(&config.paths.source);
        let posts_dir = source_dir.join(&config.paths.posts);
        let output_dir = base_dir.join(&config.paths.output);
        let theme_dir = base_dir.join("themes").join(&config.theme.name);

        Self {
            config,
            config_path,
            base_dir,
            source_dir,
            posts_dir,
            output_dir,
            theme_dir,
        }
    }

    /// Load every published post, newest first
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let renderer = MarkdownRenderer::from_config(&self.config.syntax);
        let loader = PostLoader::new(&self.config, &renderer);
        let mut posts = loader.load_posts(&self.posts_dir)?;
        collection::sort_by_date(&mut posts);
        Ok(posts)
    }

    /// Build the static site, returning the number of pages written
    pub fn build(&self) -> Result<usize> {
        commands::build::run(self)
    }

    /// Remove the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a new post, returning its path
    pub fn new_post(&self, title: &str) -> Result<PathBuf> {
        commands::new::run(self, title)
    }
}
