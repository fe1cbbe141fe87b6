//! Create a new post

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::fs;
use std::path::PathBuf;

use crate::Shiori;

/// Write `<posts>/YYYY-MM-DD-<slug>.md` with a front-matter scaffold
pub fn run(shiori: &Shiori, title: &str) -> Result<PathBuf> {
    let title = title.trim();
    if title.is_empty() {
        bail!("Post title must not be empty");
    }

    let now = Local::now();
    let mut slug = slug::slugify(title);
    if slug.is_empty() {
        slug = "post".to_string();
    }

    fs::create_dir_all(&shiori.posts_dir)
        .with_context(|| format!("Failed to create {}", shiori.posts_dir.display()))?;

    let file_path = shiori
        .posts_dir
        .join(format!("{}-{}.md", now.format("%Y-%m-%d"), slug));
    if file_path.exists() {
        bail!("File already exists: {}", file_path.display());
    }

    // A JSON string is a valid double-quoted YAML scalar
    let content = format!(
        "---\ntitle: {}\ndate: {}\ncategories: []\ntags: []\n---\n\n",
        serde_json::to_string(title)?,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    fs::write(&file_path, content)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
