//! Clean the output directory

use anyhow::{bail, Context, Result};
use std::fs;

use crate::Shiori;

/// Remove the output directory; a missing directory is not an error
pub fn run(shiori: &Shiori) -> Result<()> {
    let output_dir = &shiori.output_dir;
    if *output_dir == shiori.base_dir || shiori.source_dir.starts_with(output_dir) {
        bail!(
            "Refusing to delete {}: it contains the site sources",
            output_dir.display()
        );
    }

    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("Failed to delete {}", output_dir.display()))?;
        tracing::info!("Deleted: {:?}", output_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_output() {
        let dir = TempDir::new().unwrap();
        let shiori = Shiori::new(dir.path()).unwrap();
        fs::create_dir_all(shiori.output_dir.join("page/2")).unwrap();
        fs::write(shiori.output_dir.join("index.html"), "x").unwrap();

        run(&shiori).unwrap();
        assert!(!shiori.output_dir.exists());

        // Cleaning twice is fine
        run(&shiori).unwrap();
    }

    #[test]
    fn test_clean_refuses_site_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("shiori.config.yml"), "paths:\n  output: .\n").unwrap();
        let shiori = Shiori::new(dir.path()).unwrap();

        assert!(run(&shiori).is_err());
        assert!(dir.path().join("shiori.config.yml").exists());
    }
}
