//! Build the static site, optionally rebuilding on file changes

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::new_debouncer;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::generator::Generator;
use crate::Shiori;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Clean the output directory and regenerate every page
pub fn run(shiori: &Shiori) -> Result<usize> {
    let start = Instant::now();

    super::clean::run(shiori)?;

    let posts = shiori.load_posts()?;
    tracing::info!("Loaded {} posts", posts.len());

    let generator = Generator::new(shiori)?;
    let pages = generator.generate(&posts)?;

    tracing::info!(
        "Generated {} pages in {:.2}s",
        pages,
        start.elapsed().as_secs_f64()
    );
    Ok(pages)
}

/// Reload the configuration from disk and build
fn rebuild(base_dir: &Path) -> Result<Shiori> {
    let shiori = Shiori::new(base_dir)?;
    run(&shiori)?;
    Ok(shiori)
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name == ".git" || name == ".DS_Store" || name == "node_modules"
    }) || path.to_string_lossy().ends_with('~')
}

/// Watch sources, theme and config, rebuilding after each burst of changes
///
/// Blocks until the watcher shuts down. Rebuilds run one at a time on the
/// calling thread; changes seen while a rebuild runs are folded into the
/// next one. `on_rebuild` runs after every successful rebuild.
pub fn watch<F>(shiori: &Shiori, mut on_rebuild: F) -> Result<()>
where
    F: FnMut(&Shiori),
{
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx).context("Failed to start file watcher")?;

    let mut watched = vec![
        (shiori.source_dir.clone(), RecursiveMode::Recursive),
        (shiori.theme_dir.clone(), RecursiveMode::Recursive),
    ];
    if let Some(config_path) = &shiori.config_path {
        watched.push((config_path.clone(), RecursiveMode::NonRecursive));
    }
    for (path, mode) in &watched {
        if !path.exists() {
            continue;
        }
        debouncer
            .watcher()
            .watch(path, *mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        tracing::debug!("Watching: {:?}", path);
    }

    let output_dir = shiori.output_dir.clone();
    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    for result in rx {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        let changed: Vec<_> = events
            .iter()
            .filter(|e| !e.path.starts_with(&output_dir) && !is_ignored(&e.path))
            .collect();
        if changed.is_empty() {
            continue;
        }
        for event in &changed {
            tracing::info!("File changed: {}", event.path.display());
        }

        match rebuild(&shiori.base_dir) {
            Ok(current) => on_rebuild(&current),
            Err(e) => tracing::error!("Build failed: {:#}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_build_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("source/_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join("2024-01-02-first.md"),
            "---\ntitle: First\ndate: 2024-01-02\n---\nHi\n",
        )
        .unwrap();

        let shiori = Shiori::new(dir.path()).unwrap();
        let first = run(&shiori).unwrap();

        // Leftovers from an earlier build are removed
        fs::write(shiori.output_dir.join("stale.html"), "old").unwrap();
        let second = run(&shiori).unwrap();

        assert_eq!(first, second);
        assert!(!shiori.output_dir.join("stale.html").exists());
        assert!(shiori.output_dir.join("2024/01/02/first/index.html").exists());
    }

    #[test]
    fn test_malformed_front_matter_aborts_build() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("source/_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("broken.md"), "---\ntitle: [oops\n---\nbody\n").unwrap();

        let shiori = Shiori::new(dir.path()).unwrap();
        let err = run(&shiori).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.md"));
    }

    #[test]
    fn test_ignored_paths() {
        assert!(is_ignored(Path::new("/site/.git/index")));
        assert!(is_ignored(Path::new("/site/source/_posts/a.md~")));
        assert!(!is_ignored(Path::new("/site/source/_posts/a.md")));
    }
}
