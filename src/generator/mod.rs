//! Generator module - turns loaded posts into HTML files under the output directory

use anyhow::{Context as _, Result};
use chrono::Month;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::collection::{Collections, LabelGroups};
use crate::content::{toc, Post};
use crate::helpers::{index_file, label_segment, label_url, page_url};
use crate::theme::{Context, PageKind, TemplateEngine, ThemeLoader, Value};
use crate::Shiori;

/// Static site generator
pub struct Generator {
    shiori: Shiori,
    engine: TemplateEngine,
    theme_loader: ThemeLoader,
    base: Context,
}

/// Template values of every post, built once per generation
struct PostValues<'p> {
    by_source: HashMap<&'p Path, Value>,
}

impl<'p> PostValues<'p> {
    fn new(posts: &'p [Post], categories_dir: &str, tags_dir: &str) -> Self {
        let by_source = posts
            .iter()
            .map(|post| {
                (
                    post.source_path.as_path(),
                    post_value(post, categories_dir, tags_dir),
                )
            })
            .collect();
        Self { by_source }
    }

    fn get(&self, post: &Post) -> Value {
        self.by_source
            .get(post.source_path.as_path())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn list<'a, I>(&self, posts: I) -> Value
    where
        I: IntoIterator<Item = &'a Post>,
    {
        Value::Array(posts.into_iter().map(|p| self.get(p)).collect())
    }
}

/// A post as templates see it: the serialized Post plus its links
fn post_value(post: &Post, categories_dir: &str, tags_dir: &str) -> Value {
    let mut value = Value::from_serialize(post);
    if let Value::Object(map) = &mut value {
        map.insert("permalink".to_string(), page_url(&post.url).into());
        map.insert(
            "category_links".to_string(),
            label_links(categories_dir, &post.categories),
        );
        map.insert("tag_links".to_string(), label_links(tags_dir, &post.tags));
    }
    value
}

fn label_links(dir: &str, labels: &[String]) -> Value {
    labels
        .iter()
        .map(|name| {
            let mut link = IndexMap::new();
            link.insert("name".to_string(), Value::from(name.as_str()));
            link.insert("url".to_string(), Value::from(label_url(dir, name)));
            Value::Object(link)
        })
        .collect::<Vec<_>>()
        .into()
}

/// Short reference used for previous/next links
fn nav_post(post: &Post) -> Value {
    let mut nav = IndexMap::new();
    nav.insert("title".to_string(), Value::from(post.title.as_str()));
    nav.insert("url".to_string(), Value::from(post.url.as_str()));
    nav.insert("permalink".to_string(), Value::from(page_url(&post.url)));
    Value::Object(nav)
}

/// Site path of a home listing page
fn listing_path(pagination_path: &str, number: usize) -> String {
    if number <= 1 {
        String::new()
    } else {
        format!("{}/{}", pagination_path.trim_matches('/'), number)
    }
}

fn pagination_value(pagination_path: &str, current: usize, total: usize) -> Value {
    let mut pagination = IndexMap::new();
    pagination.insert("current".to_string(), Value::from(current));
    pagination.insert("total".to_string(), Value::from(total));
    pagination.insert("is_paginated".to_string(), Value::from(total > 1));
    pagination.insert("has_prev".to_string(), Value::from(current > 1));
    pagination.insert("has_next".to_string(), Value::from(current < total));
    let prev_url = if current > 1 {
        page_url(&listing_path(pagination_path, current - 1))
    } else {
        String::new()
    };
    let next_url = if current < total {
        page_url(&listing_path(pagination_path, current + 1))
    } else {
        String::new()
    };
    pagination.insert("prev_url".to_string(), Value::from(prev_url));
    pagination.insert("next_url".to_string(), Value::from(next_url));
    Value::Object(pagination)
}

impl Generator {
    /// Create a new generator, compiling the theme templates
    pub fn new(shiori: &Shiori) -> Result<Self> {
        let config = &shiori.config;
        let theme_loader = ThemeLoader::new(&shiori.theme_dir, &config.theme.colors);
        let engine = TemplateEngine::load(&theme_loader, &config.posts.date_format)?;

        let mut base = Context::new();
        base.set_object("site", &config.site);
        base.set_object("config", config);
        base.set_string("styles", theme_loader.styles()?);

        let mut nav = IndexMap::new();
        nav.insert("home".to_string(), Value::from("/"));
        nav.insert(
            "archives".to_string(),
            Value::from(page_url(&config.paths.archives)),
        );
        nav.insert(
            "categories".to_string(),
            Value::from(page_url(&config.paths.categories)),
        );
        nav.insert("tags".to_string(), Value::from(page_url(&config.paths.tags)));
        base.set("nav", Value::Object(nav));

        Ok(Self {
            shiori: shiori.clone(),
            engine,
            theme_loader,
            base,
        })
    }

    /// Context shared by every page of one kind
    fn base_context(&self, kind: PageKind) -> Context {
        let mut context = self.base.clone();
        context.set_string("body_class", kind.body_class());
        context
    }

    /// Generate the entire site from date-sorted posts, returning the page count
    pub fn generate(&self, posts: &[Post]) -> Result<usize> {
        let output_dir = &self.shiori.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let site_assets = self.shiori.source_dir.join(&self.shiori.config.paths.assets);
        self.theme_loader.copy_assets(&site_assets, output_dir)?;

        let paths = &self.shiori.config.paths;
        let collections = Collections::build(posts, self.shiori.config.pagination.posts_per_page);
        let values = PostValues::new(posts, &paths.categories, &paths.tags);

        let mut count = 0;
        count += self.generate_posts(&collections, &values)?;
        count += self.generate_index(&collections, &values)?;
        count += self.generate_label_pages(PageKind::Category, &collections.categories, &values)?;
        count += self.generate_label_pages(PageKind::Tag, &collections.tags, &values)?;
        count += self.generate_archive(&collections, &values)?;
        count += self.generate_label_index(PageKind::Categories, &collections.categories)?;
        count += self.generate_label_index(PageKind::Tags, &collections.tags)?;

        Ok(count)
    }

    /// Generate one page per post
    fn generate_posts(&self, collections: &Collections, values: &PostValues) -> Result<usize> {
        let posts = collections.posts;
        for (i, post) in posts.iter().enumerate() {
            let mut context = self.base_context(PageKind::Post);
            context.set("page", values.get(post));

            if let Some(entries) = &post.table_of_contents {
                let nodes = toc::nest(entries);
                context.set_nested("page.toc_html", toc::render_toc_html(&nodes));
                context.set_nested("page.toc", Value::from_serialize(&nodes));
            }

            // Posts are newest first: the previous post is the older one
            if let Some(prev) = posts.get(i + 1) {
                context.set("prev_post", nav_post(prev));
            }
            if let Some(next) = i.checked_sub(1).and_then(|j| posts.get(j)) {
                context.set("next_post", nav_post(next));
            }

            let html = self.engine.render(PageKind::Post, &context);
            self.write_page(&post.url, &html)
                .with_context(|| format!("Failed to generate {}", post.source_path.display()))?;
        }
        Ok(posts.len())
    }

    /// Generate the paginated home listing; an empty blog still gets `/`
    fn generate_index(&self, collections: &Collections, values: &PostValues) -> Result<usize> {
        let pagination_path = &self.shiori.config.pagination.path;
        let total = collections.pages.len().max(1);

        for number in 1..=total {
            let posts = collections
                .pages
                .get(number - 1)
                .map(|page| page.posts)
                .unwrap_or(&[]);

            let mut context = self.base_context(PageKind::Index);
            context.set("posts", values.list(posts));
            context.set("pagination", pagination_value(pagination_path, number, total));

            let html = self.engine.render(PageKind::Index, &context);
            self.write_page(&listing_path(pagination_path, number), &html)?;
        }
        Ok(total)
    }

    /// Generate `<dir>/<label>/` for every category or tag
    fn generate_label_pages(
        &self,
        kind: PageKind,
        groups: &LabelGroups,
        values: &PostValues,
    ) -> Result<usize> {
        let (variable, dir) = match kind {
            PageKind::Category => ("category", &self.shiori.config.paths.categories),
            _ => ("tag", &self.shiori.config.paths.tags),
        };

        for (label, posts) in groups {
            let mut context = self.base_context(kind);
            context.set_string(variable, label);
            context.set("posts", values.list(posts.iter().copied()));

            let html = self.engine.render(kind, &context);
            let path = format!("{}/{}", dir.trim_matches('/'), label_segment(label));
            self.write_page(&path, &html)?;
        }
        Ok(groups.len())
    }

    /// Generate the year/month archive page
    fn generate_archive(&self, collections: &Collections, values: &PostValues) -> Result<usize> {
        let archive: Vec<Value> = collections
            .archive
            .iter()
            .map(|(year, months)| {
                let months: Vec<Value> = months
                    .iter()
                    .map(|(month, posts)| {
                        let name = u8::try_from(*month)
                            .ok()
                            .and_then(|m| Month::try_from(m).ok())
                            .map(|m| m.name().to_string())
                            .unwrap_or_else(|| month.to_string());
                        let mut entry = IndexMap::new();
                        entry.insert("month".to_string(), Value::Number(f64::from(*month)));
                        entry.insert("name".to_string(), Value::from(name));
                        entry.insert("posts".to_string(), values.list(posts.iter().copied()));
                        Value::Object(entry)
                    })
                    .collect();
                let mut entry = IndexMap::new();
                entry.insert("year".to_string(), Value::from(*year));
                entry.insert("months".to_string(), Value::from(months));
                Value::Object(entry)
            })
            .collect();

        let mut context = self.base_context(PageKind::Archive);
        context.set("archive", archive);
        context.set("posts", values.list(collections.posts));

        let html = self.engine.render(PageKind::Archive, &context);
        self.write_page(&self.shiori.config.paths.archives, &html)?;
        Ok(1)
    }

    /// Generate the list of all categories or tags with their post counts
    fn generate_label_index(&self, kind: PageKind, groups: &LabelGroups) -> Result<usize> {
        let (variable, dir) = match kind {
            PageKind::Categories => ("categories", &self.shiori.config.paths.categories),
            _ => ("tags", &self.shiori.config.paths.tags),
        };

        let labels: Vec<Value> = groups
            .iter()
            .map(|(name, posts)| {
                let mut entry = IndexMap::new();
                entry.insert("name".to_string(), Value::from(*name));
                entry.insert("url".to_string(), Value::from(label_url(dir, name)));
                entry.insert("count".to_string(), Value::from(posts.len()));
                Value::Object(entry)
            })
            .collect();

        let mut context = self.base_context(kind);
        context.set(variable, labels);

        let html = self.engine.render(kind, &context);
        self.write_page(dir, &html)?;
        Ok(1)
    }

    /// Write `<output>/<path>/index.html`
    fn write_page(&self, path: &str, html: &str) -> Result<()> {
        let output_path = index_file(&self.shiori.output_dir, path);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> (TempDir, Shiori) {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("source/_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            dir.path().join("shiori.config.yml"),
            "site:\n  title: Test Blog\npagination:\n  posts_per_page: 1\n",
        )
        .unwrap();
        fs::write(
            posts.join("2024-03-05-hello-world.md"),
            "---\ntitle: Hello\ndate: 2024-03-05 10:00:00\ncategories: [Notes]\ntags: [rust, C/C++]\n---\n## Intro\n\nFirst post.\n",
        )
        .unwrap();
        fs::write(
            posts.join("2024-04-01-second.md"),
            "---\ntitle: Second\ndate: 2024-04-01 10:00:00\ntags: rust\n---\nSecond post.\n",
        )
        .unwrap();
        let shiori = Shiori::new(dir.path()).unwrap();
        (dir, shiori)
    }

    fn generate(shiori: &Shiori) -> usize {
        let posts = shiori.load_posts().unwrap();
        Generator::new(shiori).unwrap().generate(&posts).unwrap()
    }

    fn read(shiori: &Shiori, path: &str) -> String {
        fs::read_to_string(index_file(&shiori.output_dir, path)).unwrap()
    }

    #[test]
    fn test_generates_every_page_kind() {
        let (_dir, shiori) = site();
        // 2 posts, 2 home pages, 1 category, 2 tags, archive, 2 label indexes
        assert_eq!(generate(&shiori), 10);

        let post = read(&shiori, "2024/03/05/hello-world");
        assert!(post.contains("<title>Hello - Test Blog</title>"));
        assert!(post.contains("id=\"intro\""));
        assert!(post.contains("class=\"toc\""));
        assert!(post.contains("href=\"/tags/C-C%2B%2B/\""));
        assert!(post.contains("class=\"post-page\""));

        assert!(read(&shiori, "").contains("Second"));
        assert!(read(&shiori, "page/2").contains("Hello"));
        assert!(read(&shiori, "categories/Notes").contains("Category: Notes"));
        assert!(read(&shiori, "tags/C-C++").contains("Hello"));
        assert!(read(&shiori, "tags").contains("(2)"));
        assert!(read(&shiori, "archives").contains("March"));
    }

    #[test]
    fn test_prev_next_links() {
        let (_dir, shiori) = site();
        generate(&shiori);

        let newer = read(&shiori, "2024/04/01/second");
        assert!(newer.contains("href=\"/2024/03/05/hello-world/\" class=\"prev\""));
        assert!(!newer.contains("class=\"next\""));

        let older = read(&shiori, "2024/03/05/hello-world");
        assert!(older.contains("href=\"/2024/04/01/second/\" class=\"next\""));
    }

    #[test]
    fn test_pagination_links() {
        let (_dir, shiori) = site();
        generate(&shiori);

        let first = read(&shiori, "");
        assert!(first.contains("href=\"/page/2/\" class=\"next\""));
        assert!(first.contains("Page 1 of 2"));

        let second = read(&shiori, "page/2");
        assert!(second.contains("href=\"/\" class=\"prev\""));
    }

    #[test]
    fn test_empty_blog_gets_home_page() {
        let dir = TempDir::new().unwrap();
        let shiori = Shiori::new(dir.path()).unwrap();
        // home, archive, categories index, tags index
        assert_eq!(generate(&shiori), 4);

        let home = read(&shiori, "");
        assert!(home.contains("Shiori Blog"));
        assert!(!home.contains("class=\"pagination\""));
    }

    #[test]
    fn test_dot_labels_and_slugs_stay_inside_output() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("source/_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join("2024-03-05-dots.md"),
            "---\ntitle: Dots\ndate: 2024-03-05\nslug: ../../../escaped\ntags: [\"..\", \".\"]\n---\nx\n",
        )
        .unwrap();
        let shiori = Shiori::new(dir.path()).unwrap();
        generate(&shiori);

        assert!(read(&shiori, "").contains("class=\"home-page\""));
        assert!(read(&shiori, "tags").contains("class=\"tags-page\""));
        assert!(read(&shiori, "tags/--").contains("class=\"tag-page\""));
        assert!(read(&shiori, "tags/-").contains("class=\"tag-page\""));
        assert!(read(&shiori, "2024/03/05/escaped").contains("<title>Dots"));
        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("source/escaped").exists());
    }

    #[test]
    fn test_pagination_value() {
        let value = pagination_value("page", 2, 3);
        assert_eq!(value.lookup(&["prev_url"]), Some(&Value::from("/")));
        assert_eq!(value.lookup(&["next_url"]), Some(&Value::from("/page/3/")));
        assert_eq!(value.lookup(&["is_paginated"]), Some(&Value::from(true)));
    }
}
