//! Template engine - one compiled template per page kind

use anyhow::Result;
use std::collections::HashMap;

use super::loader::{default_template, ThemeLoader};
use super::template::Template;
use super::value::Context;

/// Page kinds, each rendered with its own template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Post,
    Index,
    Category,
    Tag,
    Archive,
    Categories,
    Tags,
}

impl PageKind {
    pub const ALL: [PageKind; 7] = [
        PageKind::Post,
        PageKind::Index,
        PageKind::Category,
        PageKind::Tag,
        PageKind::Archive,
        PageKind::Categories,
        PageKind::Tags,
    ];

    /// Get the template name for this page kind
    pub fn template_name(&self) -> &'static str {
        match self {
            PageKind::Post => "post",
            PageKind::Index => "index",
            PageKind::Category => "category",
            PageKind::Tag => "tag",
            PageKind::Archive => "archive",
            PageKind::Categories => "categories",
            PageKind::Tags => "tags",
        }
    }

    /// `body_class` exposed to the template
    pub fn body_class(&self) -> &'static str {
        match self {
            PageKind::Post => "post-page",
            PageKind::Index => "home-page",
            PageKind::Category => "category-page",
            PageKind::Tag => "tag-page",
            PageKind::Archive => "archive-page",
            PageKind::Categories => "categories-page",
            PageKind::Tags => "tags-page",
        }
    }
}

/// Renders page contexts through the theme's templates
pub struct TemplateEngine {
    templates: HashMap<PageKind, Template>,
    date_format: String,
}

impl TemplateEngine {
    /// Compile every page template from the theme, falling back to defaults
    pub fn load(theme: &ThemeLoader, date_format: &str) -> Result<Self> {
        let mut templates = HashMap::new();
        for kind in PageKind::ALL {
            let source = theme.template_source(kind)?;
            templates.insert(kind, Template::parse(&source));
        }
        Ok(Self {
            templates,
            date_format: date_format.to_string(),
        })
    }

    /// Engine using only the embedded templates
    pub fn with_defaults(date_format: &str) -> Self {
        let templates = PageKind::ALL
            .into_iter()
            .map(|kind| (kind, Template::parse(default_template(kind))))
            .collect();
        Self {
            templates,
            date_format: date_format.to_string(),
        }
    }

    /// Replace the template of one page kind
    pub fn set_template(&mut self, kind: PageKind, source: &str) {
        self.templates.insert(kind, Template::parse(source));
    }

    /// Render a page; unresolved variables render as empty text
    pub fn render(&self, kind: PageKind, context: &Context) -> String {
        match self.templates.get(&kind) {
            Some(template) => template.render(context, &self.date_format),
            None => Template::parse(default_template(kind)).render(context, &self.date_format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_names_are_unique() {
        let mut names: Vec<_> = PageKind::ALL.iter().map(|k| k.template_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PageKind::ALL.len());
    }

    #[test]
    fn test_default_templates_render() {
        let engine = TemplateEngine::with_defaults("YYYY-MM-DD");
        let mut ctx = Context::new();
        ctx.set_object("site", &serde_json::json!({"title": "My Blog", "language": "en"}));
        ctx.set_string("body_class", PageKind::Index.body_class());

        for kind in PageKind::ALL {
            let html = engine.render(kind, &ctx);
            assert!(html.contains("My Blog"), "{:?} is missing the site title", kind);
            assert!(!html.contains("{{"), "{:?} left an unrendered variable", kind);
            assert!(!html.contains("{%"), "{:?} left an unmatched tag", kind);
        }
    }

    #[test]
    fn test_set_template() {
        let mut engine = TemplateEngine::with_defaults("YYYY/MM/DD");
        engine.set_template(PageKind::Tag, "#{{tag}} {{page.date}}");
        let mut ctx = Context::new();
        ctx.set_string("tag", "rust");
        ctx.set_object("page", &serde_json::json!({"date": "2024-01-02 03:04:05"}));
        assert_eq!(engine.render(PageKind::Tag, &ctx), "#rust 2024/01/02");
    }
}
