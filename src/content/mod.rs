//! Content module - front-matter, markdown rendering, TOC and the Post model

mod error;
mod frontmatter;
pub mod loader;
mod markdown;
mod post;
pub mod toc;

pub use error::ContentError;
pub use frontmatter::{Document, FrontMatter, DEFAULT_EXCERPT_SEPARATOR};
pub use loader::PostLoader;
pub use markdown::{
    repair_markdown, HighlightedCode, Highlighter, MarkdownRenderer, Rendered,
    SyntectHighlighter,
};
pub use post::{auto_excerpt, derive_slug, expand_permalink, reading_time, Post};
pub use toc::{TocEntry, TocNode};
