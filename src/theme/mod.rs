//! Theme module - template language, page templates and theme assets

mod engine;
mod loader;
mod template;
mod value;

pub use engine::{PageKind, TemplateEngine};
pub use loader::{default_template, ThemeLoader};
pub use template::Template;
pub use value::{Context, Resolve, Scope, Value};
