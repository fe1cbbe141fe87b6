//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::CONFIG_FILES;
pub use site::{
    PaginationConfig, PathsConfig, PostsConfig, PreviewConfig, SiteInfo, SyntaxConfig,
    ThemeConfig,
};
