//! Errors raised while reading and parsing source content

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid front-matter in {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
