//! ConfigParser / ConfigGenerator ports - repo config と WorkItemSet の変換

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::WorkItemSet;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid repo config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("error walking {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },

    #[error("error reading tf file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid backend pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("error marshalling to YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("error writing repo config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads `config_file` under `root` into the declared workspace set.
///
/// An empty set is not an error; the caller decides how loud to be about it.
#[async_trait]
pub trait ConfigParser: Send + Sync {
    async fn parse(&self, config_file: &str, root: &Path) -> Result<WorkItemSet, ParseError>;
}

/// Writes `config_file` under `root` derived from the repository contents.
#[async_trait]
pub trait ConfigGenerator: Send + Sync {
    async fn generate(&self, config_file: &str, root: &Path) -> Result<(), GenerateError>;
}
