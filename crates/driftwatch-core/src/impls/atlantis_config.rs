//! AtlantisRepoConfigParser - atlantis.yaml (repo config) の読み込み

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::DEFAULT_WORKSPACE;
use crate::domain::WorkItemSet;
use crate::ports::{ConfigParser, ParseError};

#[derive(Debug, Default, Deserialize)]
struct RepoConfig {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    #[serde(default)]
    dir: String,
    #[serde(default)]
    workspace: Option<String>,
}

/// `./a/b/` -> `a/b`, `` and `./` -> `.`
pub(crate) fn normalize_dir(dir: &str) -> String {
    let mut d = dir.trim();
    while let Some(rest) = d.strip_prefix("./") {
        d = rest;
    }
    let d = d.trim_end_matches('/');
    if d.is_empty() {
        ".".to_string()
    } else {
        d.to_string()
    }
}

pub(crate) fn parse_repo_config(path: &str, yaml: &str) -> Result<WorkItemSet, ParseError> {
    let config: Option<RepoConfig> =
        serde_yaml::from_str(yaml).map_err(|source| ParseError::Yaml {
            path: path.to_string(),
            source,
        })?;

    Ok(config
        .unwrap_or_default()
        .projects
        .into_iter()
        .map(|p| {
            let workspace = p
                .workspace
                .filter(|w| !w.is_empty())
                .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());
            (normalize_dir(&p.dir), workspace)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AtlantisRepoConfigParser;

#[async_trait]
impl ConfigParser for AtlantisRepoConfigParser {
    async fn parse(&self, config_file: &str, root: &Path) -> Result<WorkItemSet, ParseError> {
        let path = root.join(config_file);
        let display = path.display().to_string();
        let yaml = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ParseError::Read {
                path: display.clone(),
                source,
            })?;
        parse_repo_config(&display, &yaml)
    }
}
