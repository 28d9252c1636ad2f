//! TfBackendConfigGenerator - remote backend を持つ root module から repo config を生成
//!
//! # フロー
//! 1. root 以下の `*.tf` を列挙（`.terraform` / `.git` は除外）
//! 2. `backend "s3" | "gcs" | "azurerm"` を含むファイルのディレクトリを root module とみなす
//! 3. ソート済みの project 一覧を YAML で書き出す

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::ports::{ConfigGenerator, GenerateError};

const BACKEND_PATTERN: &str = r#"backend\s+"(s3|gcs|azurerm)""#;
const WHEN_MODIFIED: &str = "**/*.tf*";
const SKIPPED_DIRS: &[&str] = &[".terraform", ".git"];

#[derive(Debug, Serialize)]
struct GeneratedConfig {
    version: u32,
    parallel_plan: bool,
    projects: Vec<GeneratedProject>,
}

#[derive(Debug, Serialize)]
struct GeneratedProject {
    name: String,
    dir: String,
    autoplan: Autoplan,
}

#[derive(Debug, Serialize)]
struct Autoplan {
    when_modified: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TfBackendConfigGenerator {
    pattern: Regex,
}

impl TfBackendConfigGenerator {
    pub fn new() -> Result<Self, GenerateError> {
        Ok(Self {
            pattern: Regex::new(BACKEND_PATTERN)?,
        })
    }
}

fn relative_dir(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.is_empty() { ".".to_string() } else { s }
}

/// Directories (relative to `root`) holding a `.tf` file that declares a remote backend.
pub(crate) fn find_root_modules(
    root: &Path,
    pattern: &Regex,
) -> Result<BTreeSet<String>, GenerateError> {
    let mut dirs = BTreeSet::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        !(e.file_type().is_dir()
            && e.file_name()
                .to_str()
                .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
    });

    for entry in walker {
        let entry = entry.map_err(|source| GenerateError::Walk {
            path: root.display().to_string(),
            source,
        })?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|ext| ext != "tf") {
            continue;
        }
        let content = std::fs::read_to_string(entry.path()).map_err(|source| GenerateError::Read {
            path: entry.path().display().to_string(),
            source,
        })?;
        if pattern.is_match(&content)
            && let Some(parent) = entry.path().parent()
        {
            dirs.insert(relative_dir(root, parent));
        }
    }
    Ok(dirs)
}

pub(crate) fn render_config(dirs: &BTreeSet<String>) -> Result<String, GenerateError> {
    let config = GeneratedConfig {
        version: 3,
        parallel_plan: true,
        projects: dirs
            .iter()
            .map(|dir| GeneratedProject {
                name: dir.clone(),
                dir: dir.clone(),
                autoplan: Autoplan {
                    when_modified: vec![WHEN_MODIFIED.to_string()],
                },
            })
            .collect(),
    };
    Ok(serde_yaml::to_string(&config)?)
}

#[async_trait]
impl ConfigGenerator for TfBackendConfigGenerator {
    async fn generate(&self, config_file: &str, root: &Path) -> Result<(), GenerateError> {
        let walk_root: PathBuf = root.to_path_buf();
        let pattern = self.pattern.clone();
        let dirs = tokio::task::spawn_blocking(move || find_root_modules(&walk_root, &pattern))
            .await
            .map_err(|e| GenerateError::Read {
                path: root.display().to_string(),
                source: std::io::Error::other(e),
            })??;

        let yaml = render_config(&dirs)?;
        debug!(config = %yaml, "Generated repo config");

        let path = root.join(config_file);
        tokio::fs::write(&path, yaml)
            .await
            .map_err(|source| GenerateError::Write {
                path: path.display().to_string(),
                source,
            })?;
        info!(projects = dirs.len(), path = %path.display(), "Repo config generated");
        Ok(())
    }
}
