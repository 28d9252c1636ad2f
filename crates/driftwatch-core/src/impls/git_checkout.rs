//! GitCheckout / LocalCheckout - tracked repository の取得
//!
//! `GitCheckout` は `git clone --depth 1` で一時ディレクトリへ shallow clone する。
//! token はログやエラーに出さない（stderr から伏せ字にする）。

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::ports::{Checkout, CheckoutDir, CheckoutError};

const DEFAULT_GIT_HOST: &str = "github.com";
const REDACTED: &str = "***";

#[derive(Debug, Clone)]
pub struct GitCheckout {
    host: String,
    token: Option<String>,
}

impl GitCheckout {
    pub fn new(token: Option<String>) -> Self {
        Self {
            host: DEFAULT_GIT_HOST.to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub(crate) fn clone_url(&self, repo: &str) -> String {
        match &self.token {
            Some(token) => format!("https://x-access-token:{token}@{}/{repo}.git", self.host),
            None => format!("https://{}/{repo}.git", self.host),
        }
    }

    pub(crate) fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) => text.replace(token.as_str(), REDACTED),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl Checkout for GitCheckout {
    async fn checkout(&self, repo: &str, reference: &str) -> Result<CheckoutDir, CheckoutError> {
        let tempdir = tempfile::Builder::new().prefix("driftwatch-").tempdir()?;
        let target = tempdir.path().join("repo");

        debug!(repo, reference, path = %target.display(), "Cloning repository");
        let output = Command::new("git")
            .arg("clone")
            .arg("--quiet")
            .arg("--depth")
            .arg("1")
            .arg("--branch")
            .arg(reference)
            .arg(self.clone_url(repo))
            .arg(&target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CheckoutError::Git {
                command: "clone".to_string(),
                status: output.status.to_string(),
                stderr: self.redact(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }
        Ok(CheckoutDir::temporary(tempdir, target))
    }
}

/// Uses an already checked-out tree. `repo` and `reference` are ignored.
#[derive(Debug, Clone)]
pub struct LocalCheckout {
    path: PathBuf,
}

impl LocalCheckout {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Checkout for LocalCheckout {
    async fn checkout(&self, _repo: &str, _reference: &str) -> Result<CheckoutDir, CheckoutError> {
        if !tokio::fs::metadata(&self.path).await?.is_dir() {
            return Err(CheckoutError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", self.path.display()),
            )));
        }
        Ok(CheckoutDir::existing(&self.path))
    }
}
