//! Checkout port - tracked repository の取得

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git {command} exited with {status}: {stderr}")]
    Git {
        command: String,
        status: String,
        stderr: String,
    },
}

/// A local working copy of the tracked repository.
///
/// Clones into a temporary directory own it and remove it on `close`/drop.
#[derive(Debug)]
pub struct CheckoutDir {
    path: PathBuf,
    tempdir: Option<TempDir>,
}

impl CheckoutDir {
    /// An existing directory that must not be removed afterwards.
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tempdir: None,
        }
    }

    /// `path` lives inside `tempdir`.
    pub fn temporary(tempdir: TempDir, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tempdir: Some(tempdir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the working copy if this checkout owns it.
    pub fn close(self) -> std::io::Result<()> {
        match self.tempdir {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

#[async_trait]
pub trait Checkout: Send + Sync {
    async fn checkout(&self, repo: &str, reference: &str) -> Result<CheckoutDir, CheckoutError>;
}
