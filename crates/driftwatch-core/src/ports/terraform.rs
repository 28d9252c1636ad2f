//! TerraformOps port - init / workspace list

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("failed to spawn terraform: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("terraform {command} exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
}

/// `directory` is relative to the checkout `root`.
#[async_trait]
pub trait TerraformOps: Send + Sync {
    async fn init(&self, root: &Path, directory: &str) -> Result<(), TerraformError>;

    /// Remote workspaces in the order the backend reports them.
    async fn list_workspaces(&self, root: &Path, directory: &str)
    -> Result<Vec<String>, TerraformError>;
}
