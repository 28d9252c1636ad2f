//! TerraformCli - `terraform` バイナリを tokio::process で呼び出す

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::ports::{TerraformError, TerraformOps};

#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: OsString,
}

impl Default for TerraformCli {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl TerraformCli {
    pub fn new(binary: impl Into<OsString>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, cwd: PathBuf, args: &[&str]) -> Result<Output, TerraformError> {
        debug!(cwd = %cwd.display(), ?args, "Running terraform");
        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&cwd)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(TerraformError::Command {
                command: args.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Parses `terraform workspace list` output. The current workspace carries a `*` marker.
pub(crate) fn parse_workspace_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl TerraformOps for TerraformCli {
    async fn init(&self, root: &Path, directory: &str) -> Result<(), TerraformError> {
        self.run(root.join(directory), &["init", "-input=false", "-no-color"])
            .await
            .map(|_| ())
    }

    async fn list_workspaces(
        &self,
        root: &Path,
        directory: &str,
    ) -> Result<Vec<String>, TerraformError> {
        let output = self.run(root.join(directory), &["workspace", "list"]).await?;
        Ok(parse_workspace_list(&String::from_utf8_lossy(&output.stdout)))
    }
}
