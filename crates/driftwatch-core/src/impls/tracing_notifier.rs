//! TracingNotifier - 通知を構造化ログとして出すだけの sink

use async_trait::async_trait;
use tracing::{error, info};

use crate::domain::RunSummary;
use crate::ports::{Notifier, NotifyError, QueryError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn plan_drift(
        &self,
        dir: &str,
        workspace: &str,
        summary: &str,
    ) -> Result<(), NotifyError> {
        info!(dir, workspace, summary, "Plan has drifted");
        Ok(())
    }

    async fn extra_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        info!(dir, workspace, "Extra workspace in remote");
        Ok(())
    }

    async fn missing_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        info!(dir, workspace, "Missing workspace in remote");
        Ok(())
    }

    async fn workspace_drift_summary(&self, summary: RunSummary) -> Result<(), NotifyError> {
        info!(
            drifted = summary.drifted,
            undrifted = summary.undrifted,
            total = summary.total,
            "Workspace drift summary"
        );
        Ok(())
    }

    async fn temporary_error(
        &self,
        dir: &str,
        workspace: &str,
        err: &QueryError,
    ) -> Result<(), NotifyError> {
        error!(dir, workspace, error = %err, "Unknown error in remote");
        Ok(())
    }
}
