//! Notifier port - 検出結果の通知先

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::RunSummary;
use crate::ports::QueryError;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to send webhook request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Notifier は drift / workspace の不整合を外部に知らせる
///
/// 配送失敗は呼び出し側で fatal として扱われる。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn plan_drift(&self, dir: &str, workspace: &str, summary: &str)
    -> Result<(), NotifyError>;

    async fn extra_workspace_in_remote(&self, dir: &str, workspace: &str)
    -> Result<(), NotifyError>;

    async fn missing_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError>;

    async fn workspace_drift_summary(&self, summary: RunSummary) -> Result<(), NotifyError>;

    /// An error the plan backend flagged as transient.
    async fn temporary_error(
        &self,
        dir: &str,
        workspace: &str,
        error: &QueryError,
    ) -> Result<(), NotifyError>;
}
