//! SlackWebhookNotifier - Slack incoming webhook への通知

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::domain::RunSummary;
use crate::ports::{Notifier, NotifyError, QueryError};

/// Summaries longer than this are sent as a code block.
const INLINE_SUMMARY_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct SlackWebhookNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackWebhookNotifier {
    /// Returns `None` for an empty URL so callers can treat it as "not configured".
    pub fn new(webhook_url: impl Into<String>) -> Result<Option<Self>, NotifyError> {
        let webhook_url = webhook_url.into();
        if webhook_url.is_empty() {
            return Ok(None);
        }
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Some(Self {
            webhook_url,
            client,
        }))
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookMessage { text })
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn workspace_line(workspace: &str) -> String {
    if workspace.is_empty() {
        String::new()
    } else {
        format!("\nWorkspace: `{workspace}`")
    }
}

pub(crate) fn plan_drift_message(dir: &str, workspace: &str, summary: &str) -> String {
    let result = if summary.len() > INLINE_SUMMARY_LIMIT {
        format!(":pencil: *Result:* \n```\n{summary}\n```")
    } else {
        format!(":pencil: *Result:* `{summary}`")
    };
    format!(
        ":exclamation: *Drift detected*\n:terraform: *Root module:* `{dir}`{}\n{result}",
        workspace_line(workspace)
    )
}

pub(crate) fn extra_workspace_message(dir: &str, workspace: &str) -> String {
    format!(
        "Extra workspace in remote\nDirectory: `{dir}`{}",
        workspace_line(workspace)
    )
}

pub(crate) fn missing_workspace_message(dir: &str, workspace: &str) -> String {
    format!(
        "Missing workspace in remote\nRoot module: `{dir}`{}",
        workspace_line(workspace)
    )
}

fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(total) * 100.0
}

pub(crate) fn summary_message(summary: RunSummary) -> String {
    let RunSummary {
        drifted,
        undrifted,
        total,
    } = summary;
    let head = if drifted == 0 {
        format!(":checked_animated: *Total Workspaces Drifted:* 0 / {total}")
    } else {
        format!(
            ":checkered_flag: *Total Workspaces Drifted:* {drifted} / {total} ({:.1}%)",
            percent(drifted, total)
        )
    };
    format!(
        "{head}\n:checked_animated: *Total Workspaces Undrifted:* {undrifted} / {total} ({:.1}%)",
        percent(undrifted, total)
    )
}

#[async_trait]
impl Notifier for SlackWebhookNotifier {
    async fn plan_drift(
        &self,
        dir: &str,
        workspace: &str,
        summary: &str,
    ) -> Result<(), NotifyError> {
        self.send(&plan_drift_message(dir, workspace, summary)).await
    }

    async fn extra_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        self.send(&extra_workspace_message(dir, workspace)).await
    }

    async fn missing_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        self.send(&missing_workspace_message(dir, workspace)).await
    }

    async fn workspace_drift_summary(&self, summary: RunSummary) -> Result<(), NotifyError> {
        self.send(&summary_message(summary)).await
    }

    async fn temporary_error(
        &self,
        dir: &str,
        workspace: &str,
        err: &QueryError,
    ) -> Result<(), NotifyError> {
        self.send(&format!(
            "Unknown error in remote\nDirectory: {dir}\nWorkspace: {workspace}\nError: {err}"
        ))
        .await
    }
}
