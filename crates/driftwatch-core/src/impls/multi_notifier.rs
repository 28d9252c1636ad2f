//! MultiNotifier - 複数の sink に順番に配送する（最初の失敗で打ち切り）

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::RunSummary;
use crate::ports::{Notifier, NotifyError, QueryError};

#[derive(Default, Clone)]
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn push(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn plan_drift(
        &self,
        dir: &str,
        workspace: &str,
        summary: &str,
    ) -> Result<(), NotifyError> {
        for n in &self.notifiers {
            n.plan_drift(dir, workspace, summary).await?;
        }
        Ok(())
    }

    async fn extra_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        for n in &self.notifiers {
            n.extra_workspace_in_remote(dir, workspace).await?;
        }
        Ok(())
    }

    async fn missing_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        for n in &self.notifiers {
            n.missing_workspace_in_remote(dir, workspace).await?;
        }
        Ok(())
    }

    async fn workspace_drift_summary(&self, summary: RunSummary) -> Result<(), NotifyError> {
        for n in &self.notifiers {
            n.workspace_drift_summary(summary).await?;
        }
        Ok(())
    }

    async fn temporary_error(
        &self,
        dir: &str,
        workspace: &str,
        err: &QueryError,
    ) -> Result<(), NotifyError> {
        for n in &self.notifiers {
            n.temporary_error(dir, workspace, err).await?;
        }
        Ok(())
    }
}
