//! PlanQuery port - plan backend への問い合わせ

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::PlanSummary;

/// PlanQuery のエラーは collaborator 側で temporary / permanent に分類される
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Expected to go away on its own; skip the workspace and retry next run.
    #[error("temporary plan query error: {0}")]
    Temporary(String),

    #[error("permanent plan query error: {0}")]
    Permanent(String),
}

impl QueryError {
    pub fn is_temporary(&self) -> bool {
        matches!(self, QueryError::Temporary(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub repo: String,
    /// Tracked reference branch.
    pub reference: String,
    pub directory: String,
    pub workspace: String,
}

#[async_trait]
pub trait PlanQuery: Send + Sync {
    async fn plan_summary(&self, request: &PlanRequest) -> Result<PlanSummary, QueryError>;
}
