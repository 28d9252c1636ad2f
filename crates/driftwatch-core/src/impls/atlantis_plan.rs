//! AtlantisPlanClient - Atlantis `/api/plan` を叩いて PlanSummary を得る
//!
//! # エラー分類
//! - 5xx / timeout / 接続エラー → `QueryError::Temporary`（次回 run で再試行）
//! - それ以外（4xx, 不正な応答）→ `QueryError::Permanent`
//!
//! Atlantis は project が lock 中でも 500 を返すので、status より先に本文を見る。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::PlanSummary;
use crate::ports::{PlanQuery, PlanRequest, QueryError};

const TOKEN_HEADER: &str = "X-Atlantis-Token";
const LOCKED_MARKER: &str = "This project is currently locked";
const NO_CHANGES_MARKER: &str = "No changes.";
const SUMMARY_PREFIX: &str = "Plan:";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApiPlanRequest<'a> {
    repository: &'a str,
    #[serde(rename = "Ref")]
    reference: &'a str,
    #[serde(rename = "Type")]
    vcs_type: &'a str,
    paths: Vec<ApiPath<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApiPath<'a> {
    directory: &'a str,
    workspace: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct ApiPlanResponse {
    error: Option<String>,
    failure: Option<String>,
    project_results: Option<Vec<ProjectResult>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ProjectResult {
    error: Option<String>,
    failure: Option<String>,
    plan_success: Option<PlanSuccess>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PlanSuccess {
    terraform_output: String,
}

impl ApiPlanResponse {
    fn results(&self) -> &[ProjectResult] {
        self.project_results.as_deref().unwrap_or_default()
    }

    fn is_locked(&self) -> bool {
        self.results()
            .iter()
            .filter_map(|r| r.failure.as_deref())
            .any(|f| f.contains(LOCKED_MARKER))
    }

    fn first_problem(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.failure.as_deref())
            .or_else(|| {
                self.results()
                    .iter()
                    .find_map(|r| r.error.as_deref().or(r.failure.as_deref()))
            })
            .filter(|s| !s.is_empty())
    }
}

/// The `Plan: N to add, ...` line of a terraform plan, if any.
pub(crate) fn summary_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(SUMMARY_PREFIX))
}

/// Classifies a decoded response. `status` only matters when the body is not conclusive.
pub(crate) fn interpret(
    status: StatusCode,
    response: &ApiPlanResponse,
) -> Result<PlanSummary, QueryError> {
    if response.is_locked() {
        return Ok(PlanSummary::clean().locked());
    }
    if !status.is_success() {
        let detail = response
            .first_problem()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());
        return Err(classify_status(status, detail));
    }
    if let Some(problem) = response.first_problem() {
        return Err(QueryError::Permanent(problem.to_string()));
    }

    let mut summary = PlanSummary::clean();
    for plan in response.results().iter().filter_map(|r| r.plan_success.as_ref()) {
        if plan.terraform_output.contains(NO_CHANGES_MARKER) {
            continue;
        }
        summary.has_changes = true;
        if let Some(line) = summary_line(&plan.terraform_output) {
            summary.summary_text = line.to_string();
        }
    }
    Ok(summary)
}

fn classify_status(status: StatusCode, detail: String) -> QueryError {
    if status.is_server_error() {
        QueryError::Temporary(format!("{status}: {detail}"))
    } else {
        QueryError::Permanent(format!("{status}: {detail}"))
    }
}

fn classify_transport(err: reqwest::Error) -> QueryError {
    if err.is_timeout() || err.is_connect() {
        QueryError::Temporary(err.to_string())
    } else {
        QueryError::Permanent(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct AtlantisPlanClient {
    client: Client,
    host: String,
    token: String,
}

impl AtlantisPlanClient {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(host, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        host: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl PlanQuery for AtlantisPlanClient {
    async fn plan_summary(&self, request: &PlanRequest) -> Result<PlanSummary, QueryError> {
        let url = format!("{}/api/plan", self.host);
        let body = ApiPlanRequest {
            repository: &request.repo,
            reference: &request.reference,
            vcs_type: "Github",
            paths: vec![ApiPath {
                directory: &request.directory,
                workspace: &request.workspace,
            }],
        };

        debug!(dir = %request.directory, workspace = %request.workspace, "Requesting plan");
        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport)?;
        match serde_json::from_str::<ApiPlanResponse>(&text) {
            Ok(decoded) => interpret(status, &decoded),
            Err(_) if !status.is_success() => Err(classify_status(status, text)),
            Err(e) => Err(QueryError::Permanent(format!("invalid plan response: {e}"))),
        }
    }
}
