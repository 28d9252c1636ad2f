//! DriftChecker - (directory, workspace) ごとの drift 判定
//!
//! # 状態遷移
//! Filtered → CacheLookup → Query → Classify & Persist
//!
//! - fresh な cache があれば plan backend には問い合わせない
//! - temporary エラーはその workspace だけスキップ（cache は触らない、通知失敗も warn のみ）
//! - それ以外のエラーは fatal（run 全体を cancel）

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::cache_gate::Admission;
use crate::app::context::RunContext;
use crate::app::scheduler::Scheduler;
use crate::domain::{DriftCacheKey, DriftCacheRecord, DriftError, WorkItemSet};
use crate::ports::PlanRequest;

/// How one workspace check ended (when it did not fail the run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftOutcome {
    Filtered,
    AlreadyChecked,
    TemporaryFailure,
    Locked,
    Drifted,
    Clean,
}

/// Drift pass: one work unit per directory, directories in sorted order.
pub async fn find_drifted_workspaces(
    ctx: &Arc<RunContext>,
    items: &WorkItemSet,
    cancel: &CancellationToken,
) -> Result<(), DriftError> {
    let units: Vec<_> = items
        .sorted_directories()
        .into_iter()
        .map(|dir| {
            let ctx = Arc::clone(ctx);
            let workspaces = items.workspaces(&dir).to_vec();
            move |token: CancellationToken| async move {
                check_directory(&ctx, &dir, &workspaces, &token)
                    .await
                    .map(|_| ())
            }
        })
        .collect();

    Scheduler::new(ctx.settings.concurrency)
        .run(units, cancel)
        .await
}

/// Checks the directory's workspaces one after another.
pub async fn check_directory(
    ctx: &RunContext,
    dir: &str,
    workspaces: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<DriftOutcome>, DriftError> {
    if ctx.filter.should_skip(dir) {
        info!(dir, "Skipping directory");
        return Ok(vec![DriftOutcome::Filtered; workspaces.len()]);
    }
    info!(dir, "Checking for drifted workspaces");
    let mut outcomes = Vec::with_capacity(workspaces.len());
    for workspace in workspaces {
        let outcome = check_workspace(ctx, dir, workspace, cancel).await?;
        debug!(dir, workspace = workspace.as_str(), ?outcome, "workspace checked");
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

pub async fn check_workspace(
    ctx: &RunContext,
    dir: &str,
    workspace: &str,
    cancel: &CancellationToken,
) -> Result<DriftOutcome, DriftError> {
    if ctx.filter.should_skip(dir) {
        return Ok(DriftOutcome::Filtered);
    }
    if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
    }

    let key = DriftCacheKey::new(dir, workspace);
    match ctx.gate.admit(&key).await? {
        Admission::Fresh { .. } => {
            info!(dir, workspace, "Skipping workspace, already checked");
            return Ok(DriftOutcome::AlreadyChecked);
        }
        Admission::Proceed {
            evicted_age: Some(age),
        } => {
            info!(
                dir,
                workspace,
                cache_age = %age,
                cache_valid_duration = %ctx.gate.ttl(),
                "Cache expired, checking again"
            );
        }
        Admission::Proceed { evicted_age: None } => {}
    }

    if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
    }
    let request = PlanRequest {
        repo: ctx.settings.repo.clone(),
        reference: ctx.settings.reference.clone(),
        directory: dir.to_string(),
        workspace: workspace.to_string(),
    };
    let plan = match ctx.plan_query.plan_summary(&request).await {
        Ok(plan) => plan,
        Err(err) if err.is_temporary() => {
            warn!(dir, workspace, error = %err, "Temporary error. Will try again later.");
            // 通知に失敗しても run は止めない（この workspace だけの問題）
            if let Err(notify_err) = ctx.notifier.temporary_error(dir, workspace, &err).await {
                warn!(dir, workspace, error = %notify_err, "failed to notify temporary error");
            }
            return Ok(DriftOutcome::TemporaryFailure);
        }
        Err(source) => {
            return Err(DriftError::PlanQuery {
                dir: dir.to_string(),
                workspace: workspace.to_string(),
                source,
            });
        }
    };

    // lock 判定より先に保存する（locked でも TTL 内は再チェックしない）
    ctx.gate
        .store(
            &key,
            &DriftCacheRecord {
                observed_at: ctx.clock.now(),
                drifted: plan.has_changes,
                error: None,
            },
        )
        .await?;

    if plan.locked {
        info!(dir, workspace, "Plan is locked, skipping drift check");
        return Ok(DriftOutcome::Locked);
    }
    if !plan.has_changes {
        return Ok(DriftOutcome::Clean);
    }

    let drifted = ctx.counter.increment();
    info!(dir, workspace, drifted, "Plan has drifted");
    ctx.notifier
        .plan_drift(dir, workspace, &plan.summary_text)
        .await
        .map_err(|source| DriftError::notify(format!("plan drift in {dir}"), source))?;
    Ok(DriftOutcome::Drifted)
}
