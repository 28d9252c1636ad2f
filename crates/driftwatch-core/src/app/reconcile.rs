//! WorkspaceReconciler - remote にだけ存在する workspace の検出
//!
//! # フロー
//! 1. Filtered / CacheLookup（key は directory のみ）
//! 2. terraform init → workspace list
//! 3. `declared ∪ {"default"}` に無い remote workspace を通知
//! 4. remote の一覧を cache に保存（extra が 0 件でも保存する）
//!
//! remote → declared の一方向のみ。declared にあって remote に無いものは報告しない。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::cache_gate::Admission;
use crate::app::context::RunContext;
use crate::app::scheduler::Scheduler;
use crate::domain::{DriftError, WorkItemSet, WorkspaceCacheKey, WorkspaceCacheRecord};

/// Terraform's implicit workspace; always expected in the remote.
pub const DEFAULT_WORKSPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Filtered,
    AlreadyChecked,
    /// Remote workspaces that are not declared, in listing order.
    Reconciled { extra: Vec<String> },
}

/// Reconciliation pass: one work unit per directory, directories in sorted order.
pub async fn find_extra_workspaces(
    ctx: &Arc<RunContext>,
    items: &WorkItemSet,
    cancel: &CancellationToken,
) -> Result<(), DriftError> {
    let units: Vec<_> = items
        .sorted_directories()
        .into_iter()
        .map(|dir| {
            let ctx = Arc::clone(ctx);
            let declared = items.workspaces(&dir).to_vec();
            move |token: CancellationToken| async move {
                reconcile_directory(&ctx, &dir, &declared, &token)
                    .await
                    .map(|_| ())
            }
        })
        .collect();

    Scheduler::new(ctx.settings.concurrency)
        .run(units, cancel)
        .await
}

pub async fn reconcile_directory(
    ctx: &RunContext,
    dir: &str,
    declared: &[String],
    cancel: &CancellationToken,
) -> Result<ReconcileOutcome, DriftError> {
    if ctx.filter.should_skip(dir) {
        info!(dir, "Skipping directory");
        return Ok(ReconcileOutcome::Filtered);
    }
    if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
    }

    let key = WorkspaceCacheKey::new(dir);
    match ctx.gate.admit(&key).await? {
        Admission::Fresh { .. } => {
            info!(dir, "Skipping directory, in cache");
            return Ok(ReconcileOutcome::AlreadyChecked);
        }
        Admission::Proceed {
            evicted_age: Some(age),
        } => {
            info!(
                dir,
                cache_age = %age,
                cache_valid_duration = %ctx.gate.ttl(),
                "Cache expired, checking again"
            );
        }
        Admission::Proceed { evicted_age: None } => {}
    }

    info!(dir, "Checking for extra workspaces");
    let root = ctx.checkout_root();
    if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
    }
    ctx.terraform
        .init(root, dir)
        .await
        .map_err(|source| DriftError::Terraform {
            op: "init workspace",
            dir: dir.to_string(),
            source,
        })?;

    if cancel.is_cancelled() {
        return Err(DriftError::Cancelled);
    }
    let remote = ctx
        .terraform
        .list_workspaces(root, dir)
        .await
        .map_err(|source| DriftError::Terraform {
            op: "list workspaces",
            dir: dir.to_string(),
            source,
        })?;

    let extra: Vec<String> = remote
        .iter()
        .filter(|w| !is_expected(declared, w))
        .cloned()
        .collect();
    for workspace in &extra {
        ctx.notifier
            .extra_workspace_in_remote(dir, workspace)
            .await
            .map_err(|source| {
                DriftError::notify(format!("extra workspace {workspace} in {dir}"), source)
            })?;
    }

    ctx.gate
        .store(
            &key,
            &WorkspaceCacheRecord {
                observed_at: ctx.clock.now(),
                remote_workspaces: remote,
            },
        )
        .await?;
    Ok(ReconcileOutcome::Reconciled { extra })
}

fn is_expected(declared: &[String], workspace: &str) -> bool {
    workspace == DEFAULT_WORKSPACE || declared.iter().any(|d| d == workspace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    use crate::testing::{Harness, Notification};

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn reconcile(
        ctx: &RunContext,
        declared: &[&str],
    ) -> Result<ReconcileOutcome, DriftError> {
        reconcile_directory(ctx, "infra/db", &names(declared), &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn reports_only_undeclared_remote_workspaces() {
        let h = Harness::new();
        h.terraform.set_workspaces("infra/db", &["a", "b", "c", "default"]);
        let ctx = h.context();

        let outcome = reconcile(&ctx, &["a", "b"]).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Reconciled {
                extra: names(&["c"])
            }
        );
        assert_eq!(
            h.notifier.events(),
            vec![Notification::ExtraWorkspace {
                dir: "infra/db".into(),
                workspace: "c".into(),
            }]
        );
        assert_eq!(h.terraform.init_calls(), names(&["infra/db"]));
    }

    #[tokio::test]
    async fn declared_but_missing_remote_is_not_reported() {
        let h = Harness::new();
        h.terraform.set_workspaces("infra/db", &["default"]);
        let ctx = h.context();

        let outcome = reconcile(&ctx, &["prod"]).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Reconciled { extra: vec![] });
        assert!(h.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn listing_is_cached_even_without_extras() {
        let h = Harness::new();
        h.terraform.set_workspaces("infra/db", &["default", "prod"]);
        let ctx = h.context();

        reconcile(&ctx, &["prod"]).await.unwrap();

        let record = h.workspace_record("infra/db").await.unwrap();
        assert_eq!(record.remote_workspaces, names(&["default", "prod"]));
        assert_eq!(record.observed_at, h.clock_now());
    }

    #[tokio::test]
    async fn fresh_listing_skips_terraform() {
        let h = Harness::new();
        h.seed_workspace_record("infra/db", TimeDelta::hours(1)).await;
        let ctx = h.context();

        let outcome = reconcile(&ctx, &["prod"]).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::AlreadyChecked);
        assert!(h.terraform.init_calls().is_empty());
    }

    #[tokio::test]
    async fn stale_listing_is_replaced() {
        let h = Harness::new();
        h.seed_workspace_record("infra/db", TimeDelta::days(3)).await;
        h.terraform.set_workspaces("infra/db", &["default", "old"]);
        let ctx = h.context();

        let outcome = reconcile(&ctx, &["prod"]).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Reconciled {
                extra: names(&["old"])
            }
        );
        assert_eq!(h.cache.deleted().len(), 1);
        assert_eq!(
            h.workspace_record("infra/db").await.unwrap().observed_at,
            h.clock_now()
        );
    }

    #[tokio::test]
    async fn init_failure_is_fatal_and_not_cached() {
        let h = Harness::new();
        h.terraform.fail_init();
        let ctx = h.context();

        let err = reconcile(&ctx, &["prod"]).await.unwrap_err();

        assert!(matches!(err, DriftError::Terraform { op: "init workspace", .. }));
        assert!(h.workspace_record("infra/db").await.is_none());
    }

    #[tokio::test]
    async fn list_failure_is_fatal_and_not_cached() {
        let h = Harness::new();
        h.terraform.fail_list();
        let ctx = h.context();

        let err = reconcile(&ctx, &["prod"]).await.unwrap_err();

        assert!(matches!(err, DriftError::Terraform { op: "list workspaces", .. }));
        assert!(h.workspace_record("infra/db").await.is_none());
        assert!(h.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn filtered_directory_is_skipped() {
        let h = Harness::new().with_allowlist(&["network"]);
        let ctx = h.context();

        let outcome = reconcile(&ctx, &["prod"]).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Filtered);
        assert!(h.terraform.init_calls().is_empty());
    }
}
