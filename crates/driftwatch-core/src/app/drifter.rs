//! Drifter - 1 回分の監査 run
//!
//! # フロー
//! 1. checkout
//! 2. （auto-generate なら）repo config を生成
//! 3. repo config を parse（空なら warn のみ）
//! 4. drift パス → reconcile パス（skip 指定がなければ）
//! 5. summary 通知
//! 6. checkout を後始末（失敗は warn）

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::context::{RunContext, RunSettings};
use crate::app::drift_check::find_drifted_workspaces;
use crate::app::reconcile::find_extra_workspaces;
use crate::domain::{DriftError, RunSummary, WorkItemSet};
use crate::ports::{
    Checkout, Clock, ConfigGenerator, ConfigParser, Notifier, PlanQuery, ResultCache,
    TerraformOps,
};

/// Built by `DrifterBuilder`.
pub struct Drifter {
    pub(crate) settings: RunSettings,
    pub(crate) checkout: Arc<dyn Checkout>,
    pub(crate) config_parser: Arc<dyn ConfigParser>,
    pub(crate) config_generator: Option<Arc<dyn ConfigGenerator>>,
    pub(crate) plan_query: Arc<dyn PlanQuery>,
    pub(crate) terraform: Arc<dyn TerraformOps>,
    pub(crate) cache: Arc<dyn ResultCache>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Drifter {
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, DriftError> {
        info!(repo = %self.settings.repo, "Checking out Terraform repository.");
        let checkout = self
            .checkout
            .checkout(&self.settings.repo, &self.settings.reference)
            .await
            .map_err(|source| DriftError::Checkout {
                repo: self.settings.repo.clone(),
                source,
            })?;
        info!(location = %checkout.path().display(), "Repo location");

        let result = self.run_in(checkout.path(), cancel).await;

        if let Err(err) = checkout.close() {
            warn!(error = %err, "failed to cleanup repo");
        }
        result
    }

    async fn run_in(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, DriftError> {
        if self.settings.auto_generate_config {
            info!("Auto generation of config option enabled.");
            if let Some(generator) = &self.config_generator {
                generator
                    .generate(&self.settings.config_file, root)
                    .await
                    .map_err(DriftError::GenerateConfig)?;
            }
        }

        info!("Parsing repo config from directory.");
        let items = self
            .config_parser
            .parse(&self.settings.config_file, root)
            .await
            .map_err(DriftError::ParseConfig)?;
        if items.is_empty() {
            warn!("No projects found in repo config.");
        }
        info!(
            directories = items.len(),
            workspaces = items.total_workspaces(),
            "Finished parsing workspaces. Checking for drift."
        );

        let ctx = Arc::new(self.context(root));
        self.audit(&ctx, &items, cancel).await
    }

    fn context(&self, root: &Path) -> RunContext {
        RunContext::new(
            self.settings.clone(),
            root,
            Arc::clone(&self.plan_query),
            Arc::clone(&self.terraform),
            Arc::clone(&self.cache),
            Arc::clone(&self.notifier),
            Arc::clone(&self.clock),
        )
    }

    async fn audit(
        &self,
        ctx: &Arc<RunContext>,
        items: &WorkItemSet,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, DriftError> {
        find_drifted_workspaces(ctx, items, cancel).await?;
        info!(
            drifted_workspaces = ctx.counter.get(),
            "Total number of workspaces drifted"
        );

        if self.settings.skip_workspace_check {
            info!("Skipping remote workspace check.");
        } else {
            info!("Checking for extra workspaces.");
            find_extra_workspaces(ctx, items, cancel).await?;
        }

        let summary = RunSummary::new(ctx.counter.get(), ctx.checked_workspace_total(items));
        self.notifier
            .workspace_drift_summary(summary)
            .await
            .map_err(|source| DriftError::notify("workspace drift summary", source))?;
        info!(
            drifted = summary.drifted,
            undrifted = summary.undrifted,
            total = summary.total,
            "Finished checking for drift."
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rstest::rstest;

    use crate::domain::PlanSummary;
    use crate::ports::QueryError;
    use crate::testing::{Harness, Notification};

    fn two_directories() -> WorkItemSet {
        [("infra/network", "prod"), ("infra/db", "prod")]
            .into_iter()
            .collect()
    }

    fn stub_two_directories(h: &Harness) {
        h.plans.set("infra/network", "prod", Ok(PlanSummary::clean()));
        h.plans.set(
            "infra/db",
            "prod",
            Ok(PlanSummary::drifted("Plan: 1 to add, 0 to change, 0 to destroy.")),
        );
        h.terraform.set_workspaces("infra/network", &["default", "prod"]);
        h.terraform.set_workspaces("infra/db", &["default", "prod"]);
    }

    #[tokio::test]
    async fn end_to_end_reports_one_drifted_workspace() {
        let h = Harness::new();
        stub_two_directories(&h);
        let drifter = h.drifter(two_directories());

        let summary = drifter.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, RunSummary::new(1, 2));
        assert_eq!(
            h.notifier.events(),
            vec![
                Notification::PlanDrift {
                    dir: "infra/db".into(),
                    workspace: "prod".into(),
                    summary: "Plan: 1 to add, 0 to change, 0 to destroy.".into(),
                },
                Notification::Summary(RunSummary {
                    drifted: 1,
                    undrifted: 1,
                    total: 2
                }),
            ]
        );
        for dir in ["infra/db", "infra/network"] {
            assert_eq!(
                h.drift_record(dir, "prod").await.unwrap().observed_at,
                h.clock_now()
            );
            assert_eq!(h.workspace_record(dir).await.unwrap().observed_at, h.clock_now());
        }
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    #[tokio::test]
    async fn concurrency_does_not_change_results(#[case] concurrency: usize) {
        let h = Harness::new().with_concurrency(concurrency);
        let mut items = WorkItemSet::new();
        for i in 0..10 {
            let dir = format!("modules/m{i:02}");
            for ws in ["prod", "staging"] {
                items.insert(dir.clone(), ws);
                let plan = if i % 3 == 0 {
                    PlanSummary::drifted(format!("Plan: {i} to add"))
                } else {
                    PlanSummary::clean()
                };
                h.plans.set(&dir, ws, Ok(plan));
            }
            h.terraform.set_workspaces(&dir, &["default", "prod", "staging", "legacy"]);
        }
        let drifter = h.drifter(items);

        let summary = drifter.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, RunSummary::new(8, 20));
        let events = h.notifier.events();
        let drift_events = events
            .iter()
            .filter(|e| matches!(e, Notification::PlanDrift { .. }))
            .count();
        let extra_events = events
            .iter()
            .filter(|e| {
                matches!(e, Notification::ExtraWorkspace { workspace, .. } if workspace == "legacy")
            })
            .count();
        assert_eq!(drift_events, 8);
        assert_eq!(extra_events, 10);
        assert_eq!(events.len(), 8 + 10 + 1);
    }

    #[tokio::test]
    async fn second_run_within_ttl_queries_nothing() {
        let h = Harness::new();
        stub_two_directories(&h);
        let drifter = h.drifter(two_directories());
        drifter.run(&CancellationToken::new()).await.unwrap();
        let first_calls = h.plans.calls().len();

        h.clock.advance(TimeDelta::hours(1));
        let summary = drifter.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(h.plans.calls().len(), first_calls);
        assert_eq!(h.terraform.init_calls().len(), 2);
        // 新しい run は counter を 0 から数える
        assert_eq!(summary, RunSummary::new(0, 2));
    }

    #[rstest]
    #[case(1)]
    #[case(4)]
    #[tokio::test]
    async fn permanent_error_aborts_before_reconciliation(#[case] concurrency: usize) {
        let h = Harness::new().with_concurrency(concurrency);
        stub_two_directories(&h);
        h.plans.set(
            "infra/db",
            "prod",
            Err(QueryError::Permanent("unauthorized".into())),
        );
        let drifter = h.drifter(two_directories());

        let err = drifter.run(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, DriftError::PlanQuery { .. }));
        assert!(h.terraform.init_calls().is_empty());
        assert!(!h
            .notifier
            .events()
            .iter()
            .any(|e| matches!(e, Notification::Summary(_))));
    }

    #[tokio::test]
    async fn skip_workspace_check_skips_terraform() {
        let h = Harness::new().with_skip_workspace_check();
        stub_two_directories(&h);
        let drifter = h.drifter(two_directories());

        drifter.run(&CancellationToken::new()).await.unwrap();

        assert!(h.terraform.init_calls().is_empty());
    }

    #[tokio::test]
    async fn allowlist_limits_totals() {
        let h = Harness::new().with_allowlist(&["network"]);
        stub_two_directories(&h);
        let drifter = h.drifter(two_directories());

        let summary = drifter.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, RunSummary::new(0, 1));
        assert_eq!(h.plans.calls(), vec![("infra/network".to_string(), "prod".to_string())]);
    }

    #[tokio::test]
    async fn empty_config_still_sends_summary() {
        let h = Harness::new();
        let drifter = h.drifter(WorkItemSet::new());

        let summary = drifter.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(summary, RunSummary::new(0, 0));
        assert_eq!(h.notifier.events(), vec![Notification::Summary(summary)]);
    }

    #[tokio::test]
    async fn auto_generate_runs_before_parse() {
        let h = Harness::new().with_auto_generate();
        let drifter = h.drifter(WorkItemSet::new());

        drifter.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(h.generator.calls(), vec!["atlantis.yaml".to_string()]);
    }
}
