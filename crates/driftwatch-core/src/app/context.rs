//! RunSettings / RunContext
//!
//! 依存（collaborator）と設定は run ごとに一度だけ組み立て、
//! `Arc<RunContext>` で各 work unit に渡す。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app::cache_gate::CacheGate;
use crate::domain::{DirectoryFilter, DriftCounter, WorkItemSet};
use crate::ports::{Clock, Notifier, PlanQuery, ResultCache, TerraformOps};

pub const DEFAULT_REFERENCE: &str = "master";
pub const DEFAULT_CONFIG_FILE: &str = "atlantis.yaml";
pub const DEFAULT_CACHE_VALID_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Run-level settings.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// `owner/name` of the tracked repository.
    pub repo: String,
    /// Reference branch plans are computed against.
    pub reference: String,
    /// Repo config file name, relative to the checkout root.
    pub config_file: String,
    pub cache_valid_duration: Duration,
    /// `<= 1` runs every unit sequentially.
    pub concurrency: usize,
    pub directory_allowlist: Vec<String>,
    pub skip_workspace_check: bool,
    pub auto_generate_config: bool,
}

impl RunSettings {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            reference: DEFAULT_REFERENCE.to_string(),
            config_file: DEFAULT_CONFIG_FILE.to_string(),
            cache_valid_duration: DEFAULT_CACHE_VALID_DURATION,
            concurrency: 1,
            directory_allowlist: Vec::new(),
            skip_workspace_check: false,
            auto_generate_config: false,
        }
    }
}

/// Everything one run's work units share.
///
/// A fresh context (and therefore a fresh `DriftCounter`) is built per run.
pub struct RunContext {
    pub settings: RunSettings,
    pub filter: DirectoryFilter,
    pub gate: CacheGate,
    pub plan_query: Arc<dyn PlanQuery>,
    pub terraform: Arc<dyn TerraformOps>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub counter: DriftCounter,
    checkout_root: PathBuf,
}

impl RunContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: RunSettings,
        checkout_root: impl Into<PathBuf>,
        plan_query: Arc<dyn PlanQuery>,
        terraform: Arc<dyn TerraformOps>,
        cache: Arc<dyn ResultCache>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let filter = DirectoryFilter::new(settings.directory_allowlist.clone());
        let gate = CacheGate::new(cache, Arc::clone(&clock), settings.cache_valid_duration);
        Self {
            settings,
            filter,
            gate,
            plan_query,
            terraform,
            notifier,
            clock,
            counter: DriftCounter::new(),
            checkout_root: checkout_root.into(),
        }
    }

    pub fn checkout_root(&self) -> &Path {
        &self.checkout_root
    }

    /// Declared workspaces in directories the filter lets through.
    pub fn checked_workspace_total(&self, items: &WorkItemSet) -> u32 {
        let total: usize = items
            .iter()
            .filter(|(dir, _)| !self.filter.should_skip(dir))
            .map(|(_, workspaces)| workspaces.len())
            .sum();
        u32::try_from(total).unwrap_or(u32::MAX)
    }
}
