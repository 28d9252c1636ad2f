//! テスト用の fake collaborator と Harness
//!
//! すべての fake は `Arc` で共有され、テスト側から呼び出し履歴を観測できる。

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::app::{Drifter, DrifterBuilder, RunContext, RunSettings};
use crate::domain::{
    CacheKey, DriftCacheKey, DriftCacheRecord, PlanSummary, RunSummary, WorkItemSet,
    WorkspaceCacheKey, WorkspaceCacheRecord,
};
use crate::impls::InMemoryResultCache;
use crate::ports::{
    CacheError, Checkout, CheckoutDir, CheckoutError, Clock, ConfigGenerator, ConfigParser,
    FixedClock, GenerateError, Notifier, NotifyError, ParseError, PlanQuery, PlanRequest,
    QueryError, ResultCache, TerraformError, TerraformOps,
};

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

async fn put_record<K: CacheKey>(cache: &dyn ResultCache, key: &K, record: &K::Record) {
    cache
        .put(&key.storage_key(), serde_json::to_value(record).unwrap())
        .await
        .unwrap();
}

// ---- PlanQuery ----

type WorkspaceId = (String, String);

/// Unstubbed (directory, workspace) pairs answer with a permanent error.
#[derive(Default)]
pub(crate) struct StubPlanQuery {
    plans: Mutex<HashMap<WorkspaceId, Result<PlanSummary, QueryError>>>,
    calls: Mutex<Vec<WorkspaceId>>,
}

impl StubPlanQuery {
    pub(crate) fn set(&self, dir: &str, workspace: &str, result: Result<PlanSummary, QueryError>) {
        self.plans
            .lock()
            .unwrap()
            .insert((dir.to_string(), workspace.to_string()), result);
    }

    pub(crate) fn calls(&self) -> Vec<WorkspaceId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlanQuery for StubPlanQuery {
    async fn plan_summary(&self, request: &PlanRequest) -> Result<PlanSummary, QueryError> {
        let id = (request.directory.clone(), request.workspace.clone());
        self.calls.lock().unwrap().push(id.clone());
        self.plans
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Err(QueryError::Permanent(format!("no plan stubbed for {id:?}"))))
    }
}

// ---- TerraformOps ----

/// Unknown directories list only `default`.
#[derive(Default)]
pub(crate) struct StubTerraform {
    workspaces: Mutex<HashMap<String, Vec<String>>>,
    init_calls: Mutex<Vec<String>>,
    fail_init: AtomicBool,
    fail_list: AtomicBool,
}

impl StubTerraform {
    pub(crate) fn set_workspaces(&self, dir: &str, workspaces: &[&str]) {
        self.workspaces.lock().unwrap().insert(
            dir.to_string(),
            workspaces.iter().map(|w| w.to_string()).collect(),
        );
    }

    pub(crate) fn init_calls(&self) -> Vec<String> {
        self.init_calls.lock().unwrap().clone()
    }

    pub(crate) fn fail_init(&self) {
        self.fail_init.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TerraformOps for StubTerraform {
    async fn init(&self, _root: &Path, directory: &str) -> Result<(), TerraformError> {
        self.init_calls.lock().unwrap().push(directory.to_string());
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(TerraformError::Command {
                command: "init".into(),
                status: "exit status: 1".into(),
                stderr: "backend unreachable".into(),
            });
        }
        Ok(())
    }

    async fn list_workspaces(
        &self,
        _root: &Path,
        directory: &str,
    ) -> Result<Vec<String>, TerraformError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(TerraformError::Command {
                command: "workspace list".into(),
                status: "exit status: 1".into(),
                stderr: "state lock timeout".into(),
            });
        }
        Ok(self
            .workspaces
            .lock()
            .unwrap()
            .get(directory)
            .cloned()
            .unwrap_or_else(|| vec!["default".to_string()]))
    }
}

// ---- Notifier ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notification {
    PlanDrift {
        dir: String,
        workspace: String,
        summary: String,
    },
    ExtraWorkspace {
        dir: String,
        workspace: String,
    },
    MissingWorkspace {
        dir: String,
        workspace: String,
    },
    Summary(RunSummary),
    TemporaryError {
        dir: String,
        workspace: String,
        error: String,
    },
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }

    /// Every later delivery fails and is not recorded.
    pub(crate) fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: Notification) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Other("sink unavailable".into()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn plan_drift(
        &self,
        dir: &str,
        workspace: &str,
        summary: &str,
    ) -> Result<(), NotifyError> {
        self.record(Notification::PlanDrift {
            dir: dir.into(),
            workspace: workspace.into(),
            summary: summary.into(),
        })
    }

    async fn extra_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        self.record(Notification::ExtraWorkspace {
            dir: dir.into(),
            workspace: workspace.into(),
        })
    }

    async fn missing_workspace_in_remote(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Result<(), NotifyError> {
        self.record(Notification::MissingWorkspace {
            dir: dir.into(),
            workspace: workspace.into(),
        })
    }

    async fn workspace_drift_summary(&self, summary: RunSummary) -> Result<(), NotifyError> {
        self.record(Notification::Summary(summary))
    }

    async fn temporary_error(
        &self,
        dir: &str,
        workspace: &str,
        err: &QueryError,
    ) -> Result<(), NotifyError> {
        self.record(Notification::TemporaryError {
            dir: dir.into(),
            workspace: workspace.into(),
            error: err.to_string(),
        })
    }
}

// ---- ResultCache ----

/// In-memory cache that remembers which keys were deleted.
#[derive(Default)]
pub(crate) struct RecordingCache {
    inner: InMemoryResultCache,
    deleted: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.inner.is_empty().await
    }
}

#[async_trait]
impl ResultCache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deleted.lock().unwrap().push(key.to_string());
        self.inner.delete(key).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailOn {
    Put,
    Delete,
}

/// Reads work; either writes or deletes are refused.
pub(crate) struct FailingCache {
    inner: InMemoryResultCache,
    fail_on: FailOn,
}

impl FailingCache {
    pub(crate) fn on_delete() -> Self {
        Self {
            inner: InMemoryResultCache::new(),
            fail_on: FailOn::Delete,
        }
    }

    pub(crate) fn on_put() -> Self {
        Self {
            inner: InMemoryResultCache::new(),
            fail_on: FailOn::Put,
        }
    }

    pub(crate) async fn seed<K: CacheKey>(&self, key: &K, record: &K::Record) {
        put_record(&self.inner, key, record).await;
    }
}

#[async_trait]
impl ResultCache for FailingCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        if self.fail_on == FailOn::Put {
            return Err(CacheError::Unavailable("put refused".into()));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.fail_on == FailOn::Delete {
            return Err(CacheError::Unavailable("delete refused".into()));
        }
        self.inner.delete(key).await
    }
}

// ---- Checkout / ConfigParser / ConfigGenerator ----

pub(crate) struct StubCheckout;

#[async_trait]
impl Checkout for StubCheckout {
    async fn checkout(&self, _repo: &str, _reference: &str) -> Result<CheckoutDir, CheckoutError> {
        Ok(CheckoutDir::existing("."))
    }
}

#[derive(Default)]
pub(crate) struct StubConfigParser {
    items: WorkItemSet,
}

impl StubConfigParser {
    pub(crate) fn new(items: WorkItemSet) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ConfigParser for StubConfigParser {
    async fn parse(&self, _config_file: &str, _root: &Path) -> Result<WorkItemSet, ParseError> {
        Ok(self.items.clone())
    }
}

#[derive(Default)]
pub(crate) struct StubConfigGenerator {
    calls: Mutex<Vec<String>>,
}

impl StubConfigGenerator {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigGenerator for StubConfigGenerator {
    async fn generate(&self, config_file: &str, _root: &Path) -> Result<(), GenerateError> {
        self.calls.lock().unwrap().push(config_file.to_string());
        Ok(())
    }
}

// ---- Harness ----

/// Fakes for every collaborator plus run settings (`acme/infra`, 24h TTL, sequential).
pub(crate) struct Harness {
    pub clock: Arc<FixedClock>,
    pub cache: Arc<RecordingCache>,
    pub plans: Arc<StubPlanQuery>,
    pub terraform: Arc<StubTerraform>,
    pub notifier: Arc<RecordingNotifier>,
    pub generator: Arc<StubConfigGenerator>,
    pub settings: RunSettings,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            clock: Arc::new(FixedClock::new(t0())),
            cache: Arc::new(RecordingCache::default()),
            plans: Arc::new(StubPlanQuery::default()),
            terraform: Arc::new(StubTerraform::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            generator: Arc::new(StubConfigGenerator::default()),
            settings: RunSettings::new("acme/infra"),
        }
    }

    pub(crate) fn with_allowlist(mut self, allowlist: &[&str]) -> Self {
        self.settings.directory_allowlist = allowlist.iter().map(|d| d.to_string()).collect();
        self
    }

    pub(crate) fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.settings.concurrency = concurrency;
        self
    }

    pub(crate) fn with_skip_workspace_check(mut self) -> Self {
        self.settings.skip_workspace_check = true;
        self
    }

    pub(crate) fn with_auto_generate(mut self) -> Self {
        self.settings.auto_generate_config = true;
        self
    }

    pub(crate) fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn context(&self) -> Arc<RunContext> {
        Arc::new(RunContext::new(
            self.settings.clone(),
            ".",
            self.plans.clone(),
            self.terraform.clone(),
            self.cache.clone(),
            self.notifier.clone(),
            self.clock.clone(),
        ))
    }

    pub(crate) fn drifter(&self, items: WorkItemSet) -> Drifter {
        DrifterBuilder::new(self.settings.clone())
            .checkout(StubCheckout)
            .config_parser(StubConfigParser::new(items))
            .shared_plan_query(self.plans.clone())
            .shared_terraform(self.terraform.clone())
            .shared_cache(self.cache.clone())
            .shared_notifier(self.notifier.clone())
            .shared_clock(self.clock.clone())
            .shared_config_generator(self.generator.clone())
            .build()
            .unwrap()
    }

    pub(crate) async fn drift_record(
        &self,
        dir: &str,
        workspace: &str,
    ) -> Option<DriftCacheRecord> {
        self.record(&DriftCacheKey::new(dir, workspace)).await
    }

    pub(crate) async fn workspace_record(&self, dir: &str) -> Option<WorkspaceCacheRecord> {
        self.record(&WorkspaceCacheKey::new(dir)).await
    }

    /// Seed a clean drift record observed `age` before now.
    pub(crate) async fn seed_drift_record(&self, dir: &str, workspace: &str, age: TimeDelta) {
        let record = DriftCacheRecord {
            observed_at: self.clock_now() - age,
            drifted: false,
            error: None,
        };
        put_record(self.cache.as_ref(), &DriftCacheKey::new(dir, workspace), &record).await;
    }

    pub(crate) async fn seed_workspace_record(&self, dir: &str, age: TimeDelta) {
        let record = WorkspaceCacheRecord {
            observed_at: self.clock_now() - age,
            remote_workspaces: vec!["default".to_string()],
        };
        put_record(self.cache.as_ref(), &WorkspaceCacheKey::new(dir), &record).await;
    }

    async fn record<K: CacheKey>(&self, key: &K) -> Option<K::Record> {
        self.cache
            .get(&key.storage_key())
            .await
            .unwrap()
            .map(|value| serde_json::from_value(value).unwrap())
    }
}
