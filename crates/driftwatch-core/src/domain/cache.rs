//! Cache keys and records for the TTL-gated idempotency layer.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// CacheKey は key と record 型を対応付ける
///
/// # 設計原則
/// - `ResultCache` は型消去された JSON を保存するだけ
/// - 型付きの変換は `CacheGate` 側で行う（typed → dyn）
pub trait CacheKey: Send + Sync {
    type Record: CacheRecord + Serialize + DeserializeOwned + Send + Sync;

    /// Operation kind, used as the storage key prefix.
    const KIND: &'static str;

    /// Stable identifier of this key inside its kind.
    fn id(&self) -> String;

    fn storage_key(&self) -> String {
        format!("{}/{}", Self::KIND, self.id())
    }
}

pub trait CacheRecord {
    fn observed_at(&self) -> DateTime<Utc>;
}

/// Identifies one drift check result per (directory, workspace).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriftCacheKey {
    pub directory: String,
    pub workspace: String,
}

impl DriftCacheKey {
    pub fn new(directory: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            workspace: workspace.into(),
        }
    }
}

impl CacheKey for DriftCacheKey {
    type Record = DriftCacheRecord;
    const KIND: &'static str = "drift";

    fn id(&self) -> String {
        format!("{}#{}", self.directory, self.workspace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftCacheRecord {
    pub observed_at: DateTime<Utc>,
    pub drifted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheRecord for DriftCacheRecord {
    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Identifies one remote workspace listing per directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceCacheKey {
    pub directory: String,
}

impl WorkspaceCacheKey {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl CacheKey for WorkspaceCacheKey {
    type Record = WorkspaceCacheRecord;
    const KIND: &'static str = "workspaces";

    fn id(&self) -> String {
        self.directory.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceCacheRecord {
    pub observed_at: DateTime<Utc>,
    pub remote_workspaces: Vec<String>,
}

impl CacheRecord for WorkspaceCacheRecord {
    fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}
