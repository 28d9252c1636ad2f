//! CacheGate - TTL による冪等性ゲート
//!
//! # 設計原則
//! - `now - observed_at < ttl` のときだけ record を信用する（skip）
//! - stale な record は「無視」せず、必ず delete してから次の処理へ進む
//! - store 自体はロックを提供しない前提（1 run = 1 writer）

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use crate::domain::{CacheKey, CacheRecord, DriftError};
use crate::ports::{CacheError, Clock, ResultCache};

/// Result of asking the gate whether a check may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A fresh record exists; skip the check.
    Fresh { age: TimeDelta },
    /// No usable record. `evicted_age` is set when a stale record was deleted.
    Proceed { evicted_age: Option<TimeDelta> },
}

pub struct CacheGate {
    store: Arc<dyn ResultCache>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl CacheGate {
    pub fn new(store: Arc<dyn ResultCache>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub async fn lookup<K: CacheKey>(&self, key: &K) -> Result<Option<K::Record>, DriftError> {
        let storage_key = key.storage_key();
        let Some(value) = self
            .store
            .get(&storage_key)
            .await
            .map_err(|source| cache_error("get", &storage_key, source))?
        else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| {
                let corrupt = CacheError::Corrupt {
                    key: storage_key.clone(),
                    source,
                };
                cache_error("decode", &storage_key, corrupt)
            })
    }

    /// Deletes `record` if it is stale and reports whether it was.
    pub async fn evict_if_stale<K: CacheKey>(
        &self,
        key: &K,
        record: &K::Record,
    ) -> Result<bool, DriftError> {
        if self.age(record) < self.ttl {
            return Ok(false);
        }
        let storage_key = key.storage_key();
        self.store
            .delete(&storage_key)
            .await
            .map_err(|source| cache_error("delete", &storage_key, source))?;
        Ok(true)
    }

    pub async fn store<K: CacheKey>(&self, key: &K, record: &K::Record) -> Result<(), DriftError> {
        let storage_key = key.storage_key();
        let value = serde_json::to_value(record).map_err(|source| {
            let corrupt = CacheError::Corrupt {
                key: storage_key.clone(),
                source,
            };
            cache_error("encode", &storage_key, corrupt)
        })?;
        self.store
            .put(&storage_key, value)
            .await
            .map_err(|source| cache_error("store", &storage_key, source))
    }

    /// lookup → (stale なら) evict をまとめたもの
    pub async fn admit<K: CacheKey>(&self, key: &K) -> Result<Admission, DriftError> {
        let Some(record) = self.lookup(key).await? else {
            return Ok(Admission::Proceed { evicted_age: None });
        };
        let age = self.age(&record);
        if self.evict_if_stale(key, &record).await? {
            Ok(Admission::Proceed {
                evicted_age: Some(age),
            })
        } else {
            Ok(Admission::Fresh { age })
        }
    }

    fn age<R: CacheRecord>(&self, record: &R) -> TimeDelta {
        self.clock.now() - record.observed_at()
    }
}

fn cache_error(op: &'static str, key: &str, source: CacheError) -> DriftError {
    DriftError::Cache {
        op,
        key: key.to_string(),
        source,
    }
}
