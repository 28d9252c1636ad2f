//! InMemoryResultCache - 開発・テスト用の結果キャッシュ
//!
//! プロセス内でしか生きないので、TTL が効くのは同一プロセス内の run 間のみ。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{CacheError, ResultCache};

#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
