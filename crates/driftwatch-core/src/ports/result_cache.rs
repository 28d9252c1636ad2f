//! ResultCache port - TTL 判定に使う結果キャッシュ
//!
//! # 設計原則
//! - store は storage key → JSON を保存するだけ（型を知らない）
//! - 型付きアクセスと鮮度判定は `app::CacheGate` が担当
//! - 並行利用は実装側で安全であること（engine 側ではロックしない）

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
