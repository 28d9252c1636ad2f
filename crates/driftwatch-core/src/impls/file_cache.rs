//! FileResultCache - ディレクトリに 1 key = 1 JSON ファイルで保存する結果キャッシュ
//!
//! # 設計原則
//! - プロセスをまたいで残るので、定期実行の間でも TTL が効く
//! - 書き込みは一時ファイル → rename（途中で落ちても壊れた JSON を残さない）
//! - ファイル名は storage key をエスケープしたもの（`/` や `#` を含むため）
//! - 長すぎる key は先頭 + sha256 に縮める（NAME_MAX 255 bytes を超えないように）

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::ports::{CacheError, ResultCache};

#[derive(Debug, Clone)]
pub struct FileResultCache {
    dir: PathBuf,
}

impl FileResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_key(key)))
    }
}

/// Escaped names longer than this are shortened to a prefix plus a digest.
const MAX_NAME_LEN: usize = 200;
const HASHED_PREFIX_LEN: usize = 128;

/// Keeps `[A-Za-z0-9._-]`, percent-encodes every other byte.
///
/// Names over `MAX_NAME_LEN` become `<prefix>~<sha256 of key>`. `~` never
/// appears in an escaped name, so the two forms cannot collide.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    if out.len() <= MAX_NAME_LEN {
        return out;
    }

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    // escaped name is ASCII, so any byte offset is a char boundary
    out.truncate(HASHED_PREFIX_LEN);
    out.push('~');
    out.push_str(&hex::encode(hasher.finalize()));
    out
}

#[async_trait]
impl ResultCache for FileResultCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::Io(err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&value).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheError::Io(err)),
        }
    }
}
