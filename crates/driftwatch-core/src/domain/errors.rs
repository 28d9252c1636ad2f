//! Errors - 実行エラーと分類
//!
//! # 分類
//! - Temporary: plan-query だけが返す。その workspace だけスキップ（`DriftError` にはならない）
//! - Fatal: `DriftError` の全 variant。run 全体を cancel する
//! - Warning: repo config が空。ログのみ

use thiserror::Error;

use crate::ports::{
    CacheError, CheckoutError, GenerateError, NotifyError, ParseError, QueryError, TerraformError,
};

/// ErrorKind は運用上の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Abort the run (cancel every in-flight unit).
    Fatal,
    /// The run was stopped from outside or by another unit's failure.
    Cancelled,
}

/// DriftError is the terminal error of a run.
#[derive(Debug, Error)]
pub enum DriftError {
    #[error("failed to checkout repo {repo}: {source}")]
    Checkout {
        repo: String,
        #[source]
        source: CheckoutError,
    },

    #[error("failed to generate repo config: {0}")]
    GenerateConfig(#[source] GenerateError),

    #[error("failed to parse repo config: {0}")]
    ParseConfig(#[source] ParseError),

    #[error("failed to {op} cache value for {key}: {source}")]
    Cache {
        op: &'static str,
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("failed to get plan summary for ({dir}#{workspace}): {source}")]
    PlanQuery {
        dir: String,
        workspace: String,
        #[source]
        source: QueryError,
    },

    #[error("failed to {op} in {dir}: {source}")]
    Terraform {
        op: &'static str,
        dir: String,
        #[source]
        source: TerraformError,
    },

    #[error("failed to notify {what}: {source}")]
    Notify {
        what: String,
        #[source]
        source: NotifyError,
    },

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("run cancelled")]
    Cancelled,
}

impl DriftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriftError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Fatal,
        }
    }

    pub(crate) fn notify(what: impl Into<String>, source: NotifyError) -> Self {
        DriftError::Notify {
            what: what.into(),
            source,
        }
    }
}
