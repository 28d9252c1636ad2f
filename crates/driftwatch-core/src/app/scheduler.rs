//! Scheduler - bounded fan-out executor
//!
//! # フロー
//! 1. work unit を FIFO キューに積む（投入順は保持）
//! 2. `concurrency` 本の worker がキューから pull して実行
//! 3. 最初のエラーで pool の token を cancel
//! 4. 実行中の unit は最後まで走らせる（強制中断しない）、未着手の unit は捨てる
//!
//! `concurrency <= 1` のときは単純な逐次実行になる。

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::DriftError;

/// Ways a pool can stop without a unit reporting an error itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("run cancelled")]
    Cancelled,

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl From<Interrupted> for DriftError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => DriftError::Cancelled,
            Interrupted::Panicked(msg) => DriftError::WorkerPanicked(msg),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every unit, or stop at the first error.
    ///
    /// Each unit gets a token derived from `cancel`. Units that never started
    /// when the pool was cancelled are dropped.
    pub async fn run<U, Fut, E>(&self, units: Vec<U>, cancel: &CancellationToken) -> Result<(), E>
    where
        U: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: From<Interrupted> + Send + 'static,
    {
        if self.concurrency <= 1 {
            return run_sequential(units, cancel).await;
        }
        self.run_pooled(units, cancel).await
    }

    async fn run_pooled<U, Fut, E>(
        &self,
        units: Vec<U>,
        cancel: &CancellationToken,
    ) -> Result<(), E>
    where
        U: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: From<Interrupted> + Send + 'static,
    {
        let pool_cancel = cancel.child_token();
        let workers = self.concurrency.min(units.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(units)));
        let first_error: Arc<StdMutex<Option<E>>> = Arc::new(StdMutex::new(None));

        let mut joins = JoinSet::new();
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let token = pool_cancel.clone();
            let first_error = Arc::clone(&first_error);

            joins.spawn(async move {
                loop {
                    if token.is_cancelled() {
                        debug!(worker_id, "worker observed cancellation");
                        break;
                    }
                    // ロックは pop の間だけ（unit 実行中は保持しない）
                    let next = { queue.lock().await.pop_front() };
                    let Some(unit) = next else {
                        break;
                    };
                    if let Err(err) = unit(token.clone()).await {
                        debug!(worker_id, "unit failed, cancelling pool");
                        record_first(&first_error, err);
                        token.cancel();
                        break;
                    }
                }
            });
        }

        while let Some(joined) = joins.join_next().await {
            if let Err(join_err) = joined {
                pool_cancel.cancel();
                record_first(&first_error, Interrupted::Panicked(join_err.to_string()).into());
            }
        }

        let err = first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(err) = err {
            return Err(err);
        }
        if pool_cancel.is_cancelled() {
            return Err(Interrupted::Cancelled.into());
        }
        Ok(())
    }
}

async fn run_sequential<U, Fut, E>(units: Vec<U>, cancel: &CancellationToken) -> Result<(), E>
where
    U: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: From<Interrupted>,
{
    let token = cancel.child_token();
    for unit in units {
        if token.is_cancelled() {
            return Err(Interrupted::Cancelled.into());
        }
        unit(token.clone()).await?;
    }
    Ok(())
}

fn record_first<E>(slot: &StdMutex<Option<E>>, err: E) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        *slot = Some(err);
    }
}
