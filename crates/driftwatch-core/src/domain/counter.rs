//! DriftCounter / RunSummary

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide count of drifted workspaces for one run.
///
/// Workers only ever `increment`; the orchestrator reads it once at the end.
#[derive(Debug, Default)]
pub struct DriftCounter {
    drifted: AtomicU32,
}

impl DriftCounter {
    pub fn new() -> Self {
        Self {
            drifted: AtomicU32::new(0),
        }
    }

    /// Returns the value after the increment.
    pub fn increment(&self) -> u32 {
        self.drifted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u32 {
        self.drifted.load(Ordering::Relaxed)
    }
}

/// End-of-run totals, sent as the summary notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub drifted: u32,
    pub undrifted: u32,
    pub total: u32,
}

impl RunSummary {
    /// `total` counts declared workspaces in directories that were not filtered out.
    pub fn new(drifted: u32, total: u32) -> Self {
        Self {
            drifted,
            undrifted: total.saturating_sub(drifted),
            total,
        }
    }
}
