//! Plan summary returned by the plan-query backend.

use serde::{Deserialize, Serialize};

/// Result of one plan computation for (directory, workspace).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// A plan/apply is already in flight for this workspace.
    pub locked: bool,
    pub has_changes: bool,
    /// Short human-readable summary, e.g. `Plan: 1 to add, 0 to change, 0 to destroy.`
    pub summary_text: String,
}

impl PlanSummary {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn drifted(summary_text: impl Into<String>) -> Self {
        Self {
            locked: false,
            has_changes: true,
            summary_text: summary_text.into(),
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}
