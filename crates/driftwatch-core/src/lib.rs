//! driftwatch-core
//!
//! Core building blocks for the driftwatch drift auditor.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（WorkItemSet, cache records, PlanSummary, DriftCounter, errors）
//! - **ports**: 外部 collaborator の抽象（Checkout, ConfigParser, PlanQuery, TerraformOps, ResultCache, Notifier, Clock）
//! - **app**: 監査ロジック（Drifter, Scheduler, CacheGate, drift_check, reconcile）
//! - **impls**: ports の具象実装（Atlantis, terraform CLI, git, Slack, file cache など）

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;

#[cfg(test)]
pub(crate) mod testing;
