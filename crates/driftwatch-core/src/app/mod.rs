//! App - アプリケーション層
//!
//! ports を組み合わせて drift 監査のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **DrifterBuilder / Drifter**: ワイヤリングと 1 run 分のオーケストレーション
//! - **Scheduler**: bounded fan-out executor（cancel 伝播付き）
//! - **CacheGate**: TTL による冪等性ゲート
//! - **drift_check**: (directory, workspace) ごとの drift 判定
//! - **reconcile**: remote にだけ存在する workspace の検出

pub mod builder;
pub mod cache_gate;
pub mod context;
pub mod drift_check;
pub mod drifter;
pub mod reconcile;
pub mod scheduler;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DrifterBuilder};
pub use self::cache_gate::{Admission, CacheGate};
pub use self::context::{
    DEFAULT_CACHE_VALID_DURATION, DEFAULT_CONFIG_FILE, DEFAULT_REFERENCE, RunContext, RunSettings,
};
pub use self::drift_check::{
    DriftOutcome, check_directory, check_workspace, find_drifted_workspaces,
};
pub use self::drifter::Drifter;
pub use self::reconcile::{
    DEFAULT_WORKSPACE, ReconcileOutcome, find_extra_workspaces, reconcile_directory,
};
pub use self::scheduler::{Interrupted, Scheduler};
