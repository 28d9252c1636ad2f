//! Domain model (work items, cache records, plan results, counters, errors).
//!
//! ports / app から参照される純粋なデータ型のみ。I/O は持たない。

pub mod cache;
pub mod counter;
pub mod errors;
pub mod plan;
pub mod work_item;

pub use self::cache::{
    CacheKey, CacheRecord, DriftCacheKey, DriftCacheRecord, WorkspaceCacheKey,
    WorkspaceCacheRecord,
};
pub use self::counter::{DriftCounter, RunSummary};
pub use self::errors::{DriftError, ErrorKind};
pub use self::plan::PlanSummary;
pub use self::work_item::{DirectoryFilter, WorkItemSet};
