//! Ports - 抽象化レイヤー
//!
//! engine が外部システム（git, repo config, plan backend, terraform,
//! cache store, 通知先）に触れるときは必ずここの trait を通す。
//! 実装は `impls`、テスト用の fake は `testing` にある。

pub mod checkout;
pub mod clock;
pub mod config_parser;
pub mod notifier;
pub mod plan_query;
pub mod result_cache;
pub mod terraform;

// 主要な trait を再エクスポート
pub use self::checkout::{Checkout, CheckoutDir, CheckoutError};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::config_parser::{ConfigGenerator, ConfigParser, GenerateError, ParseError};
pub use self::notifier::{Notifier, NotifyError};
pub use self::plan_query::{PlanQuery, PlanRequest, QueryError};
pub use self::result_cache::{CacheError, ResultCache};
pub use self::terraform::{TerraformError, TerraformOps};
