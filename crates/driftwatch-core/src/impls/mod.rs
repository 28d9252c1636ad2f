//! Impls - ports の具象実装
//!
//! # 含まれる実装
//! - **InMemoryResultCache / FileResultCache**: TTL キャッシュの保存先
//! - **TracingNotifier / MultiNotifier / SlackWebhookNotifier**: 通知 sink
//! - **GitCheckout / LocalCheckout**: tracked repository の取得
//! - **AtlantisRepoConfigParser / TfBackendConfigGenerator**: repo config の読み書き
//! - **AtlantisPlanClient**: plan backend
//! - **TerraformCli**: `terraform init` / `terraform workspace list`

pub mod atlantis_config;
pub mod atlantis_plan;
pub mod config_gen;
pub mod file_cache;
pub mod git_checkout;
pub mod inmem_cache;
pub mod multi_notifier;
pub mod slack_webhook;
pub mod terraform_cli;
pub mod tracing_notifier;

// 主要な型を再エクスポート
pub use self::atlantis_config::AtlantisRepoConfigParser;
pub use self::atlantis_plan::AtlantisPlanClient;
pub use self::config_gen::TfBackendConfigGenerator;
pub use self::file_cache::FileResultCache;
pub use self::git_checkout::{GitCheckout, LocalCheckout};
pub use self::inmem_cache::InMemoryResultCache;
pub use self::multi_notifier::MultiNotifier;
pub use self::slack_webhook::SlackWebhookNotifier;
pub use self::terraform_cli::TerraformCli;
pub use self::tracing_notifier::TracingNotifier;
