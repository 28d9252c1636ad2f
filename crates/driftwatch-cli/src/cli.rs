//! Command-line / environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use driftwatch_core::app::{DEFAULT_CONFIG_FILE, DEFAULT_REFERENCE, RunSettings};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// JSON structured logs.
    Json,
    #[default]
    Pretty,
}

/// Audit Terraform workspaces tracked by Atlantis for drift and orphaned state.
#[derive(Debug, Parser)]
#[command(name = "driftwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// `owner/name` of the Terraform repository.
    #[arg(long, env = "DRIFTWATCH_REPO")]
    pub repo: String,

    /// Branch plans are computed against.
    #[arg(long, env = "DRIFTWATCH_REFERENCE", default_value = DEFAULT_REFERENCE)]
    pub reference: String,

    /// Repo config file, relative to the repository root.
    #[arg(long, env = "DRIFTWATCH_CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: String,

    /// How long a cached result is trusted, e.g. `24h`, `90m`.
    #[arg(
        long,
        env = "DRIFTWATCH_CACHE_VALID_DURATION",
        default_value = "24h",
        value_parser = humantime::parse_duration
    )]
    pub cache_valid_duration: Duration,

    /// Parallel work units; 1 runs sequentially.
    #[arg(long, env = "DRIFTWATCH_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Only check directories containing one of these substrings.
    #[arg(long, env = "DRIFTWATCH_DIRECTORY_ALLOWLIST", value_delimiter = ',')]
    pub directory_allowlist: Vec<String>,

    #[arg(long, env = "DRIFTWATCH_SKIP_WORKSPACE_CHECK")]
    pub skip_workspace_check: bool,

    /// Generate the repo config from Terraform backends before parsing it.
    #[arg(long, env = "DRIFTWATCH_AUTO_GENERATE_CONFIG")]
    pub auto_generate_config: bool,

    /// Persist results here between runs. Without it the cache only lives for one run.
    #[arg(long, env = "DRIFTWATCH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[arg(long, env = "DRIFTWATCH_ATLANTIS_HOST")]
    pub atlantis_host: String,

    #[arg(long, env = "DRIFTWATCH_ATLANTIS_TOKEN", hide_env_values = true)]
    pub atlantis_token: String,

    #[arg(long, env = "DRIFTWATCH_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(long, env = "DRIFTWATCH_GIT_HOST", default_value = "github.com")]
    pub git_host: String,

    /// Use an existing checkout instead of cloning.
    #[arg(long, env = "DRIFTWATCH_LOCAL_PATH")]
    pub local_path: Option<PathBuf>,

    #[arg(long, env = "DRIFTWATCH_SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    #[arg(long, env = "DRIFTWATCH_TERRAFORM_BINARY", default_value = "terraform")]
    pub terraform_binary: String,

    #[arg(long, env = "DRIFTWATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn settings(&self) -> RunSettings {
        let mut settings = RunSettings::new(&self.repo);
        settings.reference = self.reference.clone();
        settings.config_file = self.config_file.clone();
        settings.cache_valid_duration = self.cache_valid_duration;
        settings.concurrency = self.concurrency;
        settings.directory_allowlist = self
            .directory_allowlist
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        settings.skip_workspace_check = self.skip_workspace_check;
        settings.auto_generate_config = self.auto_generate_config;
        settings
    }
}
