//! driftwatch - Terraform drift auditor
//!
//! # フロー
//! 1. CLI / 環境変数から設定を読む
//! 2. tracing を初期化
//! 3. collaborator を組み立てて Drifter を 1 回走らせる
//! 4. ctrl-c で run token を cancel（in-flight の unit は完了まで待つ）

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use driftwatch_core::app::{Drifter, DrifterBuilder};
use driftwatch_core::domain::{DriftError, ErrorKind, RunSummary};
use driftwatch_core::impls::{
    AtlantisPlanClient, AtlantisRepoConfigParser, FileResultCache, GitCheckout,
    InMemoryResultCache, LocalCheckout, MultiNotifier, SlackWebhookNotifier, TerraformCli,
    TfBackendConfigGenerator, TracingNotifier,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, LogFormat};

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .init(),
    }
}

fn notifier(cli: &Cli) -> Result<MultiNotifier> {
    let mut notifier = MultiNotifier::default();
    notifier.push(Arc::new(TracingNotifier));
    if let Some(url) = &cli.slack_webhook_url
        && let Some(slack) =
            SlackWebhookNotifier::new(url.as_str()).context("Failed to create Slack notifier")?
    {
        notifier.push(Arc::new(slack));
    }
    Ok(notifier)
}

fn build_drifter(cli: &Cli) -> Result<Drifter> {
    let mut builder = DrifterBuilder::new(cli.settings())
        .config_parser(AtlantisRepoConfigParser)
        .plan_query(
            AtlantisPlanClient::new(&cli.atlantis_host, &cli.atlantis_token)
                .context("Failed to create Atlantis client")?,
        )
        .terraform(TerraformCli::new(&cli.terraform_binary))
        .notifier(notifier(cli)?);

    builder = match &cli.local_path {
        Some(path) => builder.checkout(LocalCheckout::new(path)),
        None => {
            builder.checkout(GitCheckout::new(cli.github_token.clone()).with_host(&cli.git_host))
        }
    };

    builder = match &cli.cache_dir {
        Some(dir) => builder.cache(FileResultCache::new(dir)),
        None => {
            warn!("No cache directory configured; results will not persist between runs.");
            builder.cache(InMemoryResultCache::new())
        }
    };

    if cli.auto_generate_config {
        builder = builder.config_generator(
            TfBackendConfigGenerator::new().context("Failed to create config generator")?,
        );
    }

    Ok(builder.build()?)
}

/// Interrupted runs exit like a shell job killed by SIGINT.
const EXIT_CANCELLED: u8 = 130;

/// Maps a finished run to the process outcome. Cancellation is not reported as a failure.
fn exit_code(result: Result<RunSummary, DriftError>) -> Result<ExitCode> {
    match result {
        Ok(summary) => {
            info!(
                drifted = summary.drifted,
                undrifted = summary.undrifted,
                total = summary.total,
                "Done."
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.kind() == ErrorKind::Cancelled => {
            warn!("Run cancelled before completion.");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(err) => Err(err).context("Drift run failed"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let drifter = build_drifter(&cli)?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run.");
                cancel.cancel();
            }
        })
    };

    let result = drifter.run(&cancel).await;
    interrupt.abort();

    exit_code(result)
}
