#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use args::Args;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use vigil_config::Config;
use vigil_harness::{Harness, HarnessSettings, Matrix, run_matrix};
use vigil_llm::{LlmClient, Provider, RetryPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if args.verbose {
        config.harness.verbose = true;
    }

    vigil_telemetry::init(&config.telemetry)?;

    tracing::info!(config_path = %args.config.display(), "starting vigil");

    let retry = RetryPolicy {
        max_retries: config.harness.num_retries,
        backoff: config.harness.retry_backoff,
    };
    let client = Arc::new(LlmClient::from_config(&config.llm, retry).await?);
    let capabilities = client.capabilities();
    let harness = Harness::new(client, HarnessSettings::from(&config.harness));

    let matrix = Matrix::from_config(&config.matrix)?
        .filter(&args.models, args.case.as_deref())
        .supported_by(&capabilities);
    if matrix.is_empty() {
        anyhow::bail!("no cases match the given filters");
    }

    let concurrency = args.concurrency.unwrap_or(config.harness.concurrency).max(1);

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_clone.cancel();
        }
    });

    let report = tokio::select! {
        report = run_matrix(&harness, &matrix, concurrency) => report,
        () = shutdown.cancelled() => {
            tracing::warn!("interrupted, abandoning remaining cases");
            return Ok(ExitCode::from(130));
        }
    };

    println!("{report}");

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
