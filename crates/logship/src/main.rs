// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use logship_pipeline::config::{Config, DEFAULT_SEND_INTERVAL_SECS};
use logship_pipeline::error::Error;
use logship_pipeline::intake::IntakeClient;
use logship_pipeline::pipeline::{Pipeline, PipelineSummary};
use logship_pipeline::workload::{docker_daemon_running, Workload};

/// Runs a bash command in a Docker image and ships the container's stdout
/// and stderr to a remote log intake in ordered, timestamped batches.
#[derive(Parser, Debug)]
#[command(name = "logship", version)]
struct Cli {
    /// Docker image to run the command in
    #[arg(long)]
    docker_image: String,

    /// Bash command executed inside the image
    #[arg(long)]
    bash_command: String,

    /// Base URL of the log intake
    #[arg(long)]
    endpoint: String,

    /// API key for the log intake
    #[arg(long)]
    api_key: String,

    /// Destination log group name
    #[arg(long)]
    group: String,

    /// Destination log stream name
    #[arg(long)]
    stream: String,

    /// Seconds between batch flushes
    #[arg(long, default_value_t = DEFAULT_SEND_INTERVAL_SECS)]
    send_interval_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let log_level = env::var("LOGSHIP_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("hyper=off,reqwest=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config {
        docker_image: cli.docker_image,
        bash_command: cli.bash_command,
        endpoint: cli.endpoint,
        api_key: cli.api_key,
        group: cli.group,
        stream: cli.stream,
        send_interval_secs: cli.send_interval_secs,
        ..Default::default()
    };

    match run(config).await {
        Ok(summary) => {
            info!(
                "Delivered {} log entries in {} batches{}",
                summary.entries_delivered,
                summary.batches_flushed,
                if summary.interrupted {
                    " (interrupted)"
                } else {
                    ""
                }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

async fn run(config: Config) -> Result<PipelineSummary, Error> {
    config.validate()?;

    let client = IntakeClient::new(&config)?;

    // Provision the destination before anything is started; failure here
    // means no workload runs at all.
    client.ensure_group().await?;
    client.ensure_stream().await?;

    if !docker_daemon_running().await {
        return Err(Error::WorkloadStart(
            "ensure that docker daemon is running".to_string(),
        ));
    }

    let workload = Workload::run_container(&config.docker_image, &config.bash_command)?;
    info!("Container is running");

    // First Ctrl-C asks the workload to stop and lets the pipeline drain;
    // a second one kills it. Captured logs are flushed either way.
    let shutdown = CancellationToken::new();
    let force_shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        let force_shutdown = force_shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    force_shutdown.cancel();
                }
            }
        });
    }

    let pipeline = Pipeline::new(
        Arc::new(client),
        config.bash_command.clone(),
        config.send_interval(),
    );
    pipeline.run(workload, shutdown, force_shutdown).await
}
