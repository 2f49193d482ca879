// src/main.rs

//! The main entry point for the replication cluster orchestrator.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

use topoward::cli::Cli;
use topoward::core::cancellation::{self, CancellationToken};
use topoward::core::config::Config;
use topoward::core::constants::EXIT_KV_INIT_IMPOSSIBLE;
use topoward::core::control_loop::{self, ControlLoopState};
use topoward::core::errors::OrchestratorError;
use topoward::core::lock::{self, StdinConfirmer};
use topoward::core::log_file::RollingFileWriter;
use topoward::core::notify::BrevoNotifier;
use topoward::core::probe::MySqlNodeProbe;
use topoward::core::proxy::MySqlProxyAdminClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match cli.into_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.log_file) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!("starting orchestrator for '{}'", config.master_name);

    if let Err(e) = run(config).await {
        error!("fatal error: {}", e);
        let code = match e {
            OrchestratorError::KvInitFailed(_) => EXIT_KV_INIT_IMPOSSIBLE,
            _ => 1,
        };
        std::process::exit(code);
    }

    Ok(())
}

/// Initializes structured logging: an `EnvFilter`-driven console layer and a
/// second layer writing plain lines to the configured log file through the
/// soft rolling policy.
fn init_logging(log_file: &str) -> anyhow::Result<()> {
    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,topoward=debug".to_string());
    let file_writer = RollingFileWriter::open(log_file)?;

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(move || file_writer.clone()),
        )
        .init();
    Ok(())
}

async fn run(config: Config) -> Result<(), OrchestratorError> {
    let probe = MySqlNodeProbe::new(
        config.db_user.clone(),
        config.db_pass.clone(),
        config.db_port,
        config.conn_timeout,
    );
    let proxy = MySqlProxyAdminClient::connect(
        &config.proxy_host,
        config.proxy_admin_port,
        &config.proxy_admin_user,
        &config.proxy_admin_pass,
        config.conn_timeout,
    )
    .await?;
    let notifier = BrevoNotifier::from_env_or_stdout(config.notify_to.clone());
    let confirmer = StdinConfirmer;
    let cancel = CancellationToken::new();

    let start_outcome =
        lock::acquire_on_start(&proxy, &confirmer, config.ignore_start_warning).await?;
    if !start_outcome.proceed {
        info!("start aborted by operator at the dangerous-start prompt");
        return Ok(());
    }
    if let Err(e) = notifier.start(start_outcome.dangerous, chrono::Utc::now()).await {
        error!("failed to send start notification: {}", e);
    }

    let hotkey_task = tokio::spawn(cancellation::run_hotkey_listener(cancel.clone()));

    let state = ControlLoopState::new(config);
    control_loop::run(state, &probe, &proxy, notifier.as_ref(), &cancel).await;

    hotkey_task.abort();
    lock::release_on_shutdown(&proxy).await?;
    if let Err(e) = notifier.stop(chrono::Utc::now()).await {
        error!("failed to send stop notification: {}", e);
    }

    Ok(())
}
