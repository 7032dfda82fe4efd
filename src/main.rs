//! Main entry point for the finam-exporter CLI

use clap::Parser;
use finam_exporter::cli::{Cli, CliError, Commands};
use finam_exporter::metrics;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber, JSON when `LOG_FORMAT=json`
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("finam_exporter=info"));

    // Logs go to stderr so JSON progress on stdout stays parseable
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        metrics::init_metrics(addr)
            .await
            .map_err(|e| CliError::ConfigurationError(format!("metrics exporter: {e}")))?;
        info!("Prometheus metrics available at http://{addr}/metrics");
    }

    match &cli.command {
        Commands::Export(args) => {
            let orchestrator = Arc::new(cli.build_orchestrator());
            tokio::spawn({
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Ctrl+C received - cancelling export...");
                        orchestrator.cancel();
                    }
                }
            });
            args.execute(cli, orchestrator).await?;
        }
        Commands::Plan(args) => args.execute(cli.output_format)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        error!("Command failed: {}", e);
        let code = e
            .downcast_ref::<CliError>()
            .map(CliError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
