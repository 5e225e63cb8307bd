//! consensus-server binary: serves `/api/orchestrate` over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coordination::ensemble::OrchestrationService;
use coordination::generation::OllamaBackend;
use tracing::info;

use consensus_server::{router, serve, Args, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ServerConfig::from_args(&args)?;

    info!(
        ollama = %config.ollama_url,
        models = ?config.models,
        fan_out = ?config.fan_out,
        deadline_secs = ?config.run_deadline_secs,
        "Starting consensus server"
    );

    let backend = OllamaBackend::new(config.ollama()).context("Failed to build Ollama client")?;
    let service = OrchestrationService::new(Arc::new(backend), config.models.clone())
        .context("Invalid model list")?
        .with_config(config.orchestrator())
        .with_limits(config.limits())
        .shared();

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, router(service), shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
