use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use homecenter::Config;
use homecenter::ConfigEntries;
use homecenter::LogLevel;
use homecenter::StateStore;
use homecenter::controller::VirtualHomecenter;

/// Bridge Homecenter hubs into a local state store and HTTP API.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "homecenter.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.env_filter(args.log_level))
        .init();

    tracing::info!("homecenterd starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let entries = Arc::new(ConfigEntries::new(Arc::new(StateStore::new())));

    for (entry_id, entry) in &config.entries {
        let controller = VirtualHomecenter::new(entry.components.clone());
        match entries
            .setup_entry(entry_id, &entry.credentials(), Box::new(controller))
            .await
        {
            Ok(()) => tracing::info!("[{}] Entry ready", entry_id),
            Err(e) => tracing::error!("[{}] Setup failed: {}", entry_id, e),
        }
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let server = if config.api.enabled {
        let listen = config.api.listen.clone();
        let port = config.api.port;
        let entries = entries.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = homecenter::api::serve(listen, port, entries, shutdown_rx).await {
                tracing::error!("{}", e);
            }
        }))
    } else {
        tracing::info!("HTTP API disabled");
        None
    };

    tracing::info!("Press Ctrl+C to exit");
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }

    let _ = shutdown_tx.send(());
    if let Some(server) = server {
        server.await.context("API server task panicked")?;
    }

    entries.unload_all().await;
    tracing::info!("homecenterd shutdown complete");

    Ok(())
}
