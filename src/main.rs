//! respkv server entry point: parses flags, builds the shared store and
//! replication metadata, and serves connections until Ctrl+C.

use clap::Parser;
use respkv::commands::CommandHandler;
use respkv::connection::{handle_connection, ConnectionStats};
use respkv::replication::ReplicationInfo;
use respkv::storage::{ExpirySweeper, Store};
use respkv::Config;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let storage = Arc::new(Store::new());
    let replication = Arc::new(config.replication());
    match replication.master_addr() {
        Some(master) => {
            info!(role = %replication.role(), master = %master, "Replication role configured")
        }
        None => info!(role = %replication.role(), "Replication role configured"),
    }

    let _sweeper = config
        .sweep_interval()
        .map(|interval| ExpirySweeper::start(Arc::clone(&storage), interval));

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(version = respkv::VERSION, "Listening on {}", config.bind_address());

    tokio::select! {
        _ = accept_loop(listener, storage, replication, Arc::clone(&stats)) => {}
        result = signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received, stopping server...");
        }
    }

    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    storage: Arc<Store>,
    replication: Arc<ReplicationInfo>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage), Arc::clone(&replication));
                tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
