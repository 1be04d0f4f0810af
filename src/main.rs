//! waveserver - A Wave Server for Seismic Archives
//!
//! This is the main entry point for the waveserver binary.
//! It loads the archive, sets up the TCP listener, and handles incoming
//! connections.

use anyhow::Context as _;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use waveserver::archive::{ArchivePool, CatalogCache, InMemoryArchive};
use waveserver::commands::{CommandHandler, CommandRegistry, Context};
use waveserver::connection::{handle_connection, ConnectionStats};
use waveserver::Config;

fn print_banner(config: &Config, channels: usize) {
    println!(
        r#"
waveserver v{} - Earthworm/Winston compatible wave server
──────────────────────────────────────────────────────────────
Server started on {}
Serving {} channel(s), protocol version {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        waveserver::VERSION,
        config.bind_address(),
        channels,
        waveserver::PROTOCOL_VERSION
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Load the archive (shared across all connections)
    let archive = match &config.snapshot {
        Some(path) => InMemoryArchive::from_snapshot_file(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?,
        None => {
            warn!("No --snapshot given, serving an empty archive");
            InMemoryArchive::new()
        }
    }
    .with_max_samples(config.max_samples);
    let channels = archive.len();
    info!(channels, "Archive loaded");

    let ctx = Context {
        pool: ArchivePool::new(Arc::new(archive), config.pool_size),
        policy: config.policy(),
        catalog: Arc::new(CatalogCache::new(config.catalog_ttl())),
        stats: Arc::new(ConnectionStats::new()),
    };
    info!(
        pool_size = ctx.pool.size(),
        max_days = ctx.policy.max_days,
        embargo = ctx.policy.embargo,
        "Archive access configured"
    );
    let handler = CommandHandler::new(ctx, Arc::new(CommandRegistry::new()));

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("binding {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    print_banner(&config, channels);

    // Set up graceful shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C, running until killed");
                std::future::pending::<()>().await
            }
        }
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, handler.clone(), config.max_line) => {}
        _ = shutdown => {}
    }

    handler.context().pool.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, handler: CommandHandler, max_line: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, max_line).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
