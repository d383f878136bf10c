//! rb-server: HTTP API, source materializer, and live station engines.
//!
//! This crate ties the other rb-* crates into a running server:
//!
//! - Axum-based HTTP API with basic auth
//! - Source materializer turning platform URLs into cached HLS folders
//! - Live station engines fed by per-station stream queues
//! - Startup disk sweep and source purge cascade
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod gc;
pub mod manifest;
pub mod middleware;
pub mod party;
pub mod router;
pub mod routes;
pub mod source;
pub mod streaming;

use std::net::SocketAddr;
use std::sync::Arc;

use rb_core::config::Config;
use rb_core::{Error, Result};

use crate::context::AppContext;
use crate::party::PartyStore;
use crate::streaming::EngineRegistry;

/// Start the radiobox server.
///
/// Initializes the database and media root, sweeps stale media folders,
/// then serves the API until a shutdown signal arrives. Live engines are
/// told to tear down before returning.
pub async fn start(config: Config) -> Result<()> {
    tokio::fs::create_dir_all(&config.media.root).await?;

    let db_path = config.server.db_path.to_string_lossy();
    let db = rb_db::pool::init_pool(&db_path)?;
    tracing::info!("Database ready at {db_path}");

    // Nothing unready survives a restart, and live output never does.
    gc::startup_sweep(&config.media.root).await?;

    let engines = EngineRegistry::new(config.media.root.clone(), config.tools.ffmpeg.clone());
    let parties = Arc::new(PartyStore::default());

    let ctx = AppContext {
        db,
        config: Arc::new(config.clone()),
        engines: engines.clone(),
        parties,
    };

    let app = router::build_router(ctx);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    // Engines delete their folders and unregister as they observe the
    // cancellation; the process exits without waiting for them.
    engines.shutdown_all().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
