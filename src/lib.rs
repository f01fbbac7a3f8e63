//! # Sequencing Worker
//!
//! A service that issues human-readable, strictly ordered sequence numbers
//! (invoice numbers, PO numbers, employee ids) scoped per tenant:
//!
//! - **Patterns**: a small substitution language, e.g. `INV-{YEAR}-{COUNTER:4}`
//! - **Resets**: daily, monthly or yearly rollover, and count limits
//! - **Preview**: the next number without consuming it
//! - **Overrides**: audited manual reset and set
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Worker Service                             │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌────────────┐ │
//! │  │   API Layer │  │   Sequence  │  │   Storage   │  │  Pattern   │ │
//! │  │  (Axum)     │→ │   Engine    │→ │ File / PG   │  │  Language  │ │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod pattern;
pub mod service;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::api::create_router;
use crate::api::state::AppState;
use crate::config::AppConfig;
use crate::service::SequenceEngine;
use crate::storage::create_storage;

/// Run the sequencing worker service.
///
/// This function:
/// 1. Loads configuration from files and environment
/// 2. Installs logging and, if enabled, the Prometheus recorder
/// 3. Initializes the storage backend and the sequence engine
/// 4. Starts the HTTP server
/// 5. Handles graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded
/// - Storage backend fails to initialize
/// - HTTP server fails to bind
pub async fn run() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Sequencing Worker"
    );

    let metrics = if config.observability.metrics_enabled {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    // Initialize storage
    let storage = create_storage(&config.storage, config.engine.lock_settings()).await?;
    info!(backend = %config.storage.backend, "Storage initialized");

    let engine = SequenceEngine::builder(storage)
        .engine_config(config.engine.clone())
        .build();

    // Create application state
    let mut state = AppState::new(Arc::new(config.clone()), engine);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    // Create router
    let app = create_router(state);

    // Bind to address
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging based on configuration.
fn init_logging(config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.observability.log_format == "json" {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
