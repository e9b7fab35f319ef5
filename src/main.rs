//! skyblue-relay server entry point.
//!
//! Loads configuration, connects the store, starts the fan-out task and
//! serves the relay routes until SIGINT or SIGTERM.

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use skyblue_relay::api;
use skyblue_relay::app_state::AppState;
use skyblue_relay::config::{LogFormat, RelayConfig};
use skyblue_relay::store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::from_env()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        backend = ?config.store_backend,
        prefix = %config.route_prefix,
        liveness = ?config.liveness,
        "starting skyblue-relay"
    );

    let store = store::connect(&config)
        .await
        .context("failed to connect to store")?;

    let shutdown = CancellationToken::new();
    let listen_addr = config.listen_addr;
    let state = AppState::new(config, store, shutdown.clone());
    let fanout = state.streams.start_fanout(shutdown.clone()).await;

    let app = api::build_app(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    let graceful = {
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(graceful)
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Err(e) = fanout.await {
        tracing::warn!(error = %e, "fan-out task ended abnormally");
    }
    tracing::info!("server shut down gracefully");
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
