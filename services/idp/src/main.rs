//! Identity provider - main entry point.

use anyhow::Context;
use idp_service::{Config, app, http};
use rust_common::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    init_tracing(
        &TracingConfig::default()
            .with_service_name("idp-service")
            .with_log_level(config.log_level.clone())
            .with_json_output(config.log_json),
    );

    info!(issuer = %config.token_issuer, ttl = ?config.token_ttl, "Starting identity provider");

    let state = app::build_state(&config)?;
    let router = http::router(state, config.request_timeout);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Identity provider listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_signal())
        .await
        .context("server error")?;

    info!("Identity provider stopped");
    Ok(())
}

/// Waits for SIGTERM or Ctrl+C.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}
