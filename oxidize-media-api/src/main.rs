use anyhow::Context;
use clap::Parser;
use oxidize_media_api::{router, spawn_sweeper, AppState, ServerArgs, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "oxidize_media=info,oxidize_media_api=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from(ServerArgs::parse());
    if config.api_key.is_none() {
        warn!("API_SECRET_KEY is not set; every /api request will be rejected");
    }

    let state = AppState::new(&config);
    state.temp().ensure_dir().with_context(|| {
        format!(
            "Failed to create temp directory {}",
            state.temp().directory().display()
        )
    })?;

    let sweeper = config
        .sweep_interval
        .map(|every| spawn_sweeper(state.temp().clone(), every));

    let app = router(state, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    info!(
        address = %config.bind,
        temp_dir = %config.temp.directory.display(),
        version = env!("CARGO_PKG_VERSION"),
        "oxidize-media API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
