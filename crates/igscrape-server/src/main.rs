mod api;
mod middleware;

use std::sync::Arc;

use igscrape_scraper::{ClientConfig, ProfileClient, RetryPolicy};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::FetchLimiter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = igscrape_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(config = ?config, "starting igscrape-server");

    let client = ProfileClient::new(ClientConfig::from_app_config(&config))?;
    let state = AppState {
        client: Arc::new(client),
        retry: RetryPolicy::new(config.max_retries, config.retry_backoff_base_secs),
    };
    let app = build_app(state, FetchLimiter::new(config.max_concurrent_fetches));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
