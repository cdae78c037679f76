use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use std::sync::Arc;

use intelliscrape::core::config::AppPaths;
use intelliscrape::core::logging;
use intelliscrape::server;
use intelliscrape::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging first: settings loading and backend wiring both emit
    // diagnostics that would otherwise be dropped.
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8000);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
