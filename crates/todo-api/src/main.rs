//! Binary entry point: serves the todos API over HTTP.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use todo_api::config::Config;
use todo_api::db::TodoDb;
use todo_api::{app_with_state, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log filtering is controlled through RUST_LOG.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let db = TodoDb::open(Path::new(&config.database_path))
        .with_context(|| format!("failed to open {}", config.database_path))?;

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind address")?;
    tracing::info!(%addr, db = %config.database_path, "server starting");

    let state = AppState { db: Arc::new(db) };
    axum::serve(listener, app_with_state(state))
        .await
        .context("server error")?;
    Ok(())
}
