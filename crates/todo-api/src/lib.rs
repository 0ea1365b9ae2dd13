//! HTTP backing store for the todo client.
//!
//! A thin axum layer over the SQLite todos table: list, show, create with
//! defaulting, merge-update, destroy. Construction is split in two so tests
//! and the binary can inject their own database.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::db::TodoDb;
use crate::error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<TodoDb>,
}

/// Router over a fresh in-memory table (tests and throwaway runs).
pub fn app() -> Result<Router, ApiError> {
    Ok(app_with_state(AppState {
        db: Arc::new(TodoDb::open_in_memory()?),
    }))
}

/// Router over externally constructed state.
pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/:id",
            get(handlers::show_todo)
                .put(handlers::update_todo)
                .patch(handlers::update_todo)
                .delete(handlers::destroy_todo),
        )
        .with_state(state)
}
