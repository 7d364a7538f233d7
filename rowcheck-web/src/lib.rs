//! rowcheck-web library interface
//!
//! Exposes the router and its building blocks for integration testing

pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod store;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::storage::Storage;
use crate::store::TaskStore;
use crate::worker::Dispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Task registry shared with the worker pool
    pub store: Arc<TaskStore>,
    /// Storage root for uploads and results
    pub storage: Storage,
    /// Job queue handle
    pub dispatcher: Dispatcher,
    /// Upper bound on upload request bodies
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<TaskStore>,
        storage: Storage,
        dispatcher: Dispatcher,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            storage,
            dispatcher,
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::upload_routes(state.max_upload_bytes))
        .merge(api::status_routes())
        .merge(api::download_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
