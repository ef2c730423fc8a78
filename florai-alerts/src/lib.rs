//! florai-alerts library interface
//!
//! Exposes the notification pipeline and the HTTP router for integration
//! testing.

pub mod api;
pub mod classifier;
pub mod error;
pub mod notify;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::notify::NotificationPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Notification pipeline, shared by every request
    pub pipeline: Arc<NotificationPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last failed request, surfaced by `/health`
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<NotificationPipeline>) -> Self {
        Self {
            pipeline,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
