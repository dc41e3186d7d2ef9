//! rozgar-dd library - District Data module
//!
//! Resolves district-level MGNREGA statistics from the data.gov.in API,
//! degrading to synthetic data when no live source has usable records, and
//! maps GPS coordinates to the nearest known district.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod services;

pub use error::{ApiError, ApiResult, DataError};
use services::DistrictDataService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DistrictDataService>,
    /// Server startup time, for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<DistrictDataService>) -> Self {
        Self {
            service,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::region_routes())
        .merge(api::state_routes())
        .merge(api::refresh_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Dashboard front end is served from another origin
        .layer(CorsLayer::permissive())
}
