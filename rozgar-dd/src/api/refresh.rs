//! Cache refresh endpoint

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub status: String,
    /// Cached outcomes dropped
    pub invalidated: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// POST /refresh
///
/// Clears the resolution cache; the next read of any region re-runs the
/// full cascade.
pub async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let invalidated = state.service.refresh().await;
    Json(RefreshResponse {
        status: "ok".to_string(),
        invalidated,
        refreshed_at: state.service.last_refresh().await,
    })
}

pub fn refresh_routes() -> Router<AppState> {
    Router::new().route("/refresh", post(refresh))
}
