//! State listing endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::catalog::StateSummary;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StateListResponse {
    pub count: usize,
    pub states: Vec<StateSummary>,
}

/// GET /states
///
/// Distinct states of the region catalog, sorted by name.
pub async fn list_states(State(state): State<AppState>) -> Json<StateListResponse> {
    let states = state.service.catalog().states();
    Json(StateListResponse {
        count: states.len(),
        states,
    })
}

/// Build state routes
pub fn state_routes() -> Router<AppState> {
    Router::new().route("/states", get(list_states))
}
