//! Region endpoints
//!
//! - `GET /regions[?search=]` catalog listing
//! - `GET /regions/:id[?period=]` resolved metrics for one region
//! - `GET /regions/nearest?lat=&lng=` nearest catalog region
//! - `GET /regions/nearest/metrics?lat=&lng=[&period=]` nearest region, resolved

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use rozgar_common::{Coordinate, Region, ResolutionOutcome};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::{NearestRegion, NearestResolution};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionListResponse {
    pub count: usize,
    pub regions: Vec<Region>,
}

/// Optional `period` filter; blank means latest
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

impl PeriodQuery {
    fn period(&self) -> Option<&str> {
        normalize_period(self.period.as_deref())
    }
}

/// Raw coordinate parameters, validated by hand so bad input maps to the
/// JSON error envelope rather than a plain-text extractor rejection
#[derive(Debug, Deserialize)]
pub struct CoordinateQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub period: Option<String>,
}

impl CoordinateQuery {
    fn coordinate(&self) -> ApiResult<Coordinate> {
        let latitude = parse_param("lat", self.lat.as_deref())?;
        let longitude = parse_param("lng", self.lng.as_deref())?;
        let coordinate = Coordinate::new(latitude, longitude);
        coordinate.validate()?;
        Ok(coordinate)
    }
}

fn normalize_period(period: Option<&str>) -> Option<&str> {
    period.map(str::trim).filter(|p| !p.is_empty())
}

fn parse_param(name: &str, raw: Option<&str>) -> ApiResult<f64> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing query parameter '{}'", name)))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::BadRequest(format!("'{}' must be a number, got '{}'", name, raw)))
}

/// GET /regions
pub async fn list_regions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<RegionListResponse> {
    let catalog = state.service.catalog();
    let regions: Vec<Region> = match query.search.as_deref() {
        Some(term) => catalog.search(term).into_iter().cloned().collect(),
        None => catalog.all().to_vec(),
    };

    Json(RegionListResponse {
        count: regions.len(),
        regions,
    })
}

/// GET /regions/:id
///
/// Always answers with a structurally complete outcome for a known region;
/// `provenance` tells whether it is live or synthetic.
pub async fn get_region_metrics(
    State(state): State<AppState>,
    Path(region_id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<ResolutionOutcome>> {
    let outcome = state.service.resolve(&region_id, query.period()).await?;
    Ok(Json(outcome))
}

/// GET /regions/nearest
pub async fn nearest_region(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> ApiResult<Json<NearestRegion>> {
    let coordinate = query.coordinate()?;
    let nearest = state.service.nearest(&coordinate)?;
    Ok(Json(nearest))
}

/// GET /regions/nearest/metrics
pub async fn nearest_region_metrics(
    State(state): State<AppState>,
    Query(query): Query<CoordinateQuery>,
) -> ApiResult<Json<NearestResolution>> {
    let coordinate = query.coordinate()?;
    let resolution = state
        .service
        .resolve_nearest(&coordinate, normalize_period(query.period.as_deref()))
        .await?;
    Ok(Json(resolution))
}

/// Build region routes
pub fn region_routes() -> Router<AppState> {
    Router::new()
        .route("/regions", get(list_regions))
        .route("/regions/nearest", get(nearest_region))
        .route("/regions/nearest/metrics", get(nearest_region_metrics))
        .route("/regions/:id", get(get_region_metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("lat", Some(" 23.26 ")).unwrap(), 23.26);
        assert!(matches!(parse_param("lat", None), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_param("lat", Some("")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_param("lat", Some("north")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_param("lat", Some("NaN")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_out_of_range_coordinate_rejected() {
        let query = CoordinateQuery {
            lat: Some("123".to_string()),
            lng: Some("77".to_string()),
            period: None,
        };
        assert!(matches!(
            query.coordinate(),
            Err(ApiError::Common(rozgar_common::Error::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_blank_period_means_latest() {
        assert_eq!(normalize_period(Some("  ")), None);
        assert_eq!(normalize_period(Some("2023-2024")), Some("2023-2024"));
    }
}
