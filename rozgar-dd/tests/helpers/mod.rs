//! Test helper utilities for rozgar-dd integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use rozgar_common::time::SystemClock;
use rozgar_common::Region;
use serde_json::{json, Value};

use rozgar_dd::catalog::RegionCatalog;
use rozgar_dd::services::alias_resolver::RawRecord;
use rozgar_dd::services::upstream::UpstreamQuery;
use rozgar_dd::services::{
    CandidateSource, CascadePolicy, DistrictDataService, LiveDataFlags, ResolutionCache,
    SourceCascade, UpstreamFetcher,
};
use rozgar_dd::{build_router, AppState, DataError};

/// Upstream stand-in: answers every query with one record per region in a
/// fixed list, carrying a job card count; regions not listed are absent
pub struct FakeUpstream {
    pub calls: AtomicUsize,
    known: Vec<(String, Value)>,
}

impl FakeUpstream {
    pub fn new(records: &[(&str, Value)]) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            known: records
                .iter()
                .map(|(code, record)| (code.to_string(), record.clone()))
                .collect(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamFetcher for FakeUpstream {
    async fn fetch(&self, _query: &UpstreamQuery<'_>) -> Result<Vec<RawRecord>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut records = Vec::new();
        for (code, record) in &self.known {
            let mut record = record.as_object().cloned().unwrap_or_default();
            record.insert("district_code".to_string(), json!(code));
            records.push(record);
        }
        Ok(records)
    }
}

fn candidates() -> Vec<CandidateSource> {
    vec![CandidateSource {
        name: "district-monthly".to_string(),
        resource: "monthly".to_string(),
        period_field: Some("fin_year".to_string()),
        priority: 1,
        filter_by_district_code: false,
    }]
}

fn cache() -> ResolutionCache {
    ResolutionCache::new(Duration::from_secs(3600), Arc::new(SystemClock))
}

/// Service backed by `upstream`, with live lookups enabled
pub fn live_service(upstream: Arc<FakeUpstream>) -> Arc<DistrictDataService> {
    let cascade = SourceCascade::new(
        upstream,
        candidates(),
        CascadePolicy {
            periods: vec!["2024-2025".to_string(), "2023-2024".to_string()],
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1),
        },
    );
    Arc::new(
        DistrictDataService::new(RegionCatalog::builtin(), cache())
            .with_cascade(cascade, Duration::from_secs(10))
            .with_flags(LiveDataFlags {
                real_data_enabled: true,
                api_key_configured: true,
            }),
    )
}

/// Synthetic-only service over `catalog`
pub fn synthetic_service(catalog: RegionCatalog) -> Arc<DistrictDataService> {
    Arc::new(
        DistrictDataService::new(catalog, cache())
            .with_default_period(Some("2024-2025".to_string())),
    )
}

pub fn app(service: Arc<DistrictDataService>) -> Router {
    build_router(AppState::new(service))
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

pub fn region(id: &str, name: &str, lat: f64, lng: f64) -> Region {
    let (state_code, district_code) = Region::split_id(id).unwrap();
    Region {
        id: id.to_string(),
        name: name.to_string(),
        localized_name: name.to_string(),
        state: "Madhya Pradesh".to_string(),
        state_code: state_code.to_string(),
        district_code: district_code.to_string(),
        coordinate: rozgar_common::Coordinate::new(lat, lng),
    }
}
