//! District data service
//!
//! Front door for the resolution pipeline: region lookup, cache, source
//! cascade and synthetic fallback. Shared by every HTTP handler.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rozgar_common::{Coordinate, Region, ResolutionOutcome};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::catalog::RegionCatalog;
use crate::error::DataError;
use crate::services::cascade::SourceCascade;
use crate::services::geo_resolver::{self, NearestRegion};
use crate::services::resolution_cache::{CacheKey, ResolutionCache};
use crate::services::synthetic::SyntheticGenerator;

/// Whether live upstream lookups were requested and possible
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDataFlags {
    pub real_data_enabled: bool,
    pub api_key_configured: bool,
}

impl LiveDataFlags {
    pub fn live_lookups(&self) -> bool {
        self.real_data_enabled && self.api_key_configured
    }
}

/// Data-source summary reported by `/health`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceStatus {
    #[serde(flatten)]
    pub flags: LiveDataFlags,
    pub live_lookups: bool,
    pub candidates: Vec<String>,
    pub region_count: usize,
    pub cached_entries: usize,
    pub cache_ttl_secs: u64,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Nearest region plus its resolved metrics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestResolution {
    pub nearest: NearestRegion,
    pub outcome: ResolutionOutcome,
}

pub struct DistrictDataService {
    catalog: RegionCatalog,
    cache: ResolutionCache,
    cascade: Option<SourceCascade>,
    generator: SyntheticGenerator,
    resolution_timeout: Duration,
    /// Period stamped on synthetic outcomes when none was requested
    default_period: Option<String>,
    flags: LiveDataFlags,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl DistrictDataService {
    /// Synthetic-only service; see [`with_cascade`](Self::with_cascade)
    pub fn new(catalog: RegionCatalog, cache: ResolutionCache) -> Self {
        if catalog.is_empty() {
            tracing::error!("Region catalog is empty; every region lookup will fail");
        }
        Self {
            catalog,
            cache,
            cascade: None,
            generator: SyntheticGenerator::new(),
            resolution_timeout: Duration::from_secs(120),
            default_period: None,
            flags: LiveDataFlags::default(),
            last_refresh: RwLock::new(None),
        }
    }

    /// Enable live lookups through `cascade`, bounded by `resolution_timeout`
    pub fn with_cascade(mut self, cascade: SourceCascade, resolution_timeout: Duration) -> Self {
        self.default_period = cascade.policy().periods.first().cloned();
        self.cascade = Some(cascade);
        self.resolution_timeout = resolution_timeout;
        self
    }

    pub fn with_default_period(mut self, period: Option<String>) -> Self {
        self.default_period = period;
        self
    }

    pub fn with_flags(mut self, flags: LiveDataFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve metrics for a region id: cache, then cascade or synthetic
    pub async fn resolve(
        &self,
        region_id: &str,
        period: Option<&str>,
    ) -> Result<ResolutionOutcome, DataError> {
        let region = self
            .catalog
            .get(region_id)
            .ok_or_else(|| DataError::RegionNotFound(region_id.to_string()))?;
        self.resolve_region(region, period).await
    }

    async fn resolve_region(
        &self,
        region: &Region,
        period: Option<&str>,
    ) -> Result<ResolutionOutcome, DataError> {
        let key = CacheKey::new(region.id.clone(), period);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(region_id = %region.id, period = ?period, "Cache hit");
            return Ok(hit);
        }

        let outcome = match &self.cascade {
            Some(cascade) => {
                match tokio::time::timeout(self.resolution_timeout, cascade.resolve(region, period))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(
                            region_id = %region.id,
                            timeout_secs = self.resolution_timeout.as_secs(),
                            "Resolution timed out, using synthetic metrics"
                        );
                        cascade.synthetic(region, period)
                    }
                }
            }
            None => {
                let period = period.or(self.default_period.as_deref());
                ResolutionOutcome::new(region.id.clone(), self.generator.generate(region, period))
            }
        };

        self.cache.put(key, outcome.clone()).await;
        Ok(outcome)
    }

    pub fn nearest(&self, coordinate: &Coordinate) -> Result<NearestRegion, DataError> {
        geo_resolver::nearest_region(self.catalog.all(), coordinate)
    }

    /// Nearest region to `coordinate`, then the regular resolution path
    pub async fn resolve_nearest(
        &self,
        coordinate: &Coordinate,
        period: Option<&str>,
    ) -> Result<NearestResolution, DataError> {
        let nearest = self.nearest(coordinate)?;
        let outcome = self.resolve_region(&nearest.region, period).await?;
        Ok(NearestResolution { nearest, outcome })
    }

    /// Drop every cached outcome; returns how many were dropped
    pub async fn refresh(&self) -> usize {
        let dropped = self.cache.invalidate_all().await;
        *self.last_refresh.write().await = Some(rozgar_common::time::now());
        tracing::info!(dropped, "Resolution cache invalidated");
        dropped
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.read().await
    }

    pub async fn status(&self) -> DataSourceStatus {
        DataSourceStatus {
            flags: self.flags,
            live_lookups: self.cascade.is_some(),
            candidates: self
                .cascade
                .as_ref()
                .map(|c| c.candidates().iter().map(|s| s.name.clone()).collect())
                .unwrap_or_default(),
            region_count: self.catalog.len(),
            cached_entries: self.cache.len().await,
            cache_ttl_secs: self.cache.ttl().as_secs(),
            last_refresh: self.last_refresh().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::alias_resolver::RawRecord;
    use crate::services::cascade::CascadePolicy;
    use crate::services::upstream::{CandidateSource, UpstreamFetcher, UpstreamQuery};
    use async_trait::async_trait;
    use rozgar_common::time::ManualClock;
    use rozgar_common::Provenance;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl UpstreamFetcher for CountingFetcher {
        async fn fetch(&self, query: &UpstreamQuery<'_>) -> Result<Vec<RawRecord>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let record = json!({
                "district_code": query.region.district_code,
                "total_job_cards": "1,000"
            });
            Ok(record.as_object().cloned().into_iter().collect())
        }
    }

    fn cache(clock: Arc<ManualClock>) -> ResolutionCache {
        ResolutionCache::new(Duration::from_secs(3600), clock)
    }

    fn live_service(delay: Duration, timeout: Duration) -> (DistrictDataService, Arc<CountingFetcher>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay,
        });
        let cascade = SourceCascade::new(
            fetcher.clone(),
            vec![CandidateSource {
                name: "monthly".to_string(),
                resource: "r".to_string(),
                period_field: Some("fin_year".to_string()),
                priority: 1,
                filter_by_district_code: false,
            }],
            CascadePolicy {
                periods: vec!["2024-2025".to_string()],
                max_retries: 0,
                retry_base_delay: Duration::from_millis(1),
            },
        );
        let service = DistrictDataService::new(RegionCatalog::builtin(), cache(clock.clone()))
            .with_cascade(cascade, timeout)
            .with_flags(LiveDataFlags {
                real_data_enabled: true,
                api_key_configured: true,
            });
        (service, fetcher, clock)
    }

    #[tokio::test]
    async fn test_unknown_region_is_not_found() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = DistrictDataService::new(RegionCatalog::builtin(), cache(clock));
        assert!(matches!(
            service.resolve("99_9999", None).await,
            Err(DataError::RegionNotFound(id)) if id == "99_9999"
        ));
        assert!(matches!(
            service.resolve("not-an-id", None).await,
            Err(DataError::RegionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_synthetic_only_uses_default_period() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = DistrictDataService::new(RegionCatalog::builtin(), cache(clock))
            .with_default_period(Some("2024-2025".to_string()));

        let outcome = service.resolve("17_1728", None).await.unwrap();
        assert_eq!(outcome.provenance, Provenance::Synthetic);
        assert_eq!(outcome.reporting_period.as_deref(), Some("2024-2025"));

        let outcome = service.resolve("17_1728", Some("2022-2023")).await.unwrap();
        assert_eq!(outcome.reporting_period.as_deref(), Some("2022-2023"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream_until_refresh() {
        let (service, fetcher, _clock) = live_service(Duration::ZERO, Duration::from_secs(5));

        let first = service.resolve("17_1728", None).await.unwrap();
        let second = service.resolve("17_1728", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.provenance, Provenance::LivePartial);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        assert_eq!(service.refresh().await, 1);
        assert!(service.last_refresh().await.is_some());

        service.resolve("17_1728", None).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_expiry_reruns_cascade() {
        let (service, fetcher, clock) = live_service(Duration::ZERO, Duration::from_secs(5));

        service.resolve("17_1728", None).await.unwrap();
        clock.advance(Duration::from_secs(3600));
        service.resolve("17_1728", None).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolution_timeout_falls_back_to_synthetic() {
        let (service, _fetcher, _clock) = live_service(Duration::from_secs(10), Duration::from_millis(20));

        let outcome = service.resolve("17_1728", None).await.unwrap();
        assert_eq!(outcome.provenance, Provenance::Synthetic);
        assert_eq!(outcome.reporting_period.as_deref(), Some("2024-2025"));
    }

    #[tokio::test]
    async fn test_resolve_nearest() {
        let (service, _fetcher, _clock) = live_service(Duration::ZERO, Duration::from_secs(5));

        let result = service
            .resolve_nearest(&Coordinate::new(23.26, 77.41), None)
            .await
            .unwrap();
        assert_eq!(result.nearest.region.name, "Bhopal");
        assert_eq!(result.outcome.region_id, "17_1728");
        assert_eq!(result.outcome.metrics.values.total_job_cards, 1_000);
    }

    #[tokio::test]
    async fn test_empty_catalog_has_no_nearest() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = DistrictDataService::new(RegionCatalog::new(Vec::new()), cache(clock));
        assert!(matches!(
            service.resolve_nearest(&Coordinate::new(23.0, 77.0), None).await,
            Err(DataError::NoRegionsAvailable)
        ));
    }

    #[tokio::test]
    async fn test_status_reports_flags_and_counts() {
        let (service, _fetcher, _clock) = live_service(Duration::ZERO, Duration::from_secs(5));
        service.resolve("17_1728", None).await.unwrap();

        let status = service.status().await;
        assert!(status.live_lookups);
        assert!(status.flags.real_data_enabled);
        assert_eq!(status.candidates, vec!["monthly".to_string()]);
        assert_eq!(status.region_count, 51);
        assert_eq!(status.cached_entries, 1);
        assert_eq!(status.cache_ttl_secs, 3600);
        assert!(status.last_refresh.is_none());
    }
}
