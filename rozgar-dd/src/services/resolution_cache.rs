//! TTL cache of resolution outcomes
//!
//! Keyed by (region id, requested period). A requested period of `None`
//! means "latest available" and is cached separately from explicit periods.
//! Concurrent misses on one key may both resolve; the last `put` wins.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rozgar_common::time::Clock;
use rozgar_common::ResolutionOutcome;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Cache key: region id plus requested period
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKey {
    pub region_id: String,
    pub period: Option<String>,
}

impl CacheKey {
    pub fn new(region_id: impl Into<String>, period: Option<&str>) -> Self {
        Self {
            region_id: region_id.into(),
            period: period.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    outcome: ResolutionOutcome,
    inserted_at: DateTime<Utc>,
}

/// On-disk form; JSON object keys must be strings so entries carry their key
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: CacheKey,
    #[serde(flatten)]
    entry: CacheEntry,
}

pub struct ResolutionCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResolutionCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards yields a negative age, which is fresh
        match (now - entry.inserted_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }

    /// Cached outcome if present and younger than the TTL
    pub async fn get(&self, key: &CacheKey) -> Option<ResolutionOutcome> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.outcome.clone())
    }

    /// Insert or overwrite unconditionally
    pub async fn put(&self, key: CacheKey, outcome: ResolutionOutcome) {
        let entry = CacheEntry {
            outcome,
            inserted_at: self.clock.now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Drop every entry, returning how many were held
    pub async fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Write all fresh entries to `path` as JSON
    pub async fn save_snapshot(&self, path: &Path) -> rozgar_common::Result<usize> {
        let now = self.clock.now();
        let snapshot: Vec<SnapshotEntry> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(_, entry)| self.is_fresh(entry, now))
                .map(|(key, entry)| SnapshotEntry {
                    key: key.clone(),
                    entry: entry.clone(),
                })
                .collect()
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;

        tracing::info!(path = %path.display(), entries = snapshot.len(), "Saved cache snapshot");
        Ok(snapshot.len())
    }

    /// Load entries from a snapshot, skipping any already expired.
    ///
    /// A missing file is not an error. Loaded entries overwrite existing ones.
    pub async fn load_snapshot(&self, path: &Path) -> rozgar_common::Result<usize> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cache snapshot to load");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Vec<SnapshotEntry> = serde_json::from_slice(&bytes)?;

        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let mut loaded = 0;
        for item in snapshot {
            if self.is_fresh(&item.entry, now) {
                entries.insert(item.key, item.entry);
                loaded += 1;
            }
        }

        tracing::info!(path = %path.display(), entries = loaded, "Loaded cache snapshot");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RegionCatalog;
    use crate::services::synthetic::SyntheticGenerator;
    use rozgar_common::time::ManualClock;

    const HOUR: Duration = Duration::from_secs(3600);

    fn outcome(region_id: &str) -> ResolutionOutcome {
        let catalog = RegionCatalog::builtin();
        let region = catalog.get(region_id).unwrap();
        ResolutionOutcome::new(
            region_id,
            SyntheticGenerator::new().generate(region, Some("2024-2025")),
        )
    }

    fn cache_with_clock() -> (ResolutionCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (ResolutionCache::new(HOUR, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_hit_before_ttl_miss_after() {
        let (cache, clock) = cache_with_clock();
        let key = CacheKey::new("17_1728", None);
        let stored = outcome("17_1728");
        cache.put(key.clone(), stored.clone()).await;

        clock.advance(HOUR - Duration::from_secs(1));
        assert_eq!(cache.get(&key).await, Some(stored));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn test_periods_are_distinct_keys() {
        let (cache, _clock) = cache_with_clock();
        cache.put(CacheKey::new("17_1728", Some("2023-2024")), outcome("17_1728")).await;

        assert!(cache.get(&CacheKey::new("17_1728", None)).await.is_none());
        assert!(cache.get(&CacheKey::new("17_1728", Some("2023-2024"))).await.is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_resets_age() {
        let (cache, clock) = cache_with_clock();
        let key = CacheKey::new("17_1728", None);
        cache.put(key.clone(), outcome("17_1728")).await;

        clock.advance(Duration::from_secs(3000));
        let replacement = outcome("17_1728");
        cache.put(key.clone(), replacement.clone()).await;

        clock.advance(Duration::from_secs(3000));
        assert_eq!(cache.get(&key).await, Some(replacement));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let (cache, _clock) = cache_with_clock();
        cache.put(CacheKey::new("17_1728", None), outcome("17_1728")).await;
        cache.put(CacheKey::new("17_1723", None), outcome("17_1723")).await;

        assert_eq!(cache.invalidate_all().await, 2);
        assert!(cache.is_empty().await);
        assert!(cache.get(&CacheKey::new("17_1728", None)).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_skips_expired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("cache.json");

        let (cache, clock) = cache_with_clock();
        cache.put(CacheKey::new("17_1728", None), outcome("17_1728")).await;
        clock.advance(Duration::from_secs(1800));
        cache.put(CacheKey::new("17_1723", Some("2023-2024")), outcome("17_1723")).await;

        assert_eq!(cache.save_snapshot(&path).await.unwrap(), 2);

        // Restored 40 minutes later: the first entry is then 70 minutes old
        let restored_clock = Arc::new(ManualClock::new(clock.now()));
        restored_clock.advance(Duration::from_secs(2400));
        let restored = ResolutionCache::new(HOUR, restored_clock);

        assert_eq!(restored.load_snapshot(&path).await.unwrap(), 1);
        assert!(restored
            .get(&CacheKey::new("17_1723", Some("2023-2024")))
            .await
            .is_some());
        assert!(restored.get(&CacheKey::new("17_1728", None)).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty_load() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _clock) = cache_with_clock();
        assert_eq!(cache.load_snapshot(&dir.path().join("absent.json")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        let (cache, _clock) = cache_with_clock();
        assert!(matches!(
            cache.load_snapshot(&path).await,
            Err(rozgar_common::Error::Json(_))
        ));
    }
}
