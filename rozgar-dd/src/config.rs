//! Configuration for rozgar-dd
//!
//! Settings sources priority:
//! 1. Command-line arguments (--port, --config)
//! 2. Environment variables (`ROZGAR_*`)
//! 3. TOML configuration file (`<config_dir>/rozgar/rozgar-dd.toml`)
//! 4. Built-in defaults
//!
//! Example TOML:
//!
//! ```toml
//! port = 5750
//!
//! [logging]
//! level = "debug"
//!
//! [upstream]
//! use_real_data = true
//! api_key = "..."
//! periods = ["2024-2025", "2023-2024"]
//!
//! [[upstream.candidates]]
//! name = "district-monthly"
//! resource = "ee03643a-ee4c-48c2-ac30-9f2ff26ab722"
//! period_field = "fin_year"
//! priority = 1
//!
//! [cache]
//! ttl_secs = 3600
//! snapshot_path = "/var/lib/rozgar/cache.json"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use rozgar_common::config::{env_flag, env_var, LoggingConfig};
use rozgar_common::time::millis_to_duration;
use serde::Deserialize;
use tracing::warn;

use crate::services::cascade::CascadePolicy;
use crate::services::upstream::{CandidateSource, DataGovSettings};

/// Module name, also the config file stem
pub const MODULE_NAME: &str = "rozgar-dd";

/// Placeholder shipped in sample configs; never a real key
const PLACEHOLDER_API_KEY: &str = "your_api_key_here";
const MIN_API_KEY_LEN: usize = 11;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server port
    pub port: u16,
    /// Region catalog JSON file; the built-in Madhya Pradesh table when unset
    pub catalog_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5750,
            catalog_path: None,
            logging: LoggingConfig::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Live lookups are attempted only when this is set and a key is configured
    pub use_real_data: bool,
    pub state_name: String,
    pub request_timeout_secs: u64,
    pub result_limit: u32,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Upper bound on one whole resolution
    pub resolution_timeout_secs: u64,
    /// Most recent first
    pub periods: Vec<String>,
    pub candidates: Vec<CandidateSource>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.data.gov.in/resource".to_string(),
            api_key: None,
            use_real_data: false,
            state_name: "MADHYA PRADESH".to_string(),
            request_timeout_secs: 15,
            result_limit: 1000,
            max_retries: 2,
            retry_base_delay_ms: 500,
            resolution_timeout_secs: 120,
            periods: vec![
                "2024-2025".to_string(),
                "2023-2024".to_string(),
                "2022-2023".to_string(),
            ],
            candidates: default_candidates(),
        }
    }
}

fn default_candidates() -> Vec<CandidateSource> {
    vec![
        CandidateSource {
            name: "district-monthly".to_string(),
            resource: "ee03643a-ee4c-48c2-ac30-9f2ff26ab722".to_string(),
            period_field: Some("fin_year".to_string()),
            priority: 1,
            filter_by_district_code: false,
        },
        CandidateSource {
            name: "district-by-code".to_string(),
            resource: "9ef84268-d588-465a-a308-a864a43d0070".to_string(),
            period_field: Some("fin_year".to_string()),
            priority: 2,
            filter_by_district_code: true,
        },
        CandidateSource {
            name: "district-glance".to_string(),
            resource: "district-wise-mgnrega-data-glance".to_string(),
            period_field: None,
            priority: 3,
            filter_by_district_code: false,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Written on shutdown and reloaded at startup when set
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            snapshot_path: None,
        }
    }
}

impl ServiceConfig {
    /// Apply `ROZGAR_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_var("ROZGAR_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid ROZGAR_PORT '{}'", port),
            }
        }
        if let Some(key) = env_var("ROZGAR_API_KEY") {
            self.upstream.api_key = Some(key);
        }
        if let Some(flag) = env_flag("ROZGAR_USE_REAL_DATA") {
            self.upstream.use_real_data = flag;
        }
        if let Some(url) = env_var("ROZGAR_API_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(path) = env_var("ROZGAR_CATALOG_PATH") {
            self.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(path) = env_var("ROZGAR_CACHE_SNAPSHOT") {
            self.cache.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = env_var("ROZGAR_CACHE_TTL_SECS") {
            match ttl.parse() {
                Ok(ttl) => self.cache.ttl_secs = ttl,
                Err(_) => warn!("Ignoring invalid ROZGAR_CACHE_TTL_SECS '{}'", ttl),
            }
        }
        if let Some(level) = env_var("ROZGAR_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

impl UpstreamConfig {
    /// A key is configured when present, not the sample placeholder, and
    /// longer than ten characters
    pub fn is_api_key_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(str::trim)
            .is_some_and(|key| key != PLACEHOLDER_API_KEY && key.len() >= MIN_API_KEY_LEN)
    }

    /// Live lookups need both the flag and a usable key
    pub fn live_lookups_enabled(&self) -> bool {
        self.use_real_data && self.is_api_key_configured()
    }

    pub fn cascade_policy(&self) -> CascadePolicy {
        CascadePolicy {
            periods: self.periods.clone(),
            max_retries: self.max_retries,
            retry_base_delay: millis_to_duration(self.retry_base_delay_ms),
        }
    }

    pub fn client_settings(&self) -> DataGovSettings {
        DataGovSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone().unwrap_or_default().trim().to_string(),
            state_name: self.state_name.clone(),
            result_limit: self.result_limit,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_secs(self.resolution_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "ROZGAR_PORT",
        "ROZGAR_API_KEY",
        "ROZGAR_USE_REAL_DATA",
        "ROZGAR_API_BASE_URL",
        "ROZGAR_CATALOG_PATH",
        "ROZGAR_CACHE_SNAPSHOT",
        "ROZGAR_CACHE_TTL_SECS",
        "ROZGAR_LOG_LEVEL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 5750);
        assert!(!config.upstream.use_real_data);
        assert!(!config.upstream.live_lookups_enabled());
        assert_eq!(config.upstream.candidates.len(), 3);
        assert_eq!(config.upstream.periods[0], "2024-2025");
        assert_eq!(config.cache.ttl_secs, 3600);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            port = 6000

            [upstream]
            use_real_data = true
            periods = ["2023-2024"]

            [[upstream.candidates]]
            name = "only"
            resource = "abc"
            priority = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert!(config.upstream.use_real_data);
        assert_eq!(config.upstream.state_name, "MADHYA PRADESH");
        assert_eq!(config.upstream.periods, vec!["2023-2024".to_string()]);
        assert_eq!(config.upstream.candidates.len(), 1);
        assert_eq!(config.upstream.candidates[0].period_field, None);
        assert!(!config.upstream.candidates[0].filter_by_district_code);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_api_key_validity() {
        let mut upstream = UpstreamConfig::default();
        assert!(!upstream.is_api_key_configured());

        upstream.api_key = Some(PLACEHOLDER_API_KEY.to_string());
        assert!(!upstream.is_api_key_configured());

        upstream.api_key = Some("short".to_string());
        assert!(!upstream.is_api_key_configured());

        upstream.api_key = Some("579b464db66ec23bdd000001".to_string());
        assert!(upstream.is_api_key_configured());
        assert!(!upstream.live_lookups_enabled());

        upstream.use_real_data = true;
        assert!(upstream.live_lookups_enabled());
    }

    #[test]
    fn test_policy_and_client_settings() {
        let mut upstream = UpstreamConfig::default();
        upstream.retry_base_delay_ms = 250;
        upstream.api_key = Some("  579b464db66ec23bdd000001 ".to_string());

        let policy = upstream.cascade_policy();
        assert_eq!(policy.retry_base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_retries, 2);

        let settings = upstream.client_settings();
        assert_eq!(settings.api_key, "579b464db66ec23bdd000001");
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("ROZGAR_PORT", "7000");
        std::env::set_var("ROZGAR_API_KEY", "579b464db66ec23bdd000001");
        std::env::set_var("ROZGAR_USE_REAL_DATA", "yes");
        std::env::set_var("ROZGAR_CACHE_TTL_SECS", "60");

        let mut config = ServiceConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.port, 7000);
        assert!(config.upstream.live_lookups_enabled());
        assert_eq!(config.cache.ttl_secs, 60);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_ignored() {
        clear_env();
        std::env::set_var("ROZGAR_PORT", "not-a-port");
        std::env::set_var("ROZGAR_USE_REAL_DATA", "maybe");

        let mut config = ServiceConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.port, 5750);
        assert!(!config.upstream.use_real_data);
        clear_env();
    }
}
