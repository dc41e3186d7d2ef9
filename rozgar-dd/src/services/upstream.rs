//! Upstream data API client
//!
//! The upstream is the data.gov.in resource API: a JSON endpoint per dataset
//! resource taking `api-key`, `format`, `limit` and `filters[<field>]` query
//! parameters. Record envelopes seen in the wild:
//!
//! - `{"records": [...]}` (current API)
//! - `[...]` (bare array, cached dumps)
//! - `{"data": [...]}` (older mirrors)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rozgar_common::Region;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataError;
use crate::services::alias_resolver::RawRecord;

const USER_AGENT: &str = concat!("rozgar-dd/", env!("CARGO_PKG_VERSION"));

/// One upstream resource the cascade may try
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSource {
    /// Short label used in logs and in outcome provenance
    pub name: String,
    /// Resource locator, relative to the configured base URL
    pub resource: String,
    /// Filter field for the reporting period (e.g. `fin_year`).
    /// `None` marks a resource that cannot be filtered by period.
    #[serde(default)]
    pub period_field: Option<String>,
    /// Lower ranks are tried first
    pub priority: u32,
    /// Also send `filters[district_code]`
    #[serde(default)]
    pub filter_by_district_code: bool,
}

/// A single upstream request
#[derive(Debug, Clone, Copy)]
pub struct UpstreamQuery<'a> {
    pub candidate: &'a CandidateSource,
    pub region: &'a Region,
    pub period: Option<&'a str>,
}

/// Fetches raw records for a query
///
/// The cascade only sees this trait; tests substitute scripted fetchers.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, query: &UpstreamQuery<'_>) -> Result<Vec<RawRecord>, DataError>;
}

/// Extract records from any of the tolerated envelope shapes.
///
/// Non-object entries are skipped. Anything that is not one of the three
/// shapes is a malformed response.
pub fn parse_envelope(source_name: &str, body: Value) -> Result<Vec<RawRecord>, DataError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(DataError::MalformedUpstreamResponse {
                    source_name: source_name.to_string(),
                    message: format!("record list is {}, expected array", json_kind(&other)),
                })
            }
            None => {
                let detail = map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default();
                return Err(DataError::MalformedUpstreamResponse {
                    source_name: source_name.to_string(),
                    message: format!("object without 'records' or 'data'{}", detail),
                });
            }
        },
        other => {
            return Err(DataError::MalformedUpstreamResponse {
                source_name: source_name.to_string(),
                message: format!("top-level {}, expected object or array", json_kind(&other)),
            })
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Connection settings for [`DataGovClient`]
#[derive(Debug, Clone)]
pub struct DataGovSettings {
    pub base_url: String,
    pub api_key: String,
    /// Value for `filters[state_name]`
    pub state_name: String,
    pub result_limit: u32,
    pub request_timeout: Duration,
}

/// Result of the startup connectivity probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub success: bool,
    pub status: Option<u16>,
    pub record_count: usize,
    pub error: Option<String>,
}

/// data.gov.in API client
pub struct DataGovClient {
    http_client: reqwest::Client,
    settings: DataGovSettings,
}

impl DataGovClient {
    pub fn new(settings: DataGovSettings) -> Result<Self, DataError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| DataError::UpstreamUnavailable {
                source_name: "client".to_string(),
                status: None,
                message: format!("failed to build HTTP client: {}", e),
                transient: false,
            })?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }

    /// Query parameters for one request
    pub fn query_params(&self, query: &UpstreamQuery<'_>) -> Vec<(String, String)> {
        let mut params = vec![
            ("api-key".to_string(), self.settings.api_key.clone()),
            ("format".to_string(), "json".to_string()),
            ("offset".to_string(), "0".to_string()),
            ("limit".to_string(), self.settings.result_limit.to_string()),
            ("filters[state_name]".to_string(), self.settings.state_name.clone()),
        ];
        if let (Some(field), Some(period)) = (&query.candidate.period_field, query.period) {
            params.push((format!("filters[{}]", field), period.to_string()));
        }
        if query.candidate.filter_by_district_code {
            params.push((
                "filters[district_code]".to_string(),
                query.region.district_code.clone(),
            ));
        }
        params
    }

    /// Lightweight request against the first candidate, for startup logging
    pub async fn probe(&self, candidate: &CandidateSource) -> ProbeReport {
        let params = [
            ("api-key", self.settings.api_key.as_str()),
            ("format", "json"),
            ("limit", "1"),
        ];
        let response = match self
            .http_client
            .get(self.resource_url(&candidate.resource))
            .query(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return ProbeReport {
                    success: false,
                    status: None,
                    record_count: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeReport {
                success: false,
                status: Some(status.as_u16()),
                record_count: 0,
                error: Some(format!("HTTP {}", status)),
            };
        }

        let parsed = match response.json::<Value>().await {
            Ok(body) => parse_envelope(&candidate.name, body),
            Err(e) => Err(DataError::MalformedUpstreamResponse {
                source_name: candidate.name.clone(),
                message: e.to_string(),
            }),
        };
        match parsed {
            Ok(records) => ProbeReport {
                success: true,
                status: Some(status.as_u16()),
                record_count: records.len(),
                error: None,
            },
            Err(e) => ProbeReport {
                success: false,
                status: Some(status.as_u16()),
                record_count: 0,
                error: Some(e.to_string()),
            },
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[async_trait]
impl UpstreamFetcher for DataGovClient {
    async fn fetch(&self, query: &UpstreamQuery<'_>) -> Result<Vec<RawRecord>, DataError> {
        let source_name = &query.candidate.name;
        let url = self.resource_url(&query.candidate.resource);

        tracing::debug!(
            source = %source_name,
            url = %url,
            region_id = %query.region.id,
            period = ?query.period,
            "Querying upstream"
        );

        let response = self
            .http_client
            .get(&url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|e| DataError::UpstreamUnavailable {
                source_name: source_name.clone(),
                status: None,
                message: e.to_string(),
                transient: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DataError::UpstreamUnavailable {
                source_name: source_name.clone(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}: {}", status, truncate(&error_text, 200)),
                transient: is_transient_status(status),
            });
        }

        let text = response.text().await.map_err(|e| DataError::UpstreamUnavailable {
            source_name: source_name.clone(),
            status: Some(status.as_u16()),
            message: format!("failed reading body: {}", e),
            transient: true,
        })?;

        let body: Value =
            serde_json::from_str(&text).map_err(|e| DataError::MalformedUpstreamResponse {
                source_name: source_name.clone(),
                message: format!("invalid JSON: {}", e),
            })?;

        let records = parse_envelope(source_name, body)?;
        tracing::debug!(source = %source_name, count = records.len(), "Upstream returned records");
        Ok(records)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
