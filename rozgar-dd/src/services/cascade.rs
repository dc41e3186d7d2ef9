//! Source cascade controller
//!
//! Resolves a region's metrics by walking an explicit, ordered attempt plan
//! (candidate x reporting period). Attempts run one at a time and the first
//! usable record stops the walk. When the plan is exhausted the synthetic
//! generator supplies the outcome, so `resolve` always returns one.

use std::sync::Arc;
use std::time::Duration;

use rozgar_common::{NormalizedMetrics, Provenance, Region, ResolutionOutcome};

use crate::error::DataError;
use crate::services::alias_resolver::{
    self, RawRecord, DISTRICT_CODE_ALIASES, DISTRICT_NAME_ALIASES, PERIOD_ALIASES,
    REGION_ID_ALIASES, STATE_CODE_ALIASES, STATE_NAME_ALIASES,
};
use crate::services::breakdown;
use crate::services::synthetic::SyntheticGenerator;
use crate::services::upstream::{CandidateSource, UpstreamFetcher, UpstreamQuery};

/// Retry and period settings for the cascade
#[derive(Debug, Clone)]
pub struct CascadePolicy {
    /// Reporting periods to probe, most recent first
    pub periods: Vec<String>,
    /// Extra tries for a transient failure on one attempt
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_base_delay * 2^n`
    pub retry_base_delay: Duration,
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self {
            periods: vec![
                "2024-2025".to_string(),
                "2023-2024".to_string(),
                "2022-2023".to_string(),
            ],
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// One step of the attempt plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Index into the cascade's priority-sorted candidate list
    pub candidate: usize,
    pub period: Option<String>,
}

/// Tagged result of one attempt
#[derive(Debug)]
pub enum AttemptResult {
    Usable(NormalizedMetrics),
    /// Candidate answered but had nothing usable for this region
    Insufficient(String),
    Failed(DataError),
}

/// Ordered walk over upstream candidates with synthetic fallback
pub struct SourceCascade {
    fetcher: Arc<dyn UpstreamFetcher>,
    candidates: Vec<CandidateSource>,
    policy: CascadePolicy,
    generator: SyntheticGenerator,
}

impl SourceCascade {
    pub fn new(
        fetcher: Arc<dyn UpstreamFetcher>,
        mut candidates: Vec<CandidateSource>,
        policy: CascadePolicy,
    ) -> Self {
        // Stable sort keeps configuration order among equal priorities
        candidates.sort_by_key(|c| c.priority);
        Self {
            fetcher,
            candidates,
            policy,
            generator: SyntheticGenerator::new(),
        }
    }

    pub fn candidates(&self) -> &[CandidateSource] {
        &self.candidates
    }

    pub fn policy(&self) -> &CascadePolicy {
        &self.policy
    }

    /// Build the attempt plan for an optional period hint.
    ///
    /// Period-filterable candidates get the hint first and then every
    /// configured period not already tried. Other candidates get a single
    /// unfiltered attempt.
    pub fn plan(&self, period_hint: Option<&str>) -> Vec<Attempt> {
        let mut periods: Vec<&str> = Vec::with_capacity(self.policy.periods.len() + 1);
        for period in period_hint
            .into_iter()
            .chain(self.policy.periods.iter().map(String::as_str))
        {
            if !periods.contains(&period) {
                periods.push(period);
            }
        }

        let mut attempts = Vec::new();
        for (index, candidate) in self.candidates.iter().enumerate() {
            if candidate.period_field.is_some() && !periods.is_empty() {
                attempts.extend(periods.iter().map(|p| Attempt {
                    candidate: index,
                    period: Some(p.to_string()),
                }));
            } else {
                attempts.push(Attempt {
                    candidate: index,
                    period: None,
                });
            }
        }
        attempts
    }

    /// Resolve metrics for `region`. Never fails.
    pub async fn resolve(&self, region: &Region, period_hint: Option<&str>) -> ResolutionOutcome {
        let plan = self.plan(period_hint);

        for attempt in &plan {
            let candidate = &self.candidates[attempt.candidate];
            match self.run_attempt(candidate, region, attempt.period.as_deref()).await {
                AttemptResult::Usable(metrics) => {
                    tracing::info!(
                        region_id = %region.id,
                        source = %candidate.name,
                        period = ?metrics.reporting_period,
                        provenance = %metrics.provenance,
                        "Resolved live metrics"
                    );
                    return ResolutionOutcome::new(region.id.clone(), metrics);
                }
                AttemptResult::Insufficient(reason) => {
                    tracing::debug!(
                        region_id = %region.id,
                        source = %candidate.name,
                        period = ?attempt.period,
                        reason = %reason,
                        "Candidate insufficient, advancing"
                    );
                }
                AttemptResult::Failed(err @ DataError::MalformedUpstreamResponse { .. }) => {
                    tracing::warn!(
                        region_id = %region.id,
                        period = ?attempt.period,
                        error = %err,
                        "Upstream response shape not recognized, advancing"
                    );
                }
                AttemptResult::Failed(err) => {
                    tracing::debug!(
                        region_id = %region.id,
                        period = ?attempt.period,
                        error = %err,
                        "Candidate failed, advancing"
                    );
                }
            }
        }

        tracing::info!(
            region_id = %region.id,
            attempts = plan.len(),
            "Cascade exhausted, using synthetic metrics"
        );
        self.synthetic(region, period_hint)
    }

    /// Synthetic outcome for `region`, bypassing every upstream
    pub fn synthetic(&self, region: &Region, period_hint: Option<&str>) -> ResolutionOutcome {
        let period = period_hint.or_else(|| self.policy.periods.first().map(String::as_str));
        ResolutionOutcome::new(region.id.clone(), self.generator.generate(region, period))
    }

    async fn run_attempt(
        &self,
        candidate: &CandidateSource,
        region: &Region,
        period: Option<&str>,
    ) -> AttemptResult {
        let query = UpstreamQuery {
            candidate,
            region,
            period,
        };
        let records = match self.fetch_with_retry(&query).await {
            Ok(records) => records,
            Err(err) => return AttemptResult::Failed(err),
        };
        if records.is_empty() {
            return AttemptResult::Insufficient("no records".to_string());
        }

        let matches = matching_records(&records, region);
        if matches.is_empty() {
            return AttemptResult::Insufficient(format!(
                "{} records, none for region",
                records.len()
            ));
        }

        for &record in &matches {
            let resolved = alias_resolver::resolve_all(record);
            let values = resolved.to_values();
            if values.is_all_zero() {
                continue;
            }

            let provenance = if resolved.is_complete() {
                Provenance::Live
            } else {
                Provenance::LivePartial
            };
            let reporting_period = period
                .map(str::to_string)
                .or_else(|| alias_resolver::resolve_text(record, PERIOD_ALIASES));
            let breakdown = breakdown::from_records(&matches, record, reporting_period.as_deref());

            return AttemptResult::Usable(NormalizedMetrics {
                values,
                provenance,
                reporting_period,
                source: candidate.name.clone(),
                resolved_at: rozgar_common::time::now(),
                breakdown,
            });
        }

        AttemptResult::Insufficient("matching records are all zero".to_string())
    }

    /// Fetch once, retrying transient failures with exponential backoff
    async fn fetch_with_retry(&self, query: &UpstreamQuery<'_>) -> Result<Vec<RawRecord>, DataError> {
        let mut retry = 0u32;
        loop {
            match self.fetcher.fetch(query).await {
                Ok(records) => return Ok(records),
                Err(err) if err.is_transient() && retry < self.policy.max_retries => {
                    let delay = self
                        .policy
                        .retry_base_delay
                        .saturating_mul(2u32.saturating_pow(retry));
                    tracing::debug!(
                        source = %query.candidate.name,
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Records matching `region`, identifier matches first, then exact name
/// matches, then substring name matches. Records that name a different
/// state never match.
fn matching_records<'a>(records: &'a [RawRecord], region: &Region) -> Vec<&'a RawRecord> {
    let records: Vec<&RawRecord> = records
        .iter()
        .filter(|record| in_region_state(record, region))
        .collect();
    let by_id: Vec<&RawRecord> = records
        .iter()
        .copied()
        .filter(|record| matches_identifier(record, region))
        .collect();
    if !by_id.is_empty() {
        return by_id;
    }

    let region_names: Vec<String> = [&region.name, &region.localized_name]
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    let named: Vec<(&RawRecord, String)> = records
        .iter()
        .copied()
        .filter_map(|record| {
            alias_resolver::resolve_text(record, DISTRICT_NAME_ALIASES)
                .map(|name| (record, name.to_lowercase()))
        })
        .collect();

    let exact: Vec<&RawRecord> = named
        .iter()
        .filter(|(_, name)| region_names.iter().any(|r| r == name))
        .map(|(record, _)| *record)
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    named
        .iter()
        .filter(|(_, name)| {
            region_names
                .iter()
                .any(|r| name.contains(r.as_str()) || r.contains(name.as_str()))
        })
        .map(|(record, _)| *record)
        .collect()
}

/// False only when the record carries a state code or name that differs
/// from the region's
fn in_region_state(record: &RawRecord, region: &Region) -> bool {
    let code_ok = alias_resolver::resolve_text(record, STATE_CODE_ALIASES)
        .map_or(true, |code| same_code(&code, &region.state_code));
    let name_ok = alias_resolver::resolve_text(record, STATE_NAME_ALIASES)
        .map_or(true, |name| name.eq_ignore_ascii_case(region.state.trim()));
    code_ok && name_ok
}

/// Numeric codes compare without leading zeros (`9` == `09`)
fn same_code(a: &str, b: &str) -> bool {
    let strip = |s: &str| {
        let s = s.trim();
        let stripped = s.trim_start_matches('0');
        if stripped.is_empty() && !s.is_empty() {
            "0".to_string()
        } else {
            stripped.to_string()
        }
    };
    strip(a) == strip(b)
}

fn matches_identifier(record: &RawRecord, region: &Region) -> bool {
    let code_matches = alias_resolver::resolve_text(record, DISTRICT_CODE_ALIASES)
        .is_some_and(|code| code == region.district_code);
    code_matches
        || alias_resolver::resolve_text(record, REGION_ID_ALIASES)
            .is_some_and(|id| id == region.id)
}
