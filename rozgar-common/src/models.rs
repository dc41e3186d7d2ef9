//! Shared data model for district statistics
//!
//! `Region` values come from the region catalog and are never mutated.
//! `ResolutionOutcome` is the unit stored in the resolution cache; a refresh
//! replaces an outcome, it never edits one in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject non-finite or out-of-range coordinates
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude must be within [-90, 90], got {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude must be within [-180, 180], got {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Administrative region (district) from the region catalog
///
/// Serialized in camelCase like every other API payload; catalog files
/// written with snake_case keys are still accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Stable identifier, `<state_code>_<district_code>` (e.g. `17_1728`)
    pub id: String,
    /// English display name
    pub name: String,
    /// Localized (Hindi) display name
    #[serde(alias = "localized_name")]
    pub localized_name: String,
    /// State display name
    pub state: String,
    #[serde(alias = "state_code")]
    pub state_code: String,
    #[serde(alias = "district_code")]
    pub district_code: String,
    pub coordinate: Coordinate,
}

impl Region {
    /// Split a region identifier into `(state_code, district_code)`
    pub fn split_id(id: &str) -> Option<(&str, &str)> {
        let (state, district) = id.split_once('_')?;
        let valid = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric());
        if valid(state) && valid(district) {
            Some((state, district))
        } else {
            None
        }
    }
}

/// Where a resolved record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Live upstream record with every metric present
    Live,
    /// Live upstream record with some metrics defaulted
    LivePartial,
    /// Generated fallback
    Synthetic,
}

impl Provenance {
    pub fn is_live(&self) -> bool {
        matches!(self, Provenance::Live | Provenance::LivePartial)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::LivePartial => "live-partial",
            Provenance::Synthetic => "synthetic",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed set of employment-program metrics.
///
/// Every field is always present and non-negative. Counts are unsigned;
/// rates, money and percentages are floating point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValues {
    pub total_job_cards: u64,
    pub active_job_cards: u64,
    pub active_workers: u64,
    pub total_households_worked: u64,
    pub total_person_days: u64,
    pub women_person_days: u64,
    /// Average wage per person per day (INR)
    pub average_wage_rate: f64,
    /// Average days of employment per worker
    pub average_days_employment: f64,
    /// Total wages paid (INR)
    pub total_wages_paid: f64,
    pub works_completed: u64,
    pub works_ongoing: u64,
    /// Percentages in [0, 100]
    pub women_participation: f64,
    pub sc_participation: f64,
    pub st_participation: f64,
}

impl MetricValues {
    /// True when every metric is zero, i.e. the record carried no usable data
    pub fn is_all_zero(&self) -> bool {
        self.total_job_cards == 0
            && self.active_job_cards == 0
            && self.active_workers == 0
            && self.total_households_worked == 0
            && self.total_person_days == 0
            && self.women_person_days == 0
            && self.average_wage_rate == 0.0
            && self.average_days_employment == 0.0
            && self.total_wages_paid == 0.0
            && self.works_completed == 0
            && self.works_ongoing == 0
            && self.women_participation == 0.0
            && self.sc_participation == 0.0
            && self.st_participation == 0.0
    }
}

/// One month of a district's employment trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Month label as reported (e.g. `Apr`, `December`)
    pub month: String,
    pub person_days: u64,
    /// Wage expenditure for the month (INR)
    pub wages: f64,
}

/// Kinds of works tracked in the category breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkCategory {
    WaterConservation,
    Agriculture,
    RuralConnectivity,
    Other,
}

impl WorkCategory {
    pub const ALL: [WorkCategory; 4] = [
        WorkCategory::WaterConservation,
        WorkCategory::Agriculture,
        WorkCategory::RuralConnectivity,
        WorkCategory::Other,
    ];

    /// Hindi display label
    pub fn localized_label(self) -> &'static str {
        match self {
            WorkCategory::WaterConservation => "जल संरक्षण",
            WorkCategory::Agriculture => "कृषि कार्य",
            WorkCategory::RuralConnectivity => "सड़क निर्माण",
            WorkCategory::Other => "अन्य कार्य",
        }
    }
}

/// Works of one category and their share of all categorized works
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: WorkCategory,
    pub localized_label: String,
    pub works: u64,
    /// Share in [0, 100], one decimal place
    pub percentage: f64,
}

impl CategoryShare {
    /// Build shares from raw counts, keeping the given order
    pub fn from_counts(counts: &[(WorkCategory, u64)]) -> Vec<CategoryShare> {
        let total: u64 = counts.iter().map(|(_, n)| n).sum();
        counts
            .iter()
            .map(|&(category, works)| CategoryShare {
                category,
                localized_label: category.localized_label().to_string(),
                works,
                percentage: if total == 0 {
                    0.0
                } else {
                    (works as f64 * 1000.0 / total as f64).round() / 10.0
                },
            })
            .collect()
    }
}

/// Released funds against what has been paid out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatus {
    pub released: f64,
    pub utilised: f64,
    /// `released - utilised`, never negative
    pub pending: f64,
}

impl PaymentStatus {
    pub fn new(released: f64, utilised: f64) -> Self {
        Self {
            released,
            utilised,
            pending: (released - utilised).max(0.0),
        }
    }
}

/// Chart-ready detail accompanying the summary metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictBreakdown {
    /// Financial-year order (April first) where month labels are recognized
    pub monthly_trend: Vec<TrendPoint>,
    pub work_categories: Vec<CategoryShare>,
    pub payment_status: Option<PaymentStatus>,
}

impl DistrictBreakdown {
    pub fn is_empty(&self) -> bool {
        self.monthly_trend.is_empty()
            && self.work_categories.is_empty()
            && self.payment_status.is_none()
    }
}

/// Canonical output shape seen by consumers: metric values plus provenance metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetrics {
    #[serde(flatten)]
    pub values: MetricValues,
    pub provenance: Provenance,
    /// Reporting period (financial year, e.g. `2024-2025`) if known
    pub reporting_period: Option<String>,
    /// Upstream candidate name, or `synthetic`
    pub source: String,
    pub resolved_at: DateTime<Utc>,
    /// Absent in snapshots written before breakdowns existed
    #[serde(default)]
    pub breakdown: DistrictBreakdown,
}

/// Result of resolving one region for one requested reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOutcome {
    pub region_id: String,
    pub provenance: Provenance,
    /// Reporting period actually used
    pub reporting_period: Option<String>,
    pub metrics: NormalizedMetrics,
}

impl ResolutionOutcome {
    pub fn new(region_id: impl Into<String>, metrics: NormalizedMetrics) -> Self {
        Self {
            region_id: region_id.into(),
            provenance: metrics.provenance,
            reporting_period: metrics.reporting_period.clone(),
            metrics,
        }
    }
}
