//! Alias resolver
//!
//! Upstream datasets have renamed their columns several times
//! (`Total_No_of_JobCards_issued`, `total_job_cards`, `tot_jobcards_issued`, ...).
//! Every metric maps to an ordered alias list in [`METRIC_ALIASES`]; adding a
//! new naming convention is a change to that table only.
//!
//! Resolution is total: unparseable values are a normal case and fall back to
//! the next alias, then to the caller's default.

use std::collections::HashMap;

use rozgar_common::{MetricValues, WorkCategory};
use serde_json::{Map, Value};

/// Unstructured upstream record: field name to string/number/null
pub type RawRecord = Map<String, Value>;

/// Canonical metric names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    TotalJobCards,
    ActiveJobCards,
    ActiveWorkers,
    TotalHouseholdsWorked,
    TotalPersonDays,
    WomenPersonDays,
    AverageWageRate,
    AverageDaysEmployment,
    TotalWagesPaid,
    WorksCompleted,
    WorksOngoing,
    WomenParticipation,
    ScParticipation,
    StParticipation,
}

/// Metric name to aliases, most specific first
pub const METRIC_ALIASES: &[(Metric, &[&str])] = &[
    (
        Metric::TotalJobCards,
        &["Total_No_of_JobCards_issued", "total_job_cards", "tot_jobcards_issued", "job_cards_issued"],
    ),
    (
        Metric::ActiveJobCards,
        &["Total_No_of_Active_Job_Cards", "active_job_cards", "tot_active_job_cards"],
    ),
    (
        Metric::ActiveWorkers,
        &["Total_No_of_Active_Workers", "active_workers", "tot_active_workers"],
    ),
    (
        Metric::TotalHouseholdsWorked,
        &["Total_Households_Worked", "total_households_worked", "households_worked"],
    ),
    (
        Metric::TotalPersonDays,
        &[
            "Persondays_of_Central_Liability_so_far",
            "total_person_days",
            "person_days_generated",
            "tot_persondays_generated",
        ],
    ),
    (
        Metric::WomenPersonDays,
        &["Women_Persondays", "women_person_days", "women_persondays"],
    ),
    (
        Metric::AverageWageRate,
        &["Average_Wage_rate_per_day_per_person", "average_wage_rate", "wage_rate"],
    ),
    (
        Metric::AverageDaysEmployment,
        &[
            "Average_days_of_employment_provided_per_Household",
            "average_days_employment",
            "avg_days_employment",
        ],
    ),
    (
        Metric::TotalWagesPaid,
        &["Wages", "total_wages_paid", "wage_expenditure"],
    ),
    (
        Metric::WorksCompleted,
        &["Number_of_Completed_Works", "works_completed", "completed_works"],
    ),
    (
        Metric::WorksOngoing,
        &["Number_of_Ongoing_Works", "works_ongoing", "ongoing_works"],
    ),
    (
        Metric::WomenParticipation,
        &["women_participation_percent", "women_participation"],
    ),
    (
        Metric::ScParticipation,
        &["sc_participation_percent", "sc_participation"],
    ),
    (
        Metric::StParticipation,
        &["st_participation_percent", "st_participation"],
    ),
];

/// Aliases for the district code identity field
pub const DISTRICT_CODE_ALIASES: &[&str] = &["district_code", "District_Code", "dist_code"];

/// Aliases for the district name identity field
pub const DISTRICT_NAME_ALIASES: &[&str] = &["district_name", "District_Name", "district", "name"];

/// Aliases for the region identifier field used by pre-normalized caches
pub const REGION_ID_ALIASES: &[&str] = &["id", "region_id"];

/// Aliases for the reporting period (financial year) field
pub const PERIOD_ALIASES: &[&str] = &["fin_year", "financial_year", "financialYear"];

/// Aliases for the state code identity field
pub const STATE_CODE_ALIASES: &[&str] = &["state_code", "State_Code", "st_code"];

/// Aliases for the state name identity field
pub const STATE_NAME_ALIASES: &[&str] = &["state_name", "State_Name", "state"];

/// Aliases for the month a monthly record reports on
pub const MONTH_ALIASES: &[&str] = &["month", "month_name", "Month"];

/// Funds released to the district (INR)
pub const FUNDS_RELEASED_ALIASES: &[&str] =
    &["Total_Funds_Released", "funds_released", "total_funds_released"];

/// Funds spent by the district (INR)
pub const FUNDS_UTILISED_ALIASES: &[&str] = &[
    "Total_Exp",
    "funds_utilised",
    "funds_utilized",
    "total_expenditure",
];

/// Work category to count aliases; `Other` has no upstream column
pub const WORK_CATEGORY_ALIASES: &[(WorkCategory, &[&str])] = &[
    (
        WorkCategory::WaterConservation,
        &["no_of_works_watershed", "Number_of_Water_Conservation_Works", "water_conservation_works"],
    ),
    (
        WorkCategory::Agriculture,
        &["no_of_works_agriculture", "Number_of_Agriculture_Works", "agriculture_works"],
    ),
    (
        WorkCategory::RuralConnectivity,
        &["no_of_works_rural_connectivity", "Number_of_Rural_Connectivity_Works", "rural_connectivity_works"],
    ),
];

impl Metric {
    pub const ALL: [Metric; 14] = [
        Metric::TotalJobCards,
        Metric::ActiveJobCards,
        Metric::ActiveWorkers,
        Metric::TotalHouseholdsWorked,
        Metric::TotalPersonDays,
        Metric::WomenPersonDays,
        Metric::AverageWageRate,
        Metric::AverageDaysEmployment,
        Metric::TotalWagesPaid,
        Metric::WorksCompleted,
        Metric::WorksOngoing,
        Metric::WomenParticipation,
        Metric::ScParticipation,
        Metric::StParticipation,
    ];

    pub fn aliases(self) -> &'static [&'static str] {
        METRIC_ALIASES
            .iter()
            .find(|(metric, _)| *metric == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

/// Resolve the first alias whose value is a non-negative finite number.
///
/// Returns `None` when no alias yields a usable number. A present value of
/// exactly 0 is a result, not an absence.
pub fn resolve_metric(record: &RawRecord, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|alias| lookup(record, alias))
        .find_map(parse_number)
}

/// Resolve a metric, falling back to `default` when absent or unparseable
pub fn resolve_or(record: &RawRecord, aliases: &[&str], default: f64) -> f64 {
    resolve_metric(record, aliases).unwrap_or(default)
}

/// Resolve the first alias holding a non-empty string (or number) value
pub fn resolve_text(record: &RawRecord, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| lookup(record, alias))
        .find_map(|value| match value {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Exact key first, then a normalized (case and punctuation insensitive) match
fn lookup<'a>(record: &'a RawRecord, alias: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(alias) {
        return Some(value);
    }
    let wanted = normalize_key(alias);
    record
        .iter()
        .find(|(key, _)| normalize_key(key) == wanted)
        .map(|(_, value)| value)
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Currency markers that may lead a monetary string
const CURRENCY_PREFIXES: &[&str] = &["₹", "INR", "Rs.", "Rs"];

/// Parse a raw value into a non-negative finite number.
///
/// Strings may carry a leading currency marker, thousands separators and
/// trailing units. A minus sign ahead of the first digit marks a negative
/// value, which is rejected like any other unusable value.
fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_numeric_text(s)?,
        _ => return None,
    };

    // abs() folds -0.0 into 0.0
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed.abs())
}

fn parse_numeric_text(raw: &str) -> Option<f64> {
    let text = strip_currency(raw);
    let first_digit = text.find(|c: char| c.is_ascii_digit())?;
    let (lead, body) = text.split_at(first_digit);
    if lead.contains('-') {
        return None;
    }

    let mut cleaned = String::with_capacity(body.len() + 1);
    if lead.ends_with('.') {
        cleaned.push('.');
    }
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '.' && chars.peek().is_some_and(|next| next.is_ascii_digit()) {
            cleaned.push('.');
        }
    }
    cleaned.parse::<f64>().ok()
}

/// Remove any leading currency markers (case-insensitive) and whitespace
fn strip_currency(raw: &str) -> &str {
    let mut rest = raw.trim();
    'outer: loop {
        for prefix in CURRENCY_PREFIXES {
            let matched = rest
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if matched {
                rest = rest[prefix.len()..].trim_start();
                continue 'outer;
            }
        }
        return rest;
    }
}

/// Per-metric resolution result for one record
#[derive(Debug, Clone, Default)]
pub struct ResolvedMetrics {
    values: HashMap<Metric, f64>,
}

impl ResolvedMetrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    /// Number of metrics found in the record
    pub fn present_count(&self) -> usize {
        self.values.len()
    }

    /// Every metric was present in the record
    pub fn is_complete(&self) -> bool {
        self.values.len() == Metric::ALL.len()
    }

    /// Convert to the canonical shape, defaulting absent metrics to 0
    pub fn to_values(&self) -> MetricValues {
        let count = |m: Metric| self.get(m).map(|v| v.round() as u64).unwrap_or(0);
        let amount = |m: Metric| self.get(m).unwrap_or(0.0);
        MetricValues {
            total_job_cards: count(Metric::TotalJobCards),
            active_job_cards: count(Metric::ActiveJobCards),
            active_workers: count(Metric::ActiveWorkers),
            total_households_worked: count(Metric::TotalHouseholdsWorked),
            total_person_days: count(Metric::TotalPersonDays),
            women_person_days: count(Metric::WomenPersonDays),
            average_wage_rate: amount(Metric::AverageWageRate),
            average_days_employment: amount(Metric::AverageDaysEmployment),
            total_wages_paid: amount(Metric::TotalWagesPaid),
            works_completed: count(Metric::WorksCompleted),
            works_ongoing: count(Metric::WorksOngoing),
            women_participation: amount(Metric::WomenParticipation),
            sc_participation: amount(Metric::ScParticipation),
            st_participation: amount(Metric::StParticipation),
        }
    }
}

/// Run every metric in [`METRIC_ALIASES`] through the resolver
pub fn resolve_all(record: &RawRecord) -> ResolvedMetrics {
    let values = METRIC_ALIASES
        .iter()
        .filter_map(|&(metric, aliases)| resolve_metric(record, aliases).map(|v| (metric, v)))
        .collect();
    ResolvedMetrics { values }
}
