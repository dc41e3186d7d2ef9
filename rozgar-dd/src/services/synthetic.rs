//! Synthetic record generator
//!
//! Produces a structurally complete metrics record when no live source has
//! usable data. Primary fields are drawn from fixed closed ranges; derived
//! fields are computed from them so cross-field ratios stay plausible:
//!
//! - `active_job_cards  = floor(total_job_cards * active_share)`
//! - `active_workers    = floor(active_job_cards * workers_per_card)`
//! - `total_person_days = active_workers * average_days_employment`
//! - `total_wages_paid  = active_workers * average_wage_rate * average_days_employment`
//! - `women_person_days = round(total_person_days * women_participation / 100)`
//!
//! The breakdown is derived the same way: the monthly trend spreads
//! `total_person_days` over the financial year by seasonal weight, work
//! categories split `works_completed + works_ongoing`, and the payment split
//! treats `total_wages_paid` as the utilised share of released funds.
//!
//! Values are not meant to reflect reality, only to be indistinguishable in
//! shape from live data.

use std::ops::RangeInclusive;

use rand::Rng;
use rozgar_common::{
    CategoryShare, DistrictBreakdown, MetricValues, NormalizedMetrics, PaymentStatus, Provenance,
    Region, TrendPoint, WorkCategory,
};

use crate::services::breakdown::FISCAL_MONTHS;

/// Source label carried by synthetic outcomes
pub const SYNTHETIC_SOURCE: &str = "synthetic";

pub const TOTAL_JOB_CARDS: RangeInclusive<u64> = 20_000..=110_000;
/// Share of job cards that are active
pub const ACTIVE_SHARE: RangeInclusive<f64> = 0.55..=0.80;
/// Active workers per active job card
pub const WORKERS_PER_CARD: RangeInclusive<f64> = 1.0..=1.4;
/// Households worked per active job card
pub const HOUSEHOLD_SHARE: RangeInclusive<f64> = 0.60..=0.90;
/// INR per person per day
pub const AVERAGE_WAGE_RATE: RangeInclusive<u32> = 190..=220;
pub const AVERAGE_DAYS_EMPLOYMENT: RangeInclusive<u32> = 15..=60;
pub const WORKS_COMPLETED: RangeInclusive<u64> = 300..=1_100;
pub const WORKS_ONGOING: RangeInclusive<u64> = 80..=280;
pub const WOMEN_PARTICIPATION: RangeInclusive<f64> = 48.0..=60.0;
pub const SC_PARTICIPATION: RangeInclusive<f64> = 15.0..=25.0;
pub const ST_PARTICIPATION: RangeInclusive<f64> = 20.0..=35.0;

/// Relative employment per month, April first; peaks in the lean farm season
pub const SEASONAL_WEIGHTS: [f64; 12] = [0.8, 0.6, 0.7, 0.9, 1.0, 0.8, 1.1, 1.4, 1.3, 1.2, 1.3, 1.1];
/// Base percentage of works per category; `Other` takes the remainder
pub const CATEGORY_BASE_SHARES: [(WorkCategory, i32); 3] = [
    (WorkCategory::WaterConservation, 30),
    (WorkCategory::Agriculture, 20),
    (WorkCategory::RuralConnectivity, 25),
];
/// Maximum deviation, in percentage points, from each base share
pub const CATEGORY_JITTER: RangeInclusive<i32> = -5..=5;
/// Share of released funds already paid out
pub const PAID_SHARE: RangeInclusive<f64> = 0.75..=0.95;

/// Generator for fallback metrics
#[derive(Debug, Clone, Default)]
pub struct SyntheticGenerator;

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate metrics for `region` using the thread RNG
    pub fn generate(&self, region: &Region, reporting_period: Option<&str>) -> NormalizedMetrics {
        self.generate_with(&mut rand::thread_rng(), region, reporting_period)
    }

    /// Generate metrics with a caller-supplied RNG
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        region: &Region,
        reporting_period: Option<&str>,
    ) -> NormalizedMetrics {
        let total_job_cards = rng.gen_range(TOTAL_JOB_CARDS);
        let active_job_cards = (total_job_cards as f64 * rng.gen_range(ACTIVE_SHARE)).floor() as u64;
        let active_workers = (active_job_cards as f64 * rng.gen_range(WORKERS_PER_CARD)).floor() as u64;
        let total_households_worked =
            (active_job_cards as f64 * rng.gen_range(HOUSEHOLD_SHARE)).floor() as u64;

        let average_wage_rate = f64::from(rng.gen_range(AVERAGE_WAGE_RATE));
        let average_days_employment = f64::from(rng.gen_range(AVERAGE_DAYS_EMPLOYMENT));
        let women_participation = round_to_tenth(rng.gen_range(WOMEN_PARTICIPATION));

        let total_person_days = active_workers * average_days_employment as u64;
        let total_wages_paid = active_workers as f64 * average_wage_rate * average_days_employment;
        let women_person_days = (total_person_days as f64 * women_participation / 100.0).round() as u64;

        let values = MetricValues {
            total_job_cards,
            active_job_cards,
            active_workers,
            total_households_worked,
            total_person_days,
            women_person_days,
            average_wage_rate,
            average_days_employment,
            total_wages_paid,
            works_completed: rng.gen_range(WORKS_COMPLETED),
            works_ongoing: rng.gen_range(WORKS_ONGOING),
            women_participation,
            sc_participation: round_to_tenth(rng.gen_range(SC_PARTICIPATION)),
            st_participation: round_to_tenth(rng.gen_range(ST_PARTICIPATION)),
        };

        let breakdown = DistrictBreakdown {
            monthly_trend: monthly_trend(&values),
            work_categories: work_categories(rng, values.works_completed + values.works_ongoing),
            payment_status: Some(PaymentStatus::new(
                (values.total_wages_paid / rng.gen_range(PAID_SHARE)).round(),
                values.total_wages_paid,
            )),
        };

        tracing::debug!(
            region_id = %region.id,
            total_job_cards = values.total_job_cards,
            "Generated synthetic metrics"
        );

        NormalizedMetrics {
            values,
            provenance: Provenance::Synthetic,
            reporting_period: reporting_period.map(str::to_string),
            source: SYNTHETIC_SOURCE.to_string(),
            resolved_at: rozgar_common::time::now(),
            breakdown,
        }
    }
}

/// Spread the yearly person-days over the fiscal months; the last month
/// absorbs rounding so the series sums to the total
fn monthly_trend(values: &MetricValues) -> Vec<TrendPoint> {
    let weight_sum: f64 = SEASONAL_WEIGHTS.iter().sum();
    let mut remaining = values.total_person_days;

    FISCAL_MONTHS
        .iter()
        .zip(SEASONAL_WEIGHTS)
        .enumerate()
        .map(|(i, (month, weight))| {
            let person_days = if i + 1 == FISCAL_MONTHS.len() {
                remaining
            } else {
                let share = (values.total_person_days as f64 * weight / weight_sum).round() as u64;
                share.min(remaining)
            };
            remaining -= person_days;
            TrendPoint {
                month: month.to_string(),
                person_days,
                wages: person_days as f64 * values.average_wage_rate,
            }
        })
        .collect()
}

fn work_categories<R: Rng + ?Sized>(rng: &mut R, total_works: u64) -> Vec<CategoryShare> {
    let mut counts = Vec::with_capacity(CATEGORY_BASE_SHARES.len() + 1);
    let mut assigned = 0u64;
    for (category, base) in CATEGORY_BASE_SHARES {
        let percent = (base + rng.gen_range(CATEGORY_JITTER)) as u64;
        let works = total_works * percent / 100;
        assigned += works;
        counts.push((category, works));
    }
    counts.push((WorkCategory::Other, total_works.saturating_sub(assigned)));
    CategoryShare::from_counts(&counts)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
