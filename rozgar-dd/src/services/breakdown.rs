//! District breakdown builder
//!
//! Turns the matching records of a successful live attempt into chart-ready
//! detail: a monthly person-days/wages trend over every matching record, and
//! work-category and payment splits from the record that supplied the
//! summary metrics.

use rozgar_common::{CategoryShare, DistrictBreakdown, PaymentStatus, TrendPoint};

use crate::services::alias_resolver::{
    self, Metric, RawRecord, FUNDS_RELEASED_ALIASES, FUNDS_UTILISED_ALIASES, MONTH_ALIASES,
    PERIOD_ALIASES, WORK_CATEGORY_ALIASES,
};

/// Financial-year month order used for trends
pub const FISCAL_MONTHS: [&str; 12] = [
    "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb", "Mar",
];

/// Position of a month label in the financial year (April = 0).
///
/// Accepts short or full English names in any case, e.g. `apr`, `April`.
pub fn fiscal_month_index(label: &str) -> Option<usize> {
    let head: String = label
        .trim()
        .chars()
        .take(3)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    FISCAL_MONTHS
        .iter()
        .position(|m| m.to_ascii_lowercase() == head)
}

/// Build the breakdown for one resolved region.
///
/// `records` are every record that matched the region, `summary` the one the
/// metrics came from. Records whose own period differs from `period` are left
/// out of the trend.
pub fn from_records(
    records: &[&RawRecord],
    summary: &RawRecord,
    period: Option<&str>,
) -> DistrictBreakdown {
    DistrictBreakdown {
        monthly_trend: monthly_trend(records, period),
        work_categories: work_categories(summary),
        payment_status: payment_status(summary),
    }
}

fn monthly_trend(records: &[&RawRecord], period: Option<&str>) -> Vec<TrendPoint> {
    // (fiscal index, grouping key, point)
    let mut points: Vec<(Option<usize>, String, TrendPoint)> = Vec::new();

    for record in records {
        if let (Some(wanted), Some(own)) = (period, alias_resolver::resolve_text(record, PERIOD_ALIASES)) {
            if own != wanted {
                continue;
            }
        }
        let Some(month) = alias_resolver::resolve_text(record, MONTH_ALIASES) else {
            continue;
        };
        let index = fiscal_month_index(&month);
        let key = match index {
            Some(i) => FISCAL_MONTHS[i].to_string(),
            None => month.to_lowercase(),
        };
        let person_days = alias_resolver::resolve_or(record, Metric::TotalPersonDays.aliases(), 0.0);
        let wages = alias_resolver::resolve_or(record, Metric::TotalWagesPaid.aliases(), 0.0);

        match points.iter_mut().find(|(_, k, _)| *k == key) {
            Some((_, _, point)) => {
                point.person_days += person_days.round() as u64;
                point.wages += wages;
            }
            None => points.push((
                index,
                key,
                TrendPoint {
                    month,
                    person_days: person_days.round() as u64,
                    wages,
                },
            )),
        }
    }

    // Stable: unrecognized labels keep arrival order after the known months
    points.sort_by_key(|(index, _, _)| index.unwrap_or(FISCAL_MONTHS.len()));
    points.into_iter().map(|(_, _, point)| point).collect()
}

fn work_categories(record: &RawRecord) -> Vec<CategoryShare> {
    let counts: Vec<_> = WORK_CATEGORY_ALIASES
        .iter()
        .filter_map(|&(category, aliases)| {
            alias_resolver::resolve_metric(record, aliases).map(|n| (category, n.round() as u64))
        })
        .collect();
    CategoryShare::from_counts(&counts)
}

fn payment_status(record: &RawRecord) -> Option<PaymentStatus> {
    let released = alias_resolver::resolve_metric(record, FUNDS_RELEASED_ALIASES);
    let utilised = alias_resolver::resolve_metric(record, FUNDS_UTILISED_ALIASES);
    if released.is_none() && utilised.is_none() {
        return None;
    }
    Some(PaymentStatus::new(
        released.unwrap_or(0.0),
        utilised.unwrap_or(0.0),
    ))
}
