use std::collections::{BTreeMap, BTreeSet};

use crate::models::{RepStatus, RepStatusRow, VisitRecord};
use crate::stats;

pub const OVERLOAD_QUANTILE: f64 = 0.90;
pub const UNDERPERFORM_QUANTILE: f64 = 0.25;

pub fn classify(overloaded: bool, underperforming: bool) -> RepStatus {
    match (overloaded, underperforming) {
        (true, true) => RepStatus::Critical,
        (true, false) => RepStatus::Overloaded,
        (false, true) => RepStatus::Underperforming,
        (false, false) => RepStatus::Normal,
    }
}

/// Workload per rep, labeled against percentile thresholds of the reps
/// present in `visits`. Visits without a pharmacy count toward the total
/// but not toward visits per pharmacy.
pub fn rep_status(visits: &[VisitRecord]) -> Vec<RepStatusRow> {
    #[derive(Default)]
    struct Acc<'a> {
        visits: usize,
        pharmacy_visits: usize,
        pharmacies: BTreeSet<&'a str>,
        territories: BTreeSet<&'a str>,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for visit in visits {
        let acc = groups.entry(visit.rep.as_str()).or_default();
        acc.visits += 1;
        acc.territories.insert(visit.territory.as_str());
        if let Some(pharmacy) = visit.pharmacy.as_deref() {
            acc.pharmacy_visits += 1;
            acc.pharmacies.insert(pharmacy);
        }
    }

    let mut rows: Vec<RepStatusRow> = groups
        .into_iter()
        .map(|(rep, acc)| RepStatusRow {
            rep: rep.to_string(),
            total_visits: acc.visits,
            unique_pharmacies: acc.pharmacies.len(),
            unique_territories: acc.territories.len(),
            visits_per_pharmacy: stats::ratio(acc.pharmacy_visits, acc.pharmacies.len()),
            status: RepStatus::Normal,
        })
        .collect();

    let totals: Vec<f64> = rows.iter().map(|r| r.total_visits as f64).collect();
    let per_pharmacy: Vec<f64> = rows.iter().filter_map(|r| r.visits_per_pharmacy).collect();
    let overload = stats::quantile(&totals, OVERLOAD_QUANTILE);
    let underperform = stats::quantile(&per_pharmacy, UNDERPERFORM_QUANTILE);

    tracing::debug!(
        reps = rows.len(),
        ?overload,
        ?underperform,
        "rep status thresholds"
    );

    for row in rows.iter_mut() {
        let overloaded = overload.is_some_and(|t| row.total_visits as f64 >= t);
        let underperforming = match (row.visits_per_pharmacy, underperform) {
            (Some(ratio), Some(t)) => ratio <= t,
            _ => false,
        };
        row.status = classify(overloaded, underperforming);
    }

    rows
}
