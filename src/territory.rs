use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    CoverageStatus, DeploymentZone, TerritoryCoverage, TerritorySummary, VisitRecord,
};
use crate::stats;

pub const DEFAULT_DEPLOYMENT_ZONES: [&str; 2] = ["K105", "K406"];

/// Visits and distinct reps per territory, in territory-code order.
pub fn territory_load(visits: &[VisitRecord]) -> Vec<TerritorySummary> {
    let mut groups: BTreeMap<&str, (usize, BTreeSet<&str>)> = BTreeMap::new();

    for visit in visits {
        let entry = groups.entry(visit.territory.as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(visit.rep.as_str());
    }

    groups
        .into_iter()
        .map(|(territory, (total_visits, reps))| TerritorySummary {
            territory: territory.to_string(),
            total_visits,
            unique_reps: reps.len(),
            visits_per_rep: stats::ratio(total_visits, reps.len()),
        })
        .collect()
}

/// Heaviest load first. Ties keep their incoming order; undefined ratios go last.
pub fn sorted_by_load(mut summaries: Vec<TerritorySummary>) -> Vec<TerritorySummary> {
    summaries.sort_by(|a, b| match (a.visits_per_rep, b.visits_per_rep) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    summaries
}

/// Pharmacy visits per territory; territories below the mean are
/// under-covered. Busiest first. Visits without a pharmacy are skipped.
pub fn territory_coverage(visits: &[VisitRecord]) -> Vec<TerritoryCoverage> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for visit in visits.iter().filter(|v| v.pharmacy.is_some()) {
        *counts.entry(visit.territory.as_str()).or_default() += 1;
    }

    let values: Vec<f64> = counts.values().map(|c| *c as f64).collect();
    let Some(average) = stats::mean(&values) else {
        return Vec::new();
    };

    let mut coverage: Vec<TerritoryCoverage> = counts
        .into_iter()
        .map(|(territory, visit_count)| TerritoryCoverage {
            territory: territory.to_string(),
            visit_count,
            status: if (visit_count as f64) < average {
                CoverageStatus::UnderCovered
            } else {
                CoverageStatus::WellCovered
            },
        })
        .collect();

    coverage.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    coverage
}

/// Distinct pharmacies visited in each suggested zone. Zones absent from the
/// visits are left out.
pub fn deployment_zones(visits: &[VisitRecord], zones: &[String]) -> Vec<DeploymentZone> {
    zones
        .iter()
        .filter_map(|zone| {
            let pharmacies: BTreeSet<&str> = visits
                .iter()
                .filter(|v| &v.territory == zone)
                .filter_map(|v| v.pharmacy.as_deref())
                .collect();

            if pharmacies.is_empty() {
                None
            } else {
                Some(DeploymentZone {
                    territory: zone.clone(),
                    pharmacy_count: pharmacies.len(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn visit(rep: &str, territory: &str, pharmacy: Option<&str>) -> VisitRecord {
        VisitRecord::new(
            rep.to_string(),
            territory.to_string(),
            pharmacy.map(str::to_string),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            Some("Visite".to_string()),
        )
    }

    fn sample() -> Vec<VisitRecord> {
        vec![
            visit("R1", "K105", Some("PH-1")),
            visit("R2", "K105", Some("PH-2")),
            visit("R1", "K105", None),
            visit("R1", "K105", Some("PH-1")),
            visit("R3", "K406", Some("PH-3")),
            visit("R3", "K406", Some("PH-3")),
            visit("R4", "K210", Some("PH-4")),
            visit("R5", "K210", Some("PH-4")),
        ]
    }

    #[test]
    fn counts_sum_to_filtered_total() {
        let visits = sample();
        let summaries = territory_load(&visits);
        let total: usize = summaries.iter().map(|s| s.total_visits).sum();
        assert_eq!(total, visits.len());
    }

    #[test]
    fn visits_per_rep_divides_by_distinct_reps() {
        let visits: Vec<VisitRecord> = (0..120)
            .map(|i| visit(&format!("R{}", i % 6), "K105", Some("PH-1")))
            .collect();
        let summaries = territory_load(&visits);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].unique_reps, 6);
        assert_eq!(summaries[0].visits_per_rep, Some(20.0));
    }

    #[test]
    fn load_sort_is_stable_on_ties() {
        let sorted = sorted_by_load(territory_load(&sample()));
        let order: Vec<&str> = sorted.iter().map(|s| s.territory.as_str()).collect();
        // K105: 4/2 = 2.0, K406: 2/1 = 2.0, K210: 2/2 = 1.0
        assert_eq!(order, vec!["K105", "K406", "K210"]);
    }

    #[test]
    fn undefined_ratio_sorts_last() {
        let summaries = vec![
            TerritorySummary {
                territory: "A".to_string(),
                total_visits: 0,
                unique_reps: 0,
                visits_per_rep: None,
            },
            TerritorySummary {
                territory: "B".to_string(),
                total_visits: 3,
                unique_reps: 3,
                visits_per_rep: Some(1.0),
            },
        ];
        let sorted = sorted_by_load(summaries);
        assert_eq!(sorted[0].territory, "B");
        assert_eq!(sorted[1].territory, "A");
    }

    #[test]
    fn coverage_labels_against_mean() {
        let coverage = territory_coverage(&sample());
        // mean = 7 / 3
        assert_eq!(coverage[0].territory, "K105");
        assert_eq!(coverage[0].visit_count, 3);
        assert_eq!(coverage[0].status, CoverageStatus::WellCovered);
        assert!(coverage[1..]
            .iter()
            .all(|c| c.status == CoverageStatus::UnderCovered));
    }

    #[test]
    fn coverage_skips_visits_without_pharmacy() {
        let visits = vec![
            visit("R1", "K105", None),
            visit("R1", "K105", None),
            visit("R2", "K406", Some("PH-3")),
        ];
        let coverage = territory_coverage(&visits);
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].territory, "K406");
        assert_eq!(coverage[0].visit_count, 1);
    }

    #[test]
    fn deployment_counts_distinct_pharmacies() {
        let zones: Vec<String> = DEFAULT_DEPLOYMENT_ZONES
            .iter()
            .map(|z| z.to_string())
            .chain(std::iter::once("K999".to_string()))
            .collect();
        let suggested = deployment_zones(&sample(), &zones);
        assert_eq!(
            suggested,
            vec![
                DeploymentZone {
                    territory: "K105".to_string(),
                    pharmacy_count: 2,
                },
                DeploymentZone {
                    territory: "K406".to_string(),
                    pharmacy_count: 1,
                },
            ]
        );
    }

    #[test]
    fn empty_input_gives_empty_views() {
        assert!(territory_load(&[]).is_empty());
        assert!(territory_coverage(&[]).is_empty());
        assert!(deployment_zones(&[], &["K105".to_string()]).is_empty());
    }
}
