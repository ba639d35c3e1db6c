use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::models::{AccountSegment, EngagementTier, PharmacyEngagement, VisitRecord};
use crate::stats;

pub const VISIT_WEIGHT: f64 = 0.6;
pub const ACTIVITY_TYPE_WEIGHT: f64 = 20.0;
pub const DURATION_WEIGHT: f64 = 0.2;

pub const PRIORITY_VISIT_QUANTILE: f64 = 0.25;

pub fn engagement_score(visits: usize, activity_types: usize, duration_days: i64) -> f64 {
    visits as f64 * VISIT_WEIGHT
        + activity_types as f64 * ACTIVITY_TYPE_WEIGHT
        + duration_days as f64 * DURATION_WEIGHT
}

/// Tier labels for a quantile cut that formed `groups` groups.
fn tier_labels(groups: usize) -> &'static [EngagementTier] {
    match groups {
        3 => &[EngagementTier::Low, EngagementTier::Medium, EngagementTier::High],
        2 => &[EngagementTier::Low, EngagementTier::High],
        1 => &[EngagementTier::Medium],
        _ => &[],
    }
}

/// Per-pharmacy engagement stats and score, tiered into equal-population
/// buckets over the pharmacies in `visits`. Visits without a pharmacy are
/// skipped.
pub fn account_segmentation(visits: &[VisitRecord]) -> Vec<AccountSegment> {
    struct Acc<'a> {
        visits: usize,
        activity_types: BTreeSet<&'a str>,
        first: NaiveDate,
        last: NaiveDate,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for visit in visits {
        let Some(pharmacy) = visit.pharmacy.as_deref() else {
            continue;
        };
        let acc = groups.entry(pharmacy).or_insert_with(|| Acc {
            visits: 0,
            activity_types: BTreeSet::new(),
            first: visit.visit_date,
            last: visit.visit_date,
        });
        acc.visits += 1;
        if let Some(activity) = visit.activity_type.as_deref() {
            acc.activity_types.insert(activity);
        }
        acc.first = acc.first.min(visit.visit_date);
        acc.last = acc.last.max(visit.visit_date);
    }

    let mut segments: Vec<AccountSegment> = groups
        .into_iter()
        .map(|(pharmacy, acc)| {
            let engagement_days = (acc.last - acc.first).num_days();
            AccountSegment {
                pharmacy: pharmacy.to_string(),
                total_visits: acc.visits,
                unique_activity_types: acc.activity_types.len(),
                first_visit: acc.first,
                last_visit: acc.last,
                engagement_days,
                score: engagement_score(acc.visits, acc.activity_types.len(), engagement_days),
                tier: None,
            }
        })
        .collect();

    let scores: Vec<f64> = segments.iter().map(|s| s.score).collect();
    let (groups, assigned) = stats::quantile_cut(&scores, 3);
    let labels = tier_labels(groups);
    for (segment, bucket) in segments.iter_mut().zip(assigned) {
        segment.tier = bucket.and_then(|b| labels.get(b).copied());
    }

    tracing::debug!(pharmacies = segments.len(), tiers = groups, "segmented accounts");
    segments
}

/// Highest score first.
pub fn sorted_by_score(mut segments: Vec<AccountSegment>) -> Vec<AccountSegment> {
    segments.sort_by(|a, b| b.score.total_cmp(&a.score));
    segments
}

/// Visit count per pharmacy, tagged with the territory of its first visit.
pub fn pharmacy_engagement(visits: &[VisitRecord]) -> Vec<PharmacyEngagement> {
    let mut groups: BTreeMap<&str, (usize, &str)> = BTreeMap::new();
    for visit in visits {
        let Some(pharmacy) = visit.pharmacy.as_deref() else {
            continue;
        };
        groups
            .entry(pharmacy)
            .or_insert((0, visit.territory.as_str()))
            .0 += 1;
    }

    groups
        .into_iter()
        .map(|(pharmacy, (visit_count, territory))| PharmacyEngagement {
            pharmacy: pharmacy.to_string(),
            visit_count,
            territory: territory.to_string(),
        })
        .collect()
}

pub fn top_engaged(visits: &[VisitRecord], limit: usize) -> Vec<PharmacyEngagement> {
    let mut engagement = pharmacy_engagement(visits);
    engagement.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    engagement.truncate(limit);
    engagement
}

/// Low-visit pharmacies in territories denser than average. A pharmacy is
/// low-visit when its count is at or under the first quartile of all
/// pharmacy visit counts.
pub fn priority_pharmacies(visits: &[VisitRecord]) -> Vec<PharmacyEngagement> {
    let mut density: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for visit in visits {
        if let Some(pharmacy) = visit.pharmacy.as_deref() {
            density
                .entry(visit.territory.as_str())
                .or_default()
                .insert(pharmacy);
        }
    }

    let counts: Vec<f64> = density.values().map(|p| p.len() as f64).collect();
    let Some(mean_density) = stats::mean(&counts) else {
        return Vec::new();
    };
    let dense: HashSet<&str> = density
        .iter()
        .filter(|(_, pharmacies)| pharmacies.len() as f64 > mean_density)
        .map(|(territory, _)| *territory)
        .collect();

    let engagement = pharmacy_engagement(visits);
    let visit_counts: Vec<f64> = engagement.iter().map(|e| e.visit_count as f64).collect();
    let Some(threshold) = stats::quantile(&visit_counts, PRIORITY_VISIT_QUANTILE) else {
        return Vec::new();
    };

    engagement
        .into_iter()
        .filter(|e| dense.contains(e.territory.as_str()) && e.visit_count as f64 <= threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(territory: &str, pharmacy: Option<&str>, date: (i32, u32, u32), activity: &str) -> VisitRecord {
        VisitRecord::new(
            "R1".to_string(),
            territory.to_string(),
            pharmacy.map(str::to_string),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            Some(activity.to_string()),
        )
    }

    /// `count` visits spread over `activities`, first on day one of January
    /// 2025 and last `duration` days later.
    fn pharmacy_visits(pharmacy: &str, count: usize, activities: usize, duration: i64) -> Vec<VisitRecord> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        (0..count)
            .map(|i| {
                let date = if i + 1 == count {
                    start + chrono::Duration::days(duration)
                } else {
                    start
                };
                VisitRecord::new(
                    "R1".to_string(),
                    "K105".to_string(),
                    Some(pharmacy.to_string()),
                    date,
                    Some(format!("activity-{}", i % activities)),
                )
            })
            .collect()
    }

    #[test]
    fn score_uses_fixed_weights() {
        assert!((engagement_score(10, 3, 30) - 72.0).abs() < 1e-9);

        let segments = account_segmentation(&pharmacy_visits("PH-1", 10, 3, 30));
        assert_eq!(segments.len(), 1);
        let segment = &segments[0];
        assert_eq!(segment.total_visits, 10);
        assert_eq!(segment.unique_activity_types, 3);
        assert_eq!(segment.engagement_days, 30);
        assert!((segment.score - 72.0).abs() < 1e-9);
    }

    #[test]
    fn skips_visits_without_pharmacy() {
        let visits = vec![
            visit("K105", None, (2025, 1, 2), "Visite"),
            visit("K105", Some("PH-1"), (2025, 1, 2), "Visite"),
        ];
        let segments = account_segmentation(&visits);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].pharmacy, "PH-1");
    }

    #[test]
    fn tiers_are_monotonic_in_score() {
        let mut visits = Vec::new();
        for (i, count) in [1usize, 2, 3, 5, 8, 13, 21, 34, 55].iter().enumerate() {
            visits.extend(pharmacy_visits(&format!("PH-{i}"), *count, 1, 0));
        }
        let segments = account_segmentation(&visits);
        assert_eq!(segments.len(), 9);

        for a in &segments {
            for b in &segments {
                if a.score > b.score {
                    assert!(a.tier >= b.tier, "{} vs {}", a.pharmacy, b.pharmacy);
                }
            }
        }

        let sorted = sorted_by_score(segments);
        assert_eq!(sorted[0].tier, Some(EngagementTier::High));
        assert_eq!(sorted[8].tier, Some(EngagementTier::Low));
    }

    #[test]
    fn duplicate_scores_collapse_tiers() {
        let mut visits = Vec::new();
        for i in 0..4 {
            visits.extend(pharmacy_visits(&format!("PH-{i}"), 1, 1, 0));
        }
        visits.extend(pharmacy_visits("PH-big", 40, 1, 0));

        let segments = account_segmentation(&visits);
        assert!(segments.iter().all(|s| s.tier == Some(EngagementTier::Medium)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut visits = Vec::new();
        for (i, count) in [2usize, 4, 4, 9, 1].iter().enumerate() {
            visits.extend(pharmacy_visits(&format!("PH-{i}"), *count, 2, i as i64 * 7));
        }
        assert_eq!(account_segmentation(&visits), account_segmentation(&visits));
    }

    #[test]
    fn single_pharmacy_has_no_tier() {
        let segments = account_segmentation(&pharmacy_visits("PH-1", 2, 1, 5));
        assert_eq!(segments[0].tier, None);
    }

    #[test]
    fn engagement_keeps_first_territory() {
        let visits = vec![
            visit("K406", Some("PH-1"), (2025, 1, 2), "Visite"),
            visit("K105", Some("PH-1"), (2025, 1, 3), "Visite"),
            visit("K105", Some("PH-2"), (2025, 1, 3), "Visite"),
        ];
        let engagement = pharmacy_engagement(&visits);
        assert_eq!(engagement[0].pharmacy, "PH-1");
        assert_eq!(engagement[0].territory, "K406");
        assert_eq!(engagement[0].visit_count, 2);

        let top = top_engaged(&visits, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].pharmacy, "PH-1");
    }

    #[test]
    fn priority_pharmacies_sit_in_dense_territories() {
        let mut visits = Vec::new();
        // K105 has three pharmacies, K406 one.
        for _ in 0..5 {
            visits.push(visit("K105", Some("PH-A"), (2025, 1, 2), "Visite"));
        }
        visits.push(visit("K105", Some("PH-B"), (2025, 1, 2), "Visite"));
        for _ in 0..4 {
            visits.push(visit("K105", Some("PH-C"), (2025, 1, 2), "Visite"));
        }
        visits.push(visit("K406", Some("PH-D"), (2025, 1, 2), "Visite"));

        let priority = priority_pharmacies(&visits);
        let names: Vec<&str> = priority.iter().map(|p| p.pharmacy.as_str()).collect();
        assert_eq!(names, vec!["PH-B"]);
    }

    #[test]
    fn empty_input_gives_empty_views() {
        assert!(account_segmentation(&[]).is_empty());
        assert!(top_engaged(&[], 10).is_empty());
        assert!(priority_pharmacies(&[]).is_empty());
    }
}
