use std::collections::{BTreeMap, BTreeSet};

use crate::models::{MonthlyActivity, MonthlyPharmacy, MonthlyRep, VisitRecord, YearMonth};

pub fn monthly_by_activity(visits: &[VisitRecord]) -> Vec<MonthlyActivity> {
    let mut groups: BTreeMap<(YearMonth, &str), usize> = BTreeMap::new();
    for visit in visits {
        if let Some(activity) = visit.activity_type.as_deref() {
            *groups.entry((visit.month, activity)).or_default() += 1;
        }
    }

    groups
        .into_iter()
        .map(|((month, activity_type), visits)| MonthlyActivity {
            month,
            activity_type: activity_type.to_string(),
            visits,
        })
        .collect()
}

pub fn monthly_by_rep(visits: &[VisitRecord]) -> Vec<MonthlyRep> {
    let mut groups: BTreeMap<(YearMonth, &str), (usize, usize)> = BTreeMap::new();
    for visit in visits {
        let entry = groups.entry((visit.month, visit.rep.as_str())).or_default();
        entry.0 += 1;
        if visit.has_order {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|((month, rep), (visits, order_visits))| MonthlyRep {
            month,
            rep: rep.to_string(),
            visits,
            order_visits,
        })
        .collect()
}

/// Visits without a pharmacy are left out.
pub fn monthly_by_pharmacy(visits: &[VisitRecord]) -> Vec<MonthlyPharmacy> {
    let mut groups: BTreeMap<(YearMonth, &str), (usize, BTreeSet<&str>)> = BTreeMap::new();
    for visit in visits {
        let Some(pharmacy) = visit.pharmacy.as_deref() else {
            continue;
        };
        let entry = groups.entry((visit.month, pharmacy)).or_default();
        entry.0 += 1;
        if let Some(activity) = visit.activity_type.as_deref() {
            entry.1.insert(activity);
        }
    }

    groups
        .into_iter()
        .map(|((month, pharmacy), (visits, activities))| MonthlyPharmacy {
            month,
            pharmacy: pharmacy.to_string(),
            visits,
            unique_activity_types: activities.len(),
        })
        .collect()
}
