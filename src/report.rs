use std::fmt::Write;

use crate::forecast;
use crate::models::VisitRecord;
use crate::productivity;
use crate::segmentation;
use crate::territory;
use crate::trends;

pub const TOP_PHARMACIES: usize = 10;

pub fn fmt_ratio(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn build_report(selection: &str, visits: &[VisitRecord], zones: &[String]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Pharmacy Field Activity Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} visits)",
        selection,
        visits.len()
    );

    let load = territory::sorted_by_load(territory::territory_load(visits));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Territory Load");
    if load.is_empty() {
        let _ = writeln!(output, "No visits recorded for this selection.");
    } else {
        for row in &load {
            let _ = writeln!(
                output,
                "- {}: {} visits by {} reps ({} per rep)",
                row.territory,
                row.total_visits,
                row.unique_reps,
                fmt_ratio(row.visits_per_rep)
            );
        }
    }

    let coverage = territory::territory_coverage(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Territory Coverage");
    if coverage.is_empty() {
        let _ = writeln!(output, "No visits recorded for this selection.");
    } else {
        for row in &coverage {
            let _ = writeln!(
                output,
                "- {}: {} visits ({})",
                row.territory, row.visit_count, row.status
            );
        }
    }

    let segments = segmentation::sorted_by_score(segmentation::account_segmentation(visits));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Account Segmentation");
    if segments.is_empty() {
        let _ = writeln!(output, "No pharmacy visits for this selection.");
    } else {
        for segment in &segments {
            let _ = writeln!(
                output,
                "- {}: score {:.1} [{}] ({} visits, {} activity types, {} days engaged)",
                segment.pharmacy,
                segment.score,
                segment
                    .tier
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "untiered".to_string()),
                segment.total_visits,
                segment.unique_activity_types,
                segment.engagement_days
            );
        }
    }

    let top = segmentation::top_engaged(visits, TOP_PHARMACIES);
    let priority = segmentation::priority_pharmacies(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Engaged Pharmacies");
    if top.is_empty() {
        let _ = writeln!(output, "No pharmacy visits for this selection.");
    } else {
        for row in &top {
            let _ = writeln!(
                output,
                "- {} ({}): {} visits",
                row.pharmacy, row.territory, row.visit_count
            );
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Pharmacies in High-Density Territories");
    if priority.is_empty() {
        let _ = writeln!(output, "No priority pharmacies for this selection.");
    } else {
        for row in &priority {
            let _ = writeln!(
                output,
                "- {} ({}): {} visits",
                row.pharmacy, row.territory, row.visit_count
            );
        }
    }

    let forecast = forecast::sales_forecast(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sales Forecast");
    if let Some(first) = forecast.first() {
        let _ = writeln!(
            output,
            "{} of {} pharmacies likely to order in {}.",
            forecast::likely_to_order_count(&forecast),
            forecast.len(),
            first.quarter
        );
        for row in &forecast {
            let _ = writeln!(
                output,
                "- {}: current rate {:.2}, historical {} -> {}",
                row.pharmacy,
                row.order_rate,
                fmt_ratio(row.avg_order_rate),
                if row.predicted_order {
                    "likely"
                } else {
                    "unlikely"
                }
            );
        }
    } else {
        let _ = writeln!(output, "No pharmacy visits to forecast from.");
    }

    let reps = productivity::rep_status(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rep Status");
    if reps.is_empty() {
        let _ = writeln!(output, "No reps active in this selection.");
    } else {
        for row in &reps {
            let _ = writeln!(
                output,
                "- {}: {} ({} visits, {} pharmacies, {} territories, {} per pharmacy)",
                row.rep,
                row.status,
                row.total_visits,
                row.unique_pharmacies,
                row.unique_territories,
                fmt_ratio(row.visits_per_pharmacy)
            );
        }
    }

    let monthly = trends::monthly_by_rep(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Rep Activity");
    if monthly.is_empty() {
        let _ = writeln!(output, "No visits recorded for this selection.");
    } else {
        for row in &monthly {
            let _ = writeln!(
                output,
                "- {} {}: {} visits, {} with orders",
                row.month, row.rep, row.visits, row.order_visits
            );
        }
    }

    let activity = trends::monthly_by_activity(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Activity Mix");
    if activity.is_empty() {
        let _ = writeln!(output, "No visits recorded for this selection.");
    } else {
        for row in &activity {
            let _ = writeln!(
                output,
                "- {} {}: {} visits",
                row.month, row.activity_type, row.visits
            );
        }
    }

    let pharmacy_trend = trends::monthly_by_pharmacy(visits);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Pharmacy Engagement");
    if pharmacy_trend.is_empty() {
        let _ = writeln!(output, "No pharmacy visits for this selection.");
    } else {
        for row in &pharmacy_trend {
            let _ = writeln!(
                output,
                "- {} {}: {} visits, {} activity types",
                row.month, row.pharmacy, row.visits, row.unique_activity_types
            );
        }
    }

    let deployment = territory::deployment_zones(visits, zones);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rep Deployment Suggestion");
    if deployment.is_empty() {
        let _ = writeln!(output, "No suggested zones present in this selection.");
    } else {
        for zone in &deployment {
            let _ = writeln!(
                output,
                "- {}: {} pharmacies",
                zone.territory, zone.pharmacy_count
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn visit(rep: &str, territory: &str, pharmacy: &str, month: u32, activity: &str) -> VisitRecord {
        VisitRecord::new(
            rep.to_string(),
            territory.to_string(),
            Some(pharmacy.to_string()),
            NaiveDate::from_ymd_opt(2025, month, 3).unwrap(),
            Some(activity.to_string()),
        )
    }

    #[test]
    fn report_has_every_section() {
        let visits = vec![
            visit("R1", "K105", "PH-1", 1, "Commande"),
            visit("R1", "K105", "PH-1", 4, "Visite"),
            visit("R2", "K406", "PH-2", 4, "Visite"),
        ];
        let zones = vec!["K105".to_string()];
        let report = build_report("all territories", &visits, &zones);

        for heading in [
            "## Territory Load",
            "## Territory Coverage",
            "## Account Segmentation",
            "## Most Engaged Pharmacies",
            "## Sales Forecast",
            "## Rep Status",
            "## Monthly Rep Activity",
            "## Monthly Activity Mix",
            "## Monthly Pharmacy Engagement",
            "## Rep Deployment Suggestion",
        ] {
            assert!(report.contains(heading), "missing {heading}");
        }
        assert!(report.contains("Generated for all territories (3 visits)"));
        assert!(report.contains("1 of 2 pharmacies likely to order in 2025Q2."));
        assert!(report.contains("- K105: 1 pharmacies"));
        assert!(report.contains("- 2025-04 PH-1: 1 visits, 1 activity types"));
    }

    #[test]
    fn empty_selection_renders_placeholders() {
        let report = build_report("no territories", &[], &[]);
        assert!(report.contains("Generated for no territories (0 visits)"));
        assert!(report.contains("No pharmacy visits to forecast from."));
        assert!(report.contains("No reps active in this selection."));
        assert!(!report.contains("- "));
    }
}
