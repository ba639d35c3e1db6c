use std::collections::BTreeMap;

use crate::models::{ForecastRecord, VisitRecord, YearQuarter};
use crate::stats;

/// Historical order rate a pharmacy must exceed to be flagged as likely to order.
pub const ORDER_RATE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterOrders {
    pub pharmacy: String,
    pub quarter: YearQuarter,
    pub visits: usize,
    pub order_visits: usize,
    pub order_rate: f64,
}

/// Visits and order visits per pharmacy and quarter, ordered by pharmacy
/// then quarter.
pub fn quarterly_orders(visits: &[VisitRecord]) -> Vec<QuarterOrders> {
    let mut groups: BTreeMap<(&str, YearQuarter), (usize, usize)> = BTreeMap::new();
    for visit in visits {
        let Some(pharmacy) = visit.pharmacy.as_deref() else {
            continue;
        };
        let entry = groups.entry((pharmacy, visit.quarter)).or_default();
        entry.0 += 1;
        if visit.has_order {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|((pharmacy, quarter), (visits, order_visits))| QuarterOrders {
            pharmacy: pharmacy.to_string(),
            quarter,
            visits,
            order_visits,
            order_rate: order_visits as f64 / visits as f64,
        })
        .collect()
}

/// Predicts which pharmacies will order in the latest quarter present in
/// `visits`, from their mean order rate over every earlier quarter.
pub fn sales_forecast(visits: &[VisitRecord]) -> Vec<ForecastRecord> {
    let quarters = quarterly_orders(visits);
    let Some(latest) = quarters.iter().map(|q| q.quarter).max() else {
        return Vec::new();
    };

    let mut history: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();
    for row in quarters.iter().filter(|q| q.quarter < latest) {
        let entry = history.entry(row.pharmacy.as_str()).or_default();
        entry.0.push(row.order_rate);
        entry.1 += row.order_visits;
    }

    let forecast: Vec<ForecastRecord> = quarters
        .iter()
        .filter(|q| q.quarter == latest)
        .map(|row| {
            let (avg_order_rate, historical_orders) = match history.get(row.pharmacy.as_str()) {
                Some((rates, orders)) => (stats::mean(rates), *orders),
                None => (None, 0),
            };
            ForecastRecord {
                pharmacy: row.pharmacy.clone(),
                quarter: row.quarter,
                visits: row.visits,
                order_visits: row.order_visits,
                order_rate: row.order_rate,
                avg_order_rate,
                historical_orders,
                predicted_order: avg_order_rate.is_some_and(|rate| rate > ORDER_RATE_THRESHOLD),
            }
        })
        .collect();

    tracing::debug!(
        quarter = %latest,
        pharmacies = forecast.len(),
        "computed order forecast"
    );
    forecast
}

pub fn likely_to_order_count(forecast: &[ForecastRecord]) -> usize {
    forecast.iter().filter(|f| f.predicted_order).count()
}
