use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: u32,
}

impl YearQuarter {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl Serialize for YearQuarter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One logged visit, with the calendar buckets and order flag derived at load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub rep: String,
    pub territory: String,
    pub pharmacy: Option<String>,
    pub visit_date: NaiveDate,
    pub activity_type: Option<String>,
    pub month: YearMonth,
    pub quarter: YearQuarter,
    pub has_order: bool,
}

impl VisitRecord {
    pub fn new(
        rep: String,
        territory: String,
        pharmacy: Option<String>,
        visit_date: NaiveDate,
        activity_type: Option<String>,
    ) -> Self {
        let has_order = activity_type
            .as_deref()
            .map(is_order_activity)
            .unwrap_or(false);

        Self {
            rep,
            territory,
            pharmacy,
            visit_date,
            activity_type,
            month: YearMonth::of(visit_date),
            quarter: YearQuarter::of(visit_date),
            has_order,
        }
    }
}

pub fn is_order_activity(activity_type: &str) -> bool {
    activity_type.to_lowercase().contains("commande")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerritorySummary {
    pub territory: String,
    pub total_visits: usize,
    pub unique_reps: usize,
    pub visits_per_rep: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverageStatus {
    UnderCovered,
    WellCovered,
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageStatus::UnderCovered => write!(f, "Under-covered"),
            CoverageStatus::WellCovered => write!(f, "Well-covered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerritoryCoverage {
    pub territory: String,
    pub visit_count: usize,
    pub status: CoverageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentZone {
    pub territory: String,
    pub pharmacy_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EngagementTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for EngagementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementTier::Low => write!(f, "Low"),
            EngagementTier::Medium => write!(f, "Medium"),
            EngagementTier::High => write!(f, "High"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSegment {
    pub pharmacy: String,
    pub total_visits: usize,
    pub unique_activity_types: usize,
    pub first_visit: NaiveDate,
    pub last_visit: NaiveDate,
    pub engagement_days: i64,
    pub score: f64,
    pub tier: Option<EngagementTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PharmacyEngagement {
    pub pharmacy: String,
    pub visit_count: usize,
    pub territory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub pharmacy: String,
    pub quarter: YearQuarter,
    pub visits: usize,
    pub order_visits: usize,
    pub order_rate: f64,
    pub avg_order_rate: Option<f64>,
    pub historical_orders: usize,
    pub predicted_order: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepStatus {
    Normal,
    Overloaded,
    Underperforming,
    Critical,
}

impl fmt::Display for RepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepStatus::Normal => write!(f, "Normal"),
            RepStatus::Overloaded => write!(f, "Overloaded"),
            RepStatus::Underperforming => write!(f, "Underperforming"),
            RepStatus::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepStatusRow {
    pub rep: String,
    pub total_visits: usize,
    pub unique_pharmacies: usize,
    pub unique_territories: usize,
    pub visits_per_pharmacy: Option<f64>,
    pub status: RepStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyActivity {
    pub month: YearMonth,
    pub activity_type: String,
    pub visits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRep {
    pub month: YearMonth,
    pub rep: String,
    pub visits: usize,
    pub order_visits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPharmacy {
    pub month: YearMonth,
    pub pharmacy: String,
    pub visits: usize,
    pub unique_activity_types: usize,
}
