use std::collections::BTreeSet;

use crate::error::LoadResult;
use crate::loader::{self, SourceConfig};
use crate::models::VisitRecord;

/// Which territories a view is computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerritorySelection {
    All,
    One(String),
    Many(BTreeSet<String>),
}

impl TerritorySelection {
    /// No codes means every territory.
    pub fn from_codes(codes: &[String]) -> Self {
        match codes {
            [] => TerritorySelection::All,
            [code] => TerritorySelection::One(code.clone()),
            _ => TerritorySelection::Many(codes.iter().cloned().collect()),
        }
    }

    pub fn contains(&self, territory: &str) -> bool {
        match self {
            TerritorySelection::All => true,
            TerritorySelection::One(code) => code == territory,
            TerritorySelection::Many(codes) => codes.contains(territory),
        }
    }

    pub fn label(&self) -> String {
        match self {
            TerritorySelection::All => "all territories".to_string(),
            TerritorySelection::One(code) => code.clone(),
            TerritorySelection::Many(codes) if codes.is_empty() => "no territories".to_string(),
            TerritorySelection::Many(codes) => codes.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

/// Normalized visit table for one session. Loaded once; every view reads
/// from the same records.
#[derive(Debug, Clone)]
pub struct VisitSession {
    records: Vec<VisitRecord>,
}

impl VisitSession {
    pub fn open(config: &SourceConfig) -> LoadResult<Self> {
        let records = loader::load_visits(config)?;
        Ok(Self { records })
    }

    #[cfg(test)]
    pub fn from_records(records: Vec<VisitRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[VisitRecord] {
        &self.records
    }

    pub fn territories(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.territory.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn filter(&self, selection: &TerritorySelection) -> Vec<VisitRecord> {
        let filtered: Vec<VisitRecord> = self
            .records
            .iter()
            .filter(|r| selection.contains(&r.territory))
            .cloned()
            .collect();

        tracing::debug!(
            selection = %selection.label(),
            records = filtered.len(),
            "filtered visits"
        );
        filtered
    }
}
