//! Visit table loader.
//!
//! Reads the `Visits` sheet of the field-activity workbook (or a CSV export of
//! it) and normalizes each row into a [`VisitRecord`]. Expected columns:
//!   Rep, Territory Code, Pharmacies, Visit Date, Activity Type

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{LoadError, LoadResult};
use crate::models::VisitRecord;

pub const COL_REP: &str = "Rep";
pub const COL_TERRITORY: &str = "Territory Code";
pub const COL_PHARMACY: &str = "Pharmacies";
pub const COL_VISIT_DATE: &str = "Visit Date";
pub const COL_ACTIVITY: &str = "Activity Type";

static EMPTY_CELL: Data = Data::Empty;

pub const DEFAULT_SOURCE: &str = "exp01_calls_efkfr_20250505.xlsx";
pub const DEFAULT_SHEET: &str = "Visits";

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub sheet: String,
}

enum RawDate {
    Date(NaiveDate),
    Text(String),
}

struct RawVisit {
    rep: Option<String>,
    territory: Option<String>,
    pharmacy: Option<String>,
    visit_date: Option<RawDate>,
    activity_type: Option<String>,
}

pub fn load_visits(config: &SourceConfig) -> LoadResult<Vec<VisitRecord>> {
    let extension = config
        .path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let records = match extension.as_deref() {
        Some("csv") => load_csv_file(&config.path)?,
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => {
            load_workbook(&config.path, &config.sheet)?
        }
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: config.path.clone(),
            })
        }
    };

    let without_pharmacy = records.iter().filter(|r| r.pharmacy.is_none()).count();
    tracing::info!(
        path = %config.path.display(),
        records = records.len(),
        without_pharmacy,
        "loaded visit records"
    );

    Ok(records)
}

pub fn load_csv_file(path: &Path) -> LoadResult<Vec<VisitRecord>> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_csv(file)
}

pub fn load_csv<R: std::io::Read>(reader: R) -> LoadResult<Vec<VisitRecord>> {
    #[derive(Deserialize)]
    struct CsvRow {
        #[serde(rename = "Rep")]
        rep: Option<String>,
        #[serde(rename = "Territory Code")]
        territory: Option<String>,
        #[serde(rename = "Pharmacies")]
        pharmacy: Option<String>,
        #[serde(rename = "Visit Date")]
        visit_date: Option<String>,
        #[serde(rename = "Activity Type")]
        activity_type: Option<String>,
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    check_columns(&headers)?;

    let mut records = Vec::new();
    for (index, result) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let raw = RawVisit {
            rep: non_blank(row.rep),
            territory: non_blank(row.territory),
            pharmacy: non_blank(row.pharmacy),
            visit_date: non_blank(row.visit_date).map(RawDate::Text),
            activity_type: non_blank(row.activity_type),
        };
        records.push(normalize(index + 2, raw)?);
    }

    Ok(records)
}

pub fn load_workbook(path: &Path, sheet: &str) -> LoadResult<Vec<VisitRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(LoadError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        });
    }
    let range = workbook.worksheet_range(sheet)?;

    let header_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();
    let columns = check_columns(&headers)?;

    let mut records = Vec::new();
    for (index, cells) in rows.enumerate() {
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let cell = |column: usize| cells.get(column).unwrap_or(&EMPTY_CELL);
        let date_cell = cell(columns.visit_date);
        let visit_date = match date_cell.as_date() {
            Some(date) => Some(RawDate::Date(date)),
            None => cell_text(date_cell).map(RawDate::Text),
        };
        let raw = RawVisit {
            rep: cell_text(cell(columns.rep)),
            territory: cell_text(cell(columns.territory)),
            pharmacy: cell_text(cell(columns.pharmacy)),
            visit_date,
            activity_type: cell_text(cell(columns.activity_type)),
        };
        records.push(normalize(sheet_row(header_row, index), raw)?);
    }

    Ok(records)
}

/// 1-based sheet row of the `index`-th data row under a header at the
/// 0-based `header_row`.
fn sheet_row(header_row: usize, index: usize) -> usize {
    header_row + index + 2
}

struct ColumnIndex {
    rep: usize,
    territory: usize,
    pharmacy: usize,
    visit_date: usize,
    activity_type: usize,
}

fn check_columns(headers: &[String]) -> LoadResult<ColumnIndex> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
            })
    };

    Ok(ColumnIndex {
        rep: find(COL_REP)?,
        territory: find(COL_TERRITORY)?,
        pharmacy: find(COL_PHARMACY)?,
        visit_date: find(COL_VISIT_DATE)?,
        activity_type: find(COL_ACTIVITY)?,
    })
}

fn normalize(row: usize, raw: RawVisit) -> LoadResult<VisitRecord> {
    let required = |value: Option<String>, column: &str| {
        value.ok_or_else(|| LoadError::MissingValue {
            row,
            column: column.to_string(),
        })
    };

    let rep = required(raw.rep, COL_REP)?;
    let territory = required(raw.territory, COL_TERRITORY)?;
    let visit_date = match raw.visit_date {
        Some(RawDate::Date(date)) => date,
        Some(RawDate::Text(text)) => {
            parse_visit_date(&text).ok_or(LoadError::InvalidDate { row, value: text })?
        }
        None => {
            return Err(LoadError::MissingValue {
                row,
                column: COL_VISIT_DATE.to_string(),
            })
        }
    };

    Ok(VisitRecord::new(
        rep,
        territory,
        raw.pharmacy,
        visit_date,
        raw.activity_type,
    ))
}

pub fn parse_visit_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    NaiveDate::parse_from_str(text, "%d/%m/%Y").ok()
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(value) => value.clone(),
        // Numeric ids come back as floats.
        Data::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        other => other.to_string(),
    };
    non_blank(Some(text))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
