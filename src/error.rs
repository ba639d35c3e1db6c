use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("sheet '{sheet}' not found in {}", path.display())]
    SheetNotFound { path: PathBuf, sheet: String },

    #[error("unsupported source format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("row {row}: '{column}' is empty")]
    MissingValue { row: usize, column: String },

    #[error("row {row}: cannot parse visit date '{value}'")]
    InvalidDate { row: usize, value: String },
}

pub type LoadResult<T> = Result<T, LoadError>;
