use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepairError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Series is empty: {0}")]
    EmptySeries(String),

    #[error("Invalid time range: start {start} is not before end {end}")]
    InvalidTimeRange { start: f64, end: f64 },
}

pub type Result<T> = std::result::Result<T, RepairError>;
