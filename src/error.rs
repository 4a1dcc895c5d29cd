use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Unknown source kind: {0}")]
    UnknownSource(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Sheet not found: {0}")]
    MissingSheet(String),

    #[error("Column not found in {source_name}: {column}")]
    MissingColumn { source_name: String, column: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DuesError>;
