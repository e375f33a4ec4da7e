use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Error type covering the different failure cases that can occur when the
/// tracker extracts, loads, reconciles, or saves workplan data.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Wrapper for IO failures such as reading, copying or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the JSON edit view cannot be parsed or serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the TOML configuration file is malformed.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a cell cannot be interpreted for its column.
    #[error("invalid literal value '{value}' in column {column}")]
    InvalidLiteral { column: String, value: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a single-task update names an ID the tracker does not hold.
    #[error("no task with ID {0}")]
    TaskNotFound(u32),

    /// Raised when the acting user identity is not usable for audit fields.
    #[error("invalid user identity '{0}': expected an email address")]
    InvalidUser(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
