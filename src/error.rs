use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads a sheet, normalizes its prices, or writes them back.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading key or config files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the configuration file is not valid TOML.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Transport level failures talking to the spreadsheet service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when the service account assertion cannot be signed.
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when the service account cannot obtain an access token.
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    /// Raised when the requested worksheet does not exist.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// Raised when a row names a currency missing from the rate table.
    #[error("row {line}: unknown currency '{code}'")]
    UnknownCurrency { line: usize, code: String },

    /// Raised when a unit count is non-numeric or not positive.
    #[error("row {line}: invalid unit count '{value}'")]
    InvalidUnitCount { line: usize, value: String },

    /// Raised when a price cell cannot be read as an amount.
    #[error("row {line}: invalid price '{value}'")]
    InvalidPrice { line: usize, value: String },

    /// Raised in strict mode when one or more rows failed validation.
    #[error("{} row(s) failed validation", .0.len())]
    InvalidRows(Vec<ToolError>),

    /// Raised when none of the configured price columns exist in the header.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Raised when a spreadsheet URL does not contain a spreadsheet id.
    #[error("invalid spreadsheet URL: {0}")]
    InvalidUrl(String),

    /// Raised when a configured exchange rate is unusable.
    #[error("invalid rate for {code}: {reason}")]
    InvalidRate { code: String, reason: String },

    /// Non-success responses from the spreadsheet service.
    #[error("spreadsheet API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the configuration is incomplete or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
