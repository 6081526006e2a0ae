//! Error types for verareport application
use crate::credentials::CredentialError;

/// Custom error type for verareport operations
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// Detailed report retrieval or parsing error
    #[error("Detailed report error: {0}")]
    DetailedReport(#[from] veracode_detailedreport::DetailedReportError),

    /// Veracode client error
    #[error("Veracode API error: {0}")]
    VeracodeApi(#[from] veracode_detailedreport::VeracodeError),

    /// Category table error
    #[error("Category table error: {0}")]
    Category(#[from] veracode_detailedreport::CategoryError),

    /// Credential error
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for verareport operations
pub type Result<T> = std::result::Result<T, ReportError>;
