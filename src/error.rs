//! Request-level error taxonomy.
//!
//! Each variant maps to one HTTP status; the message goes under the reserved
//! `error` key.
use thiserror::Error;

/// Errors surfaced to callers of the discovery, metrics, and file APIs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewerError {
    /// Data root (or another startup input) is missing or unusable.
    #[error("{0}")]
    Config(String),

    /// A required request parameter is missing or blank.
    #[error("{0}")]
    MissingParameter(String),

    /// A requested path tried to leave the data root.
    #[error("{0}")]
    InvalidPath(String),

    /// A requested file, project, or database does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The metrics query failed; the driver message is passed through.
    #[error("Database query failed: {0}")]
    Query(String),
}

impl ViewerError {
    /// HTTP status code used when this error terminates a request.
    pub fn status_code(&self) -> u16 {
        match self {
            ViewerError::Config(_) => 500,
            ViewerError::MissingParameter(_) => 400,
            ViewerError::InvalidPath(_) => 400,
            ViewerError::NotFound(_) => 404,
            ViewerError::Query(_) => 500,
        }
    }

    /// Stable kind identifier, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ViewerError::Config(_) => "config",
            ViewerError::MissingParameter(_) => "missing_parameter",
            ViewerError::InvalidPath(_) => "invalid_path",
            ViewerError::NotFound(_) => "not_found",
            ViewerError::Query(_) => "query",
        }
    }

    /// JSON body carrying the message under the reserved `error` key.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

pub type ViewerResult<T> = std::result::Result<T, ViewerError>;
