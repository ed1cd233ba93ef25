use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the audit tools.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A required configuration key is absent or empty.
    #[error("'{0}' not defined in configuration")]
    MissingConfigKey(&'static str),

    /// A report window length outside the accepted range.
    #[error(
        "Invalid report window: {0} days (must be between 1 and {max})",
        max = crate::models::ReportWindow::MAX_DAYS
    )]
    InvalidWindow(u32),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the audit crates.
pub type Result<T> = std::result::Result<T, AuditError>;

// ── Query-source failures ─────────────────────────────────────────────────────

/// Closed set of failure categories a query source may report.
///
/// The aggregator treats all of them the same way (log and fall back to
/// zero-valued days); the category only selects the log hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The queried history table or view does not exist.
    NotFound,
    /// The caller lacks read permission on the job history.
    PermissionDenied,
    /// Anything else.
    Other,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceErrorKind::NotFound => "not found",
            SourceErrorKind::PermissionDenied => "permission denied",
            SourceErrorKind::Other => "query failed",
        };
        f.write_str(label)
    }
}

/// A failure reported by a query source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::PermissionDenied, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Other, message)
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => SourceErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => SourceErrorKind::PermissionDenied,
            _ => SourceErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}
