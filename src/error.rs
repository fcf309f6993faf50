//! Error types for wp-site-analyzer

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during site analysis
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid URL provided
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to create HTTP client
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    /// HTTP response error status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// Site does not appear to be WordPress
    #[error("site does not appear to be WordPress")]
    NotWordPress,

    /// The snapshot lacks data a scanner cannot do without
    #[error("missing site data: {0}")]
    MissingData(&'static str),

    /// A CSS extraction pattern failed to compile
    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Invalid export format specified
    #[error("invalid export format: '{0}' (valid: json, markdown, ai_optimized)")]
    InvalidExportFormat(String),

    /// Invalid output format specified
    #[error("invalid output format: '{0}' (valid: human, json, none)")]
    InvalidOutputFormat(String),

    /// Invalid sort order specified
    #[error("invalid sort order: '{0}' (valid: registry, name, status)")]
    InvalidOutputSort(String),

    /// Export requested before any scan was cached
    #[error("no scan results available")]
    NoScanResults,

    /// Export format disabled in configuration
    #[error("export format '{0}' is disabled")]
    ExportDisabled(String),

    /// Security token missing or not valid for the action
    #[error("security verification failed")]
    InvalidToken,

    /// Caller lacks the administrator capability
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// Configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing a file failed
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Output operation failed
    #[error("output failed: {0}")]
    OutputFailed(#[source] std::io::Error),

    /// JSON serialization failed
    #[error("JSON serialization failed")]
    SerializationFailed(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
