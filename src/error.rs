//! Error types for pagetrace
//!
//! This module provides the error hierarchy using `thiserror`. Startup
//! failures surface as [`Error`] from [`crate::run`]; per-page failures are
//! logged by the crawler and never propagate past the frame that raised them.

use thiserror::Error;

/// The main error type for pagetrace operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Link extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Log output errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// The crawl target could not be used
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Failed to subscribe to network events
    #[error("Failed to subscribe to network events: {0}")]
    SubscribeFailed(String),

    /// Response body could not be retrieved
    #[error("Failed to fetch body for request {request_id}: {message}")]
    BodyUnavailable {
        /// CDP request id of the response
        request_id: String,
        /// Underlying failure
        message: String,
    },
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),

    /// Waiting for a load milestone failed
    #[error("Waiting for {milestone} failed: {message}")]
    WaitFailed {
        /// Milestone that was awaited
        milestone: &'static str,
        /// Underlying failure
        message: String,
    },
}

/// Link extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Extraction failed
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// JavaScript execution failed
    #[error("JavaScript execution failed: {0}")]
    JsExecutionFailed(String),
}

/// Log output errors
#[derive(Error, Debug)]
pub enum OutputError {
    /// The log file could not be created
    #[error("Failed to open log file {path}: {source}")]
    OpenFailed {
        /// Path that was requested
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Writing a record failed
    #[error("Failed to write log records: {0}")]
    WriteFailed(String),
}

/// Result type alias for pagetrace operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
