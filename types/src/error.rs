//! Pipeline failure taxonomy.
//!
//! Every stage after validation reports failures as a [`BundleError`]. The
//! category is kept for logging; callers of the function only ever see the
//! message inside a status-500 body.

use serde::Serialize;
use thiserror::Error;

/// Failure raised anywhere in the workspace → download → archive → upload sequence.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BundleError {
    /// Stage that failed.
    pub code: ErrorCode,

    /// Human-readable description, returned verbatim in the error body.
    pub message: String,

    /// Error-specific context for logs.
    pub details: ErrorDetails,
}

impl BundleError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: ErrorDetails::default(),
        }
    }

    /// Add a detail field.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.0.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Stage categories. Collapsed into a single status code at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Working directory could not be created.
    Workspace,
    /// Source URL invalid, unreachable, non-2xx, or not writable to disk.
    Download,
    /// Archive enumeration or write failed.
    Archive,
    /// Destination unreachable or returned non-2xx.
    Upload,
    /// Process-level setup failed (HTTP client construction).
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Workspace => "workspace",
            ErrorCode::Download => "download",
            ErrorCode::Archive => "archive",
            ErrorCode::Upload => "upload",
            ErrorCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details as key-value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetails(pub Vec<(String, String)>);

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
