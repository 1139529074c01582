//! Error types for Shotsort.
//!
//! `ShotsortError` is the library-wide error. Per-step outcomes that must
//! never abort a batch (naming, upload) use the tagged types in
//! [`crate::naming`] and [`crate::remote`] instead of this enum.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Shotsort library.
#[derive(Debug, Error)]
pub enum ShotsortError {
    // Startup errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Credentials not found at {0}")]
    CredentialsMissing(PathBuf),

    #[error("Storage backend initialization failed: {message}")]
    BackendInit { message: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // Remote storage errors
    #[error("{message}")]
    Storage { message: String },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Shotsort operations.
pub type Result<T> = std::result::Result<T, ShotsortError>;

/// Where an error sits in the failure taxonomy of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Aborts before any file is processed.
    Startup,
    /// Isolated to one step of one file.
    Recoverable,
    /// Anything else; still downgraded to a per-file failure.
    Unexpected,
}

impl From<std::io::Error> for ShotsortError {
    fn from(err: std::io::Error) -> Self {
        ShotsortError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ShotsortError {
    fn from(err: serde_json::Error) -> Self {
        ShotsortError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for ShotsortError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ShotsortError::Timeout(std::time::Duration::from_secs(0))
        } else {
            ShotsortError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl ShotsortError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ShotsortError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a storage error carrying the backend's text verbatim.
    pub fn storage(message: impl Into<String>) -> Self {
        ShotsortError::Storage {
            message: message.into(),
        }
    }

    /// Classify this error for reporting.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ShotsortError::Config { .. }
            | ShotsortError::CredentialsMissing(_)
            | ShotsortError::BackendInit { .. } => ErrorCategory::Startup,

            ShotsortError::Auth { .. }
            | ShotsortError::Storage { .. }
            | ShotsortError::Network { .. }
            | ShotsortError::Timeout(_)
            | ShotsortError::Io { .. } => ErrorCategory::Recoverable,

            _ => ErrorCategory::Unexpected,
        }
    }

    /// True for errors that must stop the process before a batch starts.
    ///
    /// A non-fatal error at startup (the network being down) may be retried.
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Startup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_message_is_verbatim() {
        let err = ShotsortError::storage("quota exceeded for drive");
        assert_eq!(err.to_string(), "quota exceeded for drive");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ShotsortError::CredentialsMissing(PathBuf::from("credentials.json")).category(),
            ErrorCategory::Startup
        );
        assert_eq!(
            ShotsortError::storage("boom").category(),
            ErrorCategory::Recoverable
        );
        assert_eq!(
            ShotsortError::Other("???".into()).category(),
            ErrorCategory::Unexpected
        );
    }

    #[test]
    fn test_fatal_only_for_startup() {
        assert!(ShotsortError::BackendInit {
            message: "no token".into()
        }
        .is_fatal());
        assert!(!ShotsortError::Timeout(std::time::Duration::from_secs(5)).is_fatal());
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let err = ShotsortError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            "/tmp/x.png",
        );
        match err {
            ShotsortError::Io { path, .. } => assert_eq!(path, Some(PathBuf::from("/tmp/x.png"))),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
