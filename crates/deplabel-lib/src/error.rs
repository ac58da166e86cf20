//! Error types for `deplabel-lib`.
//!
//! Authentication, authorization and generic request failures all surface as
//! [`SyncError::Transport`]; the planning layer never needs to tell them apart.

use thiserror::Error;

/// Primary error type for engine operations.
#[derive(Error, Debug)]
pub enum SyncError {
    // === Configuration Errors ===
    /// Configuration is missing or contradictory. Raised before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single setting failed validation.
    #[error("Invalid setting {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Transport Errors ===
    /// A tracker request failed, either on the wire or with a non-success
    /// status after retries were exhausted.
    #[error("{operation} failed{}: {message}", status_suffix(.status))]
    Transport {
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// The tracker has no issue with this key.
    #[error("Issue not found: {key}")]
    IssueNotFound { key: String },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transport(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {s}")).unwrap_or_default()
}

/// Result type using `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_with_status() {
        let err = SyncError::transport("search issues", Some(503), "unavailable");
        assert_eq!(
            err.to_string(),
            "search issues failed with status 503: unavailable"
        );
    }

    #[test]
    fn test_transport_display_without_status() {
        let err = SyncError::transport("get issue EXT-1", None, "connection reset");
        assert_eq!(err.to_string(), "get issue EXT-1 failed: connection reset");
    }
}
