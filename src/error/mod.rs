//! Error types and handling for `issuemirror`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for wrapped one-off errors
//! - Provides recovery hints for user-facing errors
//! - Conflicts are NOT errors: they are collected in sync reports and the
//!   command succeeds; only transport/store failures surface here

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `issuemirror` operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    // === Workspace Errors ===
    /// Mirror directory not initialized.
    #[error("Mirror not initialized: run 'imi init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Config already exists at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    /// Remote repository could not be determined.
    #[error("Unable to detect repository: {reason} (use --owner and --repo)")]
    RepoDetection { reason: String },

    /// The advisory lock could not be acquired within the timeout.
    #[error("Could not acquire lock at '{path}' within {seconds}s")]
    LockTimeout { path: PathBuf, seconds: u64 },

    // === Record Errors ===
    /// Issue with the specified id was not found in the mirror.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// A mirror file could not be parsed.
    #[error("Malformed issue file '{path}': {reason}")]
    MalformedDocument { path: PathBuf, reason: String },

    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// No local issues matched the given arguments.
    #[error("No matching issues for arguments: {args}")]
    NoMatches { args: String },

    // === Remote Errors ===
    /// A required remote call failed.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error for one-off failures.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MirrorError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::AlreadyInitialized { .. }
                | Self::IssueNotFound { .. }
                | Self::Validation { .. }
                | Self::NoMatches { .. }
                | Self::LockTimeout { .. }
                | Self::RepoDetection { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: imi init"),
            Self::AlreadyInitialized { .. } => Some("Remove the existing config to reinitialize"),
            Self::LockTimeout { .. } => {
                Some("Another command may be running; remove the lock file if it is stale")
            }
            Self::MalformedDocument { .. } => Some("Fix or remove the file and retry"),
            Self::RepoDetection { .. } => Some("Pass --owner and --repo explicitly"),
            _ => None,
        }
    }

    /// Exit code reported by the binary for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 130,
            _ => 1,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type using `MirrorError`.
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MirrorError::IssueNotFound {
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Issue not found: 42");
    }

    #[test]
    fn validation_error() {
        let err = MirrorError::validation("title", "cannot be empty");
        assert_eq!(err.to_string(), "Validation failed: title: cannot be empty");
    }

    #[test]
    fn user_recoverable() {
        assert!(MirrorError::NotInitialized.is_user_recoverable());
        assert!(!MirrorError::Remote("boom".to_string()).is_user_recoverable());
    }

    #[test]
    fn suggestion() {
        assert_eq!(
            MirrorError::NotInitialized.suggestion(),
            Some("Run: imi init")
        );
        assert!(MirrorError::Cancelled.suggestion().is_none());
    }

    #[test]
    fn cancelled_exit_code() {
        assert_eq!(MirrorError::Cancelled.exit_code(), 130);
        assert_eq!(MirrorError::NotInitialized.exit_code(), 1);
    }
}
