//! Error types for a3s-classguard

use crate::mode::ValidationMode;
use thiserror::Error;

/// Errors that can occur while configuring or running the gatekeeper
#[derive(Debug, Error)]
pub enum GuardError {
    /// Broken deployment: unknown mode, invalid pattern, unusable config
    #[error("Configuration error: {0}")]
    Config(String),

    /// A class was refused under the active policy
    #[error(transparent)]
    Rejected(#[from] RejectedClass),

    /// Malformed config document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An audit sink failed to record an entry
    #[error("Audit error: {0}")]
    Audit(String),
}

/// Result type alias for gatekeeper operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// A candidate class disallowed under the active policy
///
/// Returned from [`ClassValidator::apply`](crate::ClassValidator::apply).
/// The caller must propagate it so the whole read unwinds; no partial
/// object graph may be kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RejectedClass {
    class_name: String,
    mode: ValidationMode,
    message: String,
}

impl RejectedClass {
    pub(crate) fn new(
        class_name: impl Into<String>,
        mode: ValidationMode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            mode,
            message: message.into(),
        }
    }

    /// Fully-qualified name of the refused class
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Mode of the validator that refused it (Enforce or Reject)
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Rendered, operator-facing message
    pub fn message(&self) -> &str {
        &self.message
    }
}
