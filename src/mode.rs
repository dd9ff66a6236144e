//! Validation modes
//!
//! A mode is resolved once per deserialization session and never changes
//! for the lifetime of the validator built from it.

use crate::error::GuardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy stance applied to every class resolved in a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValidationMode {
    /// Validation disabled, every class passes
    Inactive,
    /// Audit-only: classes missing from the allow-list are logged, never blocked
    Discover,
    /// Classes missing from the allow-list abort the read
    #[default]
    Enforce,
    /// Every class aborts the read; the allow-list is never consulted
    Reject,
}

impl ValidationMode {
    /// All modes, in escalating order of strictness
    pub const ALL: [ValidationMode; 4] = [
        ValidationMode::Inactive,
        ValidationMode::Discover,
        ValidationMode::Enforce,
        ValidationMode::Reject,
    ];

    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Discover => "discover",
            Self::Enforce => "enforce",
            Self::Reject => "reject",
        }
    }

    /// Whether this mode can abort a read
    pub fn blocks(self) -> bool {
        matches!(self, Self::Enforce | Self::Reject)
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inactive" | "off" | "disabled" => Ok(Self::Inactive),
            "discover" | "audit" => Ok(Self::Discover),
            "enforce" | "strict" => Ok(Self::Enforce),
            "reject" | "deny" => Ok(Self::Reject),
            other => Err(GuardError::Config(format!(
                "unknown validation mode '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ValidationMode {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValidationMode> for String {
    fn from(mode: ValidationMode) -> Self {
        mode.as_str().to_string()
    }
}
