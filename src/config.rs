//! Gatekeeper configuration document
//!
//! Loaded from camelCase JSON:
//!
//! ```json
//! {
//!   "defaultMode": "enforce",
//!   "contexts": [
//!     { "pattern": "com.example.jmx.**", "mode": "reject" },
//!     { "pattern": "com.example.cache.Loader.read", "mode": "discover" }
//!   ],
//!   "allow": [
//!     { "pattern": "com.example.Widget" },
//!     { "pattern": "java.util.HashMap", "skipNext": "java.util.HashMap$Node" },
//!     { "pattern": "com.example.model.**" }
//!   ]
//! }
//! ```
//!
//! The `A3S_CLASSGUARD_MODE` environment variable overrides `defaultMode`.

use crate::error::{GuardError, Result};
use crate::mode::ValidationMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable that overrides the default mode
pub const MODE_ENV_VAR: &str = "A3S_CLASSGUARD_MODE";

/// Allow-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowEntry {
    /// Class name pattern (`a.B`, `a.*`, `a.**`, `*`)
    pub pattern: String,

    /// Companion class exempted once after this entry allows a class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_next: Option<String>,
}

impl AllowEntry {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            skip_next: None,
        }
    }

    pub fn with_skip_next(mut self, class_name: impl Into<String>) -> Self {
        self.skip_next = Some(class_name.into());
        self
    }
}

/// Mode override for call contexts whose frames match `pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRule {
    pub pattern: String,
    pub mode: ValidationMode,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    /// Mode for contexts no rule matches
    #[serde(default)]
    pub default_mode: ValidationMode,

    /// Context rules, first match wins
    #[serde(default)]
    pub contexts: Vec<ContextRule>,

    /// Allowed classes
    #[serde(default)]
    pub allow: Vec<AllowEntry>,

    /// Share allow-list lookup results across sessions
    #[serde(default = "default_cache_lookups")]
    pub cache_lookups: bool,
}

fn default_cache_lookups() -> bool {
    true
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            default_mode: ValidationMode::Enforce,
            contexts: Vec::new(),
            allow: Vec::new(),
            cache_lookups: true,
        }
    }
}

impl GuardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            GuardError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            allow = config.allow.len(),
            contexts = config.contexts.len(),
            "Class guard config loaded"
        );
        Ok(config)
    }

    /// Apply `A3S_CLASSGUARD_MODE` if set
    pub fn with_env_overrides(self) -> Result<Self> {
        let value = std::env::var(MODE_ENV_VAR).ok();
        self.with_mode_override(value.as_deref())
    }

    /// Replace the default mode with a raw mode name, if one is given
    pub fn with_mode_override(mut self, raw: Option<&str>) -> Result<Self> {
        if let Some(raw) = raw {
            self.default_mode = raw.parse()?;
        }
        Ok(self)
    }

    pub fn default_mode(mut self, mode: ValidationMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Add an allow-list pattern
    pub fn allow(mut self, pattern: &str) -> Self {
        self.allow.push(AllowEntry::new(pattern));
        self
    }

    /// Add several allow-list patterns
    pub fn allow_all(mut self, patterns: &[&str]) -> Self {
        for pattern in patterns {
            self.allow.push(AllowEntry::new(*pattern));
        }
        self
    }

    pub fn allow_entry(mut self, entry: AllowEntry) -> Self {
        self.allow.push(entry);
        self
    }

    /// Add a context rule
    pub fn context(mut self, pattern: &str, mode: ValidationMode) -> Self {
        self.contexts.push(ContextRule {
            pattern: pattern.to_string(),
            mode,
        });
        self
    }

    pub fn cache_lookups(mut self, enabled: bool) -> Self {
        self.cache_lookups = enabled;
        self
    }
}
