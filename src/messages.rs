//! Operator-facing message catalog
//!
//! Messages are keyed by short codes so deployments can swap in
//! localized templates. Templates use a `{class}` placeholder.

use std::collections::HashMap;

/// Class is not on the allow-list (Discover log line)
pub const NOT_ALLOWED: &str = "NOT_ALLOWED";
/// Class refused under Enforce
pub const REJECTED: &str = "REJECTED";
/// Class refused under Reject
pub const DISABLED: &str = "DISABLED";
/// Class passed through a pending skip-once exemption
pub const SKIPPED: &str = "SKIPPED";

fn default_template(code: &str) -> &'static str {
    match code {
        NOT_ALLOWED => "not on allow-list: {class}",
        REJECTED => "deserialization rejected: {class}",
        DISABLED => "deserialization disabled for this context: {class}",
        SKIPPED => "allow-list check skipped once for: {class}",
        _ => "{class}",
    }
}

/// Code-to-template lookup with English defaults
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    overrides: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the template for a code
    pub fn with_template(mut self, code: &str, template: impl Into<String>) -> Self {
        self.overrides.insert(code.to_string(), template.into());
        self
    }

    /// Render a message for `class`
    ///
    /// The class name always appears in the result: templates lacking the
    /// placeholder get it appended.
    pub fn format(&self, code: &str, class: &str) -> String {
        let template = self
            .overrides
            .get(code)
            .map(String::as_str)
            .unwrap_or_else(|| default_template(code));

        if template.contains("{class}") {
            template.replace("{class}", class)
        } else {
            format!("{}: {}", template, class)
        }
    }
}
