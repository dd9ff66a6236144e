//! Policy configuration: mode resolution and allow-list membership
//!
//! [`PolicyConfig`] is the seam between validators and whatever decides
//! policy. [`AllowListConfig`] is the built-in implementation compiled from
//! a [`GuardConfig`]. It is immutable once built and safe to share across
//! any number of concurrent sessions.
//!
//! Pattern syntax for classes and call-context frames:
//! - `com.example.Widget` matches exactly
//! - `com.example.*` matches one name segment (`com.example.Widget`,
//!   `com.example.Outer$Inner`), not `com.example.sub.Thing`
//! - `com.example.**` matches any depth
//! - `*` alone matches everything

use crate::config::{AllowEntry, GuardConfig};
use crate::error::{GuardError, Result};
use crate::mode::ValidationMode;
use crate::types::{CallContext, ClassDescriptor};
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Decides the mode for a context and whether a class is allowed
pub trait PolicyConfig: Send + Sync {
    /// Mode for sessions started from `ctx`
    ///
    /// An error here is a broken deployment and must surface before any
    /// class is resolved.
    fn mode_for_context(&self, ctx: &CallContext) -> Result<ValidationMode>;

    /// Whether `class` is on the allow-list
    ///
    /// May arm `skip` with a companion class to exempt once. `enforce`
    /// tells whether a negative answer will abort the read.
    fn allows(&self, class: &ClassDescriptor, skip: &mut SkipSlot, enforce: bool) -> bool;
}

/// A single pending skip-once exemption
///
/// Holds zero or one class names. Owned by one validator, never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSlot(Option<String>);

impl SkipSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self(None)
    }

    /// Whether no exemption is pending
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// The class waiting to be exempted
    pub fn pending(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Arm the slot, replacing any previous exemption
    pub fn set(&mut self, class_name: impl Into<String>) {
        self.0 = Some(class_name.into());
    }

    /// Consume the exemption if it is for `class_name`
    pub fn take_if(&mut self, class_name: &str) -> bool {
        if self.0.as_deref() == Some(class_name) {
            self.0 = None;
            true
        } else {
            false
        }
    }

    /// Drop any pending exemption
    pub fn clear(&mut self) {
        self.0 = None;
    }
}

/// Compiled class/frame name pattern
#[derive(Debug, Clone)]
pub struct ClassPattern {
    source: String,
    regex: Regex,
}

impl ClassPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(GuardError::Config("empty class pattern".to_string()));
        }
        let regex = Regex::new(&Self::glob_to_regex(trimmed)).map_err(|e| {
            GuardError::Config(format!("invalid class pattern '{}': {}", trimmed, e))
        })?;
        Ok(Self {
            source: trimmed.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if a class or frame name matches this pattern
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Convert a dotted glob into an anchored regex
    fn glob_to_regex(pattern: &str) -> String {
        if pattern == "*" {
            return "^.*$".to_string();
        }

        let mut regex = String::from("^");
        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '*' => {
                    if i + 1 < chars.len() && chars[i + 1] == '*' {
                        regex.push_str(".*");
                        i += 2;
                    } else {
                        regex.push_str("[^.]*");
                        i += 1;
                    }
                }
                '.' | '$' | '+' | '?' | '^' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                    regex.push('\\');
                    regex.push(c);
                    i += 1;
                }
                _ => {
                    regex.push(c);
                    i += 1;
                }
            }
        }

        regex.push('$');
        regex
    }
}

#[derive(Debug)]
struct CompiledAllow {
    pattern: ClassPattern,
    skip_next: Option<String>,
}

#[derive(Debug)]
struct CompiledContext {
    pattern: ClassPattern,
    mode: ValidationMode,
}

/// Allow-list backed [`PolicyConfig`]
///
/// Positive lookups are optionally memoized by class name in an
/// append-only table shared by every session using this config. Only
/// allow-listed names are stored, so the table is bounded by the config
/// rather than by what a stream sends.
#[derive(Debug)]
pub struct AllowListConfig {
    default_mode: ValidationMode,
    contexts: Vec<CompiledContext>,
    allow: Vec<CompiledAllow>,
    /// class → index of the matching allow entry
    cache: Option<RwLock<HashMap<String, usize>>>,
    lookups: AtomicU64,
}

impl AllowListConfig {
    /// Compile a config document; invalid patterns are configuration errors
    pub fn new(config: &GuardConfig) -> Result<Self> {
        let contexts = config
            .contexts
            .iter()
            .map(|rule| {
                Ok(CompiledContext {
                    pattern: ClassPattern::new(&rule.pattern)?,
                    mode: rule.mode,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let allow = config
            .allow
            .iter()
            .map(|entry: &AllowEntry| {
                Ok(CompiledAllow {
                    pattern: ClassPattern::new(&entry.pattern)?,
                    skip_next: entry.skip_next.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            default_mode: config.default_mode,
            contexts,
            allow,
            cache: config.cache_lookups.then(|| RwLock::new(HashMap::new())),
            lookups: AtomicU64::new(0),
        })
    }

    pub fn default_mode(&self) -> ValidationMode {
        self.default_mode
    }

    /// Number of `allows` queries answered so far
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of memoized lookups (0 when caching is off)
    pub fn cached_entries(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.read().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    fn find_entry(&self, class_name: &str) -> Option<usize> {
        self.allow
            .iter()
            .position(|entry| entry.pattern.matches(class_name))
    }

    fn lookup(&self, class_name: &str) -> Option<usize> {
        let Some(cache) = &self.cache else {
            return self.find_entry(class_name);
        };

        if let Ok(cached) = cache.read() {
            if let Some(&hit) = cached.get(class_name) {
                return Some(hit);
            }
        }

        let found = self.find_entry(class_name)?;
        if let Ok(mut cached) = cache.write() {
            cached.entry(class_name.to_string()).or_insert(found);
        }
        Some(found)
    }
}

impl PolicyConfig for AllowListConfig {
    fn mode_for_context(&self, ctx: &CallContext) -> Result<ValidationMode> {
        for rule in &self.contexts {
            if ctx.frames().iter().any(|frame| rule.pattern.matches(frame)) {
                return Ok(rule.mode);
            }
        }
        Ok(self.default_mode)
    }

    fn allows(&self, class: &ClassDescriptor, skip: &mut SkipSlot, enforce: bool) -> bool {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let name = class.component_name();

        match self.lookup(name) {
            Some(index) => {
                if let Some(companion) = &self.allow[index].skip_next {
                    if skip.is_empty() {
                        skip.set(companion.clone());
                    }
                }
                true
            }
            None => {
                tracing::trace!(class = %name, enforce, "Class not matched by any allow entry");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(patterns: &[&str]) -> AllowListConfig {
        AllowListConfig::new(&GuardConfig::new().allow_all(patterns)).unwrap()
    }

    fn allowed(config: &AllowListConfig, name: &str) -> bool {
        config.allows(&ClassDescriptor::new(name), &mut SkipSlot::new(), true)
    }

    #[test]
    fn test_pattern_exact() {
        let p = ClassPattern::new("com.example.Widget").unwrap();
        assert!(p.matches("com.example.Widget"));
        assert!(!p.matches("com.example.Widget2"));
        assert!(!p.matches("comXexample.Widget"));
    }

    #[test]
    fn test_pattern_single_segment() {
        let p = ClassPattern::new("com.example.*").unwrap();
        assert!(p.matches("com.example.Widget"));
        assert!(p.matches("com.example.Outer$Inner"));
        assert!(!p.matches("com.example.sub.Thing"));
    }

    #[test]
    fn test_pattern_any_depth() {
        let p = ClassPattern::new("com.example.**").unwrap();
        assert!(p.matches("com.example.Widget"));
        assert!(p.matches("com.example.sub.Thing"));
        assert!(!p.matches("org.example.Widget"));
    }

    #[test]
    fn test_pattern_everything() {
        let p = ClassPattern::new("*").unwrap();
        assert!(p.matches("Widget"));
        assert!(p.matches("java.lang.Runtime"));
        let p = ClassPattern::new("**").unwrap();
        assert!(p.matches("java.lang.Runtime"));
    }

    #[test]
    fn test_pattern_inner_class_literal() {
        let p = ClassPattern::new("java.util.HashMap$Node").unwrap();
        assert!(p.matches("java.util.HashMap$Node"));
        assert!(!p.matches("java.util.HashMap"));
    }

    #[test]
    fn test_empty_pattern_is_config_error() {
        assert!(matches!(
            ClassPattern::new("  "),
            Err(GuardError::Config(_))
        ));
        let err = AllowListConfig::new(&GuardConfig::new().allow("")).unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
    }

    #[test]
    fn test_allows_membership() {
        let config = config(&["com.example.Widget", "com.example.model.**"]);
        assert!(allowed(&config, "com.example.Widget"));
        assert!(allowed(&config, "com.example.model.deep.Order"));
        assert!(!allowed(&config, "java.lang.Runtime"));
        assert_eq!(config.lookup_count(), 3);
    }

    #[test]
    fn test_allows_checks_array_component() {
        let config = config(&["com.example.Widget"]);
        assert!(allowed(&config, "[Lcom.example.Widget;"));
        assert!(!allowed(&config, "[Ljava.lang.Runtime;"));
    }

    #[test]
    fn test_skip_next_arms_empty_slot() {
        let config = AllowListConfig::new(&GuardConfig::new().allow_entry(
            AllowEntry::new("java.util.HashMap").with_skip_next("java.util.HashMap$Node"),
        ))
        .unwrap();

        let mut slot = SkipSlot::new();
        assert!(config.allows(&ClassDescriptor::new("java.util.HashMap"), &mut slot, true));
        assert_eq!(slot.pending(), Some("java.util.HashMap$Node"));
    }

    #[test]
    fn test_skip_next_keeps_existing_exemption() {
        let config = AllowListConfig::new(
            &GuardConfig::new()
                .allow_entry(AllowEntry::new("a.A").with_skip_next("a.A$1"))
                .allow_entry(AllowEntry::new("b.B").with_skip_next("b.B$1")),
        )
        .unwrap();

        let mut slot = SkipSlot::new();
        config.allows(&ClassDescriptor::new("a.A"), &mut slot, true);
        config.allows(&ClassDescriptor::new("b.B"), &mut slot, true);
        assert_eq!(slot.pending(), Some("a.A$1"));
    }

    #[test]
    fn test_rejected_class_does_not_arm_slot() {
        let config = AllowListConfig::new(
            &GuardConfig::new().allow_entry(AllowEntry::new("a.A").with_skip_next("a.A$1")),
        )
        .unwrap();
        let mut slot = SkipSlot::new();
        assert!(!config.allows(&ClassDescriptor::new("x.X"), &mut slot, true));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_cache_shared_across_enforce_flag() {
        let config = config(&["a.A"]);
        let mut slot = SkipSlot::new();
        config.allows(&ClassDescriptor::new("a.A"), &mut slot, true);
        config.allows(&ClassDescriptor::new("a.A"), &mut slot, true);
        assert_eq!(config.cached_entries(), 1);
        config.allows(&ClassDescriptor::new("a.A"), &mut slot, false);
        assert_eq!(config.cached_entries(), 1);
    }

    #[test]
    fn test_unlisted_names_are_not_cached() {
        let config = config(&["com.example.**"]);
        for i in 0..1_000 {
            assert!(!allowed(&config, &format!("org.evil.Gadget{}", i)));
        }
        assert_eq!(config.cached_entries(), 0);

        assert!(allowed(&config, "com.example.Widget"));
        assert!(!allowed(&config, "org.evil.Gadget0"));
        assert_eq!(config.cached_entries(), 1);
    }

    #[test]
    fn test_cache_disabled() {
        let config =
            AllowListConfig::new(&GuardConfig::new().allow("a.A").cache_lookups(false)).unwrap();
        assert!(allowed(&config, "a.A"));
        assert_eq!(config.cached_entries(), 0);
    }

    #[test]
    fn test_cached_hit_still_arms_slot() {
        let config = AllowListConfig::new(
            &GuardConfig::new().allow_entry(AllowEntry::new("a.A").with_skip_next("a.A$1")),
        )
        .unwrap();
        let mut first = SkipSlot::new();
        config.allows(&ClassDescriptor::new("a.A"), &mut first, true);
        let mut second = SkipSlot::new();
        config.allows(&ClassDescriptor::new("a.A"), &mut second, true);
        assert_eq!(second.pending(), Some("a.A$1"));
    }

    #[test]
    fn test_mode_for_context_first_match_wins() {
        let config = AllowListConfig::new(
            &GuardConfig::new()
                .default_mode(ValidationMode::Enforce)
                .context("com.example.jmx.**", ValidationMode::Reject)
                .context("com.example.**", ValidationMode::Discover),
        )
        .unwrap();

        let jmx = CallContext::new(["com.example.jmx.Connector.read", "app.Main.run"]);
        assert_eq!(config.mode_for_context(&jmx).unwrap(), ValidationMode::Reject);

        let cache = CallContext::single("com.example.cache.Loader.read");
        assert_eq!(config.mode_for_context(&cache).unwrap(), ValidationMode::Discover);

        let other = CallContext::single("org.other.Thing.read");
        assert_eq!(config.mode_for_context(&other).unwrap(), ValidationMode::Enforce);
        assert_eq!(
            config.mode_for_context(&CallContext::default()).unwrap(),
            ValidationMode::Enforce
        );
    }

    #[test]
    fn test_skip_slot_take_if() {
        let mut slot = SkipSlot::new();
        slot.set("a.A");
        assert!(!slot.take_if("b.B"));
        assert_eq!(slot.pending(), Some("a.A"));
        assert!(slot.take_if("a.A"));
        assert!(slot.is_empty());
        assert!(!slot.take_if("a.A"));
    }

    #[test]
    fn test_skip_slot_clear() {
        let mut slot = SkipSlot::new();
        slot.set("a.A");
        slot.clear();
        assert!(slot.is_empty());
    }
}
