//! Audit trail for validation decisions
//!
//! Every discovery and rejection produces one structured [`AuditEntry`],
//! handed to an [`AuditSink`]. Operators read Discover-mode entries to
//! build allow-lists before switching a context to Enforce.

use crate::error::{GuardError, Result};
use crate::mode::ValidationMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Kinds of auditable decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Discover mode saw a class missing from the allow-list
    ClassDiscovered,
    /// Enforce or Reject mode refused a class
    ClassRejected,
    /// A pending skip-once exemption was consumed
    SkipConsumed,
}

/// A single audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Session that made the decision
    pub session_id: u64,
    pub event_type: AuditEventType,
    pub mode: ValidationMode,
    pub class_name: String,
    /// Rendered operator message
    pub message: String,
}

impl AuditEntry {
    pub fn new(
        session_id: u64,
        event_type: AuditEventType,
        mode: ValidationMode,
        class_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id,
            event_type,
            mode,
            class_name: class_name.into(),
            message: message.into(),
        }
    }
}

/// Destination for audit records
///
/// Failures are reported back but validators discard them; recording
/// never changes a validation outcome.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _entry: AuditEntry) -> Result<()> {
        Ok(())
    }
}

/// Thread-safe in-memory audit log with bounded capacity
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    max_entries: usize,
}

impl AuditLog {
    /// Create a new audit log with the given capacity
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries,
        }
    }

    /// Entries matching `keep`, oldest first
    fn select(&self, keep: impl Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        let Ok(entries) = self.entries.read() else {
            tracing::error!("Audit log lock poisoned; returning no entries");
            return Vec::new();
        };
        entries.iter().filter(|e| keep(e)).cloned().collect()
    }

    /// Get all audit entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.select(|_| true)
    }

    /// Get entries for a specific session
    pub fn entries_for_session(&self, session_id: u64) -> Vec<AuditEntry> {
        self.select(|e| e.session_id == session_id)
    }

    /// Get entries of one decision kind
    pub fn entries_of_type(&self, event_type: AuditEventType) -> Vec<AuditEntry> {
        self.select(|e| e.event_type == event_type)
    }

    /// Distinct class names seen by Discover mode, sorted
    ///
    /// This is the candidate allow-list an operator reviews.
    pub fn discovered_classes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries_of_type(AuditEventType::ClassDiscovered)
            .into_iter()
            .map(|e| e.class_name)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Drop every recorded entry
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    /// Check if nothing has been recorded (or everything was cleared)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl AuditSink for AuditLog {
    fn record(&self, entry: AuditEntry) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| GuardError::Audit(format!("Audit log lock poisoned: {}", e)))?;
        if self.max_entries == 0 {
            return Ok(());
        }
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(session_id: u64, event_type: AuditEventType, class: &str) -> AuditEntry {
        AuditEntry::new(
            session_id,
            event_type,
            ValidationMode::Discover,
            class,
            format!("not on allow-list: {}", class),
        )
    }

    #[test]
    fn test_record_and_retrieve_entries() {
        let log = AuditLog::new(100);
        assert!(log.is_empty());

        log.record(make_entry(1, AuditEventType::ClassDiscovered, "a.A"))
            .unwrap();
        log.record(make_entry(1, AuditEventType::ClassRejected, "b.B"))
            .unwrap();

        assert_eq!(log.len(), 2);
        let entries = log.entries();
        assert_eq!(entries[0].event_type, AuditEventType::ClassDiscovered);
        assert_eq!(entries[1].class_name, "b.B");
    }

    #[test]
    fn test_filter_by_session() {
        let log = AuditLog::new(100);
        log.record(make_entry(1, AuditEventType::ClassDiscovered, "a.A"))
            .unwrap();
        log.record(make_entry(2, AuditEventType::ClassRejected, "b.B"))
            .unwrap();
        log.record(make_entry(1, AuditEventType::ClassDiscovered, "c.C"))
            .unwrap();

        assert_eq!(log.entries_for_session(1).len(), 2);
        let s2 = log.entries_for_session(2);
        assert_eq!(s2.len(), 1);
        assert_eq!(s2[0].event_type, AuditEventType::ClassRejected);
    }

    #[test]
    fn test_max_entries_cap() {
        let log = AuditLog::new(2);
        for class in ["a.A", "b.B", "c.C"] {
            log.record(make_entry(1, AuditEventType::ClassDiscovered, class))
                .unwrap();
        }
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].class_name, "b.B");
    }

    #[test]
    fn test_entries_of_type() {
        let log = AuditLog::new(100);
        log.record(make_entry(1, AuditEventType::ClassDiscovered, "a.A"))
            .unwrap();
        log.record(make_entry(2, AuditEventType::ClassRejected, "b.B"))
            .unwrap();
        let rejected = log.entries_of_type(AuditEventType::ClassRejected);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].class_name, "b.B");
        assert!(log.entries_of_type(AuditEventType::SkipConsumed).is_empty());
    }

    #[test]
    fn test_discovered_classes_dedup_sorted() {
        let log = AuditLog::new(100);
        for class in ["z.Z", "a.A", "z.Z"] {
            log.record(make_entry(1, AuditEventType::ClassDiscovered, class))
                .unwrap();
        }
        log.record(make_entry(1, AuditEventType::ClassRejected, "r.R"))
            .unwrap();
        assert_eq!(log.discovered_classes(), vec!["a.A", "z.Z"]);
    }

    #[test]
    fn test_clear() {
        let log = AuditLog::default();
        log.record(make_entry(1, AuditEventType::SkipConsumed, "a.A"))
            .unwrap();
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = make_entry(7, AuditEventType::ClassRejected, "java.lang.Runtime");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("class_rejected"));
        assert!(json.contains("\"sessionId\":7"));
        let parsed: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.class_name, "java.lang.Runtime");
        assert_eq!(parsed.mode, ValidationMode::Discover);
    }
}
