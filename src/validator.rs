//! Per-session class validators
//!
//! One [`ClassValidator`] is bound to one deserialization session. The
//! reader calls [`ClassValidator::apply`] for every class it resolves and
//! must propagate an `Err` so the whole read unwinds.
//!
//! Discover and Enforce validators own a [`SkipSlot`]. The slot moves
//! between two states:
//!
//! - **Ready**: empty
//! - **Skip-pending**: holds class `X`, armed by the policy config
//!
//! The next `apply(X)` consumes the exemption without consulting the
//! allow-list. Other classes leave it pending. `reset()` always empties it.

use crate::audit::{AuditEntry, AuditEventType, AuditSink};
use crate::error::RejectedClass;
use crate::messages::{self, MessageCatalog};
use crate::mode::ValidationMode;
use crate::policy::{PolicyConfig, SkipSlot};
use crate::types::ClassDescriptor;
use std::fmt;
use std::sync::Arc;

/// Logging and correlation state for one session
#[derive(Clone)]
pub struct SessionScope {
    id: u64,
    audit: Arc<dyn AuditSink>,
    messages: Arc<MessageCatalog>,
}

impl SessionScope {
    /// Create a scope for session `id`
    pub fn new(id: u64, audit: Arc<dyn AuditSink>, messages: Arc<MessageCatalog>) -> Self {
        Self {
            id,
            audit,
            messages,
        }
    }

    /// Get the session id
    pub fn id(&self) -> u64 {
        self.id
    }

    fn record(&self, event_type: AuditEventType, mode: ValidationMode, class: &str, message: String) {
        let entry = AuditEntry::new(self.id, event_type, mode, class, message);
        if let Err(e) = self.audit.record(entry) {
            tracing::debug!(session = self.id, error = %e, "Audit record dropped");
        }
    }

    fn discovered(&self, class: &ClassDescriptor) {
        let message = self.messages.format(messages::NOT_ALLOWED, class.name());
        tracing::info!(
            session = self.id,
            class = %class,
            loader = class.defining_loader().unwrap_or("-"),
            "{}",
            message
        );
        self.record(
            AuditEventType::ClassDiscovered,
            ValidationMode::Discover,
            class.name(),
            message,
        );
    }

    fn skipped(&self, mode: ValidationMode, class: &ClassDescriptor) {
        let message = self.messages.format(messages::SKIPPED, class.name());
        tracing::debug!(session = self.id, %mode, class = %class, "{}", message);
        self.record(AuditEventType::SkipConsumed, mode, class.name(), message);
    }

    fn reject(&self, mode: ValidationMode, code: &str, class: &ClassDescriptor) -> RejectedClass {
        let message = self.messages.format(code, class.name());
        tracing::warn!(
            session = self.id,
            %mode,
            class = %class,
            loader = class.defining_loader().unwrap_or("-"),
            "{}",
            message
        );
        self.record(
            AuditEventType::ClassRejected,
            mode,
            class.name(),
            message.clone(),
        );
        RejectedClass::new(class.name(), mode, message)
    }
}

/// Validator bound to a single deserialization session
///
/// Built by [`ValidatorFactory::create`](crate::ValidatorFactory::create).
/// Never shared across sessions or threads.
pub enum ClassValidator {
    /// Validation disabled; every class passes
    Inactive,
    /// Audit-only; unlisted classes are logged and allowed
    Discover {
        config: Arc<dyn PolicyConfig>,
        skip: SkipSlot,
        scope: SessionScope,
    },
    /// Unlisted classes are rejected
    Enforce {
        config: Arc<dyn PolicyConfig>,
        skip: SkipSlot,
        scope: SessionScope,
    },
    /// Every class is rejected; arrays included
    Reject { scope: SessionScope },
}

impl ClassValidator {
    /// Mode this validator was built for
    pub fn mode(&self) -> ValidationMode {
        match self {
            Self::Inactive => ValidationMode::Inactive,
            Self::Discover { .. } => ValidationMode::Discover,
            Self::Enforce { .. } => ValidationMode::Enforce,
            Self::Reject { .. } => ValidationMode::Reject,
        }
    }

    /// Session id used to correlate log lines (none for Inactive)
    pub fn session_id(&self) -> Option<u64> {
        match self {
            Self::Inactive => None,
            Self::Discover { scope, .. } | Self::Enforce { scope, .. } | Self::Reject { scope } => {
                Some(scope.id())
            }
        }
    }

    /// Class currently holding a skip-once exemption
    pub fn pending_skip(&self) -> Option<&str> {
        match self {
            Self::Discover { skip, .. } | Self::Enforce { skip, .. } => skip.pending(),
            Self::Inactive | Self::Reject { .. } => None,
        }
    }

    /// Decide whether `candidate` may be instantiated
    ///
    /// Returns the class unchanged when allowed. `None` always passes.
    pub fn apply(
        &mut self,
        candidate: Option<ClassDescriptor>,
    ) -> Result<Option<ClassDescriptor>, RejectedClass> {
        if let Some(class) = &candidate {
            self.check(class)?;
        }
        Ok(candidate)
    }

    /// Decide whether `class` may be instantiated, without taking it
    pub fn check(&mut self, class: &ClassDescriptor) -> Result<(), RejectedClass> {
        match self {
            Self::Inactive => {
                tracing::trace!(class = %class, "Class validation inactive");
                Ok(())
            }
            Self::Reject { scope } => {
                Err(scope.reject(ValidationMode::Reject, messages::DISABLED, class))
            }
            Self::Discover {
                config,
                skip,
                scope,
            } => {
                if class.is_array() {
                    return Ok(());
                }
                if skip.take_if(class.name()) {
                    scope.skipped(ValidationMode::Discover, class);
                    return Ok(());
                }
                if !config.allows(class, skip, false) {
                    scope.discovered(class);
                }
                Ok(())
            }
            Self::Enforce {
                config,
                skip,
                scope,
            } => {
                if class.is_array() {
                    return Ok(());
                }
                if skip.take_if(class.name()) {
                    scope.skipped(ValidationMode::Enforce, class);
                    return Ok(());
                }
                if config.allows(class, skip, true) {
                    Ok(())
                } else {
                    Err(scope.reject(ValidationMode::Enforce, messages::REJECTED, class))
                }
            }
        }
    }

    /// Drop any pending skip-once exemption
    pub fn reset(&mut self) {
        match self {
            Self::Discover { skip, .. } | Self::Enforce { skip, .. } => skip.clear(),
            Self::Inactive | Self::Reject { .. } => {}
        }
    }
}

impl fmt::Debug for ClassValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassValidator")
            .field("mode", &self.mode())
            .field("session_id", &self.session_id())
            .field("pending_skip", &self.pending_skip())
            .finish()
    }
}
