//! Validator factory
//!
//! The reader hook calls [`ValidatorFactory::create`] once per
//! deserialization session. The factory resolves the session's mode from
//! the current policy config and snapshots that config into the validator,
//! so replacing the config later only affects sessions created afterwards.

use crate::audit::{AuditLog, AuditSink};
use crate::config::GuardConfig;
use crate::error::{GuardError, Result};
use crate::messages::MessageCatalog;
use crate::mode::ValidationMode;
use crate::policy::{AllowListConfig, PolicyConfig, SkipSlot};
use crate::types::CallContext;
use crate::validator::{ClassValidator, SessionScope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Monotonic session id source, scoped to one factory
#[derive(Debug)]
pub struct SessionIds {
    next: AtomicU64,
}

impl SessionIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SessionIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one [`ClassValidator`] per deserialization session
///
/// Shared across threads; `create` only takes a short read lock to clone
/// the current config `Arc`.
pub struct ValidatorFactory {
    config: RwLock<Arc<dyn PolicyConfig>>,
    audit: Arc<dyn AuditSink>,
    messages: Arc<MessageCatalog>,
    sessions: SessionIds,
}

impl ValidatorFactory {
    /// Create a factory over a policy config, auditing into an in-memory log
    pub fn new(config: Arc<dyn PolicyConfig>) -> Self {
        Self {
            config: RwLock::new(config),
            audit: Arc::new(AuditLog::default()),
            messages: Arc::new(MessageCatalog::new()),
            sessions: SessionIds::new(),
        }
    }

    /// Compile a config document and build a factory over it
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(AllowListConfig::new(config)?)))
    }

    /// Use a custom audit sink
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Use a custom message catalog
    pub fn with_messages(mut self, messages: MessageCatalog) -> Self {
        self.messages = Arc::new(messages);
        self
    }

    /// Publish a new policy config
    ///
    /// Validators already handed out keep the config they were built with.
    pub fn replace_config(&self, config: Arc<dyn PolicyConfig>) -> Result<()> {
        let mut current = self
            .config
            .write()
            .map_err(|e| GuardError::Config(format!("Policy config lock poisoned: {}", e)))?;
        *current = config;
        tracing::info!("Class guard policy config replaced");
        Ok(())
    }

    /// Current policy config
    pub fn config(&self) -> Result<Arc<dyn PolicyConfig>> {
        let current = self
            .config
            .read()
            .map_err(|e| GuardError::Config(format!("Policy config lock poisoned: {}", e)))?;
        Ok(Arc::clone(&current))
    }

    /// Build the validator for a session started from `ctx`
    ///
    /// Fails immediately when the mode cannot be resolved; that is a
    /// deployment defect, not a per-class decision.
    pub fn create(&self, ctx: &CallContext) -> Result<ClassValidator> {
        let config = self.config()?;
        let mode = config.mode_for_context(ctx)?;

        let validator = match mode {
            ValidationMode::Inactive => ClassValidator::Inactive,
            ValidationMode::Discover => ClassValidator::Discover {
                config,
                skip: SkipSlot::new(),
                scope: self.scope(),
            },
            ValidationMode::Enforce => ClassValidator::Enforce {
                config,
                skip: SkipSlot::new(),
                scope: self.scope(),
            },
            ValidationMode::Reject => ClassValidator::Reject {
                scope: self.scope(),
            },
        };

        tracing::debug!(
            %mode,
            session = validator.session_id().unwrap_or(0),
            frames = ctx.frames().len(),
            "Class validator created"
        );
        Ok(validator)
    }

    fn scope(&self) -> SessionScope {
        SessionScope::new(
            self.sessions.next_id(),
            Arc::clone(&self.audit),
            Arc::clone(&self.messages),
        )
    }
}

impl std::fmt::Debug for ValidatorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorFactory")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
