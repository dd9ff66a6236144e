//! # a3s-classguard
//!
//! Class-validation gatekeeper for untrusted deserialization streams.
//!
//! ## Overview
//!
//! A deserialization reader resolving classes from an untrusted stream asks
//! `a3s-classguard`, once per class, whether that class may be instantiated.
//! This blocks "gadget" classes whose construction has dangerous side
//! effects, while letting operators discover and allow-list the classes
//! their applications legitimately exchange.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_classguard::{CallContext, ClassDescriptor, GuardConfig, ValidatorFactory};
//!
//! # fn example() -> a3s_classguard::Result<()> {
//! let config = GuardConfig::new().allow("com.example.Widget");
//! let factory = ValidatorFactory::from_config(&config)?;
//!
//! // One validator per deserialization session
//! let mut validator = factory.create(&CallContext::single("com.example.Server.read"))?;
//!
//! assert!(validator.apply(Some(ClassDescriptor::new("com.example.Widget"))).is_ok());
//! assert!(validator.apply(Some(ClassDescriptor::new("java.lang.Runtime"))).is_err());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Modes
//!
//! - **inactive** — validation disabled
//! - **discover** — unlisted classes are logged, never blocked
//! - **enforce** — unlisted classes abort the read (default)
//! - **reject** — every class aborts the read
//!
//! ## Architecture
//!
//! - **PolicyConfig** trait — mode resolution and allow-list membership
//! - **AllowListConfig** — built-in, immutable, pattern-based policy
//! - **ValidatorFactory** — one `ClassValidator` per session
//! - **ClassValidator** — per-session decision state machine
//! - **AuditSink** — structured record of discoveries and rejections

pub mod audit;
pub mod config;
pub mod error;
pub mod factory;
pub mod messages;
pub mod mode;
pub mod policy;
pub mod reader;
pub mod types;
pub mod validator;

// Re-export core types
pub use audit::{AuditEntry, AuditEventType, AuditLog, AuditSink, NullAuditSink};
pub use config::{AllowEntry, ContextRule, GuardConfig, MODE_ENV_VAR};
pub use error::{GuardError, RejectedClass, Result};
pub use factory::{SessionIds, ValidatorFactory};
pub use messages::MessageCatalog;
pub use mode::ValidationMode;
pub use policy::{AllowListConfig, ClassPattern, PolicyConfig, SkipSlot};
pub use reader::ValidatingReader;
pub use types::{CallContext, ClassDescriptor};
pub use validator::{ClassValidator, SessionScope};
