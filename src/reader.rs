//! Reader-side session helper
//!
//! Wraps a validator the way a deserialization reader uses it: every class
//! resolved from the stream goes through `apply`, and the first rejection
//! aborts the whole read with nothing partial returned.

use crate::error::{RejectedClass, Result};
use crate::factory::ValidatorFactory;
use crate::mode::ValidationMode;
use crate::types::{CallContext, ClassDescriptor};
use crate::validator::ClassValidator;

/// One deserialization session gated by a [`ClassValidator`]
#[derive(Debug)]
pub struct ValidatingReader {
    validator: ClassValidator,
    resolved: usize,
}

impl ValidatingReader {
    pub fn new(validator: ClassValidator) -> Self {
        Self {
            validator,
            resolved: 0,
        }
    }

    /// Start a session from `ctx`; fails if the mode cannot be resolved
    pub fn open(factory: &ValidatorFactory, ctx: &CallContext) -> Result<Self> {
        Ok(Self::new(factory.create(ctx)?))
    }

    pub fn mode(&self) -> ValidationMode {
        self.validator.mode()
    }

    pub fn validator(&self) -> &ClassValidator {
        &self.validator
    }

    /// Classes admitted so far in this session
    pub fn resolved(&self) -> usize {
        self.resolved
    }

    /// Gate a single class resolution
    pub fn resolve(
        &mut self,
        class: ClassDescriptor,
    ) -> std::result::Result<ClassDescriptor, RejectedClass> {
        self.validator.check(&class)?;
        self.resolved += 1;
        Ok(class)
    }

    /// Gate every class referenced by a stream, in order
    ///
    /// Returns all descriptors, or the first rejection. Classes after the
    /// rejected one are never looked at.
    pub fn read_all<I, C>(&mut self, classes: I) -> std::result::Result<Vec<ClassDescriptor>, RejectedClass>
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassDescriptor>,
    {
        let mut admitted = Vec::new();
        for class in classes {
            admitted.push(self.resolve(class.into())?);
        }
        Ok(admitted)
    }

    /// Start a logical re-pass; drops any pending skip-once exemption
    pub fn reset(&mut self) {
        self.validator.reset();
    }

    pub fn into_validator(self) -> ClassValidator {
        self.validator
    }
}
