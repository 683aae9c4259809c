//! Error types for the variant model.
//!
//! Covers type signature parsing, the canonical text format, and values that
//! do not match the type they are used as.

use thiserror::Error;

/// Errors raised while parsing type signatures or variant text.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VariantError {
    /// A type signature could not be parsed.
    #[error("Invalid type signature '{signature}': {reason}")]
    InvalidSignature {
        /// The offending signature
        signature: String,
        /// Why it was rejected
        reason: String,
    },

    /// A well-formed signature names a type the backend cannot store.
    #[error("Unsupported type signature '{signature}': {reason}")]
    UnsupportedType {
        /// The offending signature
        signature: String,
        /// Why it is unsupported
        reason: String,
    },

    /// Text could not be parsed as a value of the expected type.
    #[error("Cannot parse '{text}' as '{signature}' at offset {offset}: {reason}")]
    Parse {
        /// The full input text
        text: String,
        /// The expected type signature
        signature: String,
        /// Byte offset where parsing stopped
        offset: usize,
        /// Description of the failure
        reason: String,
    },

    /// A value does not have the type it is being used as.
    #[error("Type mismatch: expected '{expected}', found '{actual}'")]
    TypeMismatch {
        /// Expected type signature
        expected: String,
        /// Actual type signature
        actual: String,
    },
}

impl VariantError {
    /// Check if this error came from parsing text or a signature.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            VariantError::Parse { .. } | VariantError::InvalidSignature { .. }
        )
    }

    /// Check if this error is a type mismatch.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            VariantError::TypeMismatch { .. } | VariantError::UnsupportedType { .. }
        )
    }
}

impl From<VariantError> for crate::Error {
    fn from(err: VariantError) -> Self {
        crate::Error::Variant(err)
    }
}
