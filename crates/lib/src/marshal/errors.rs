//! Error types for decoding native values.

use thiserror::Error;

use crate::{store::NativeKind, variant::VariantError};

/// Reasons a stored native value could not be read as its key's type.
///
/// Decode errors never reach settings readers: the session falls back to the
/// key's default and logs the error instead.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The stored value has a different native kind than the type maps to.
    #[error("Expected a {expected} value, found {actual}")]
    WrongNativeType {
        /// The kind the key's type is stored as
        expected: NativeKind,
        /// The kind actually stored
        actual: NativeKind,
    },

    /// The stored text is not a valid value of the key's type.
    #[error("Malformed stored value")]
    Malformed {
        /// The underlying parse error
        #[source]
        source: VariantError,
    },

    /// The stored number does not fit the key's type.
    #[error("Stored value {value} is out of range for '{signature}'")]
    OutOfRange {
        /// The stored number
        value: u64,
        /// The key's type signature
        signature: String,
    },
}

impl DecodeError {
    /// Check if the stored value had the wrong native kind.
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, DecodeError::WrongNativeType { .. })
    }

    /// Check if the stored value had the right kind but unusable content.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            DecodeError::Malformed { .. } | DecodeError::OutOfRange { .. }
        )
    }
}

impl From<DecodeError> for crate::Error {
    fn from(err: DecodeError) -> Self {
        crate::Error::Decode(err)
    }
}
