//! Error types for settings sessions.

use thiserror::Error;

/// Errors raised by [`Settings`](super::Settings) operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// The key is not part of the session's schema.
    #[error("Key '{key}' is not in schema '{schema}'")]
    UnknownKey {
        /// The schema id
        schema: String,
        /// The requested key
        key: String,
    },

    /// A value does not have the key's type.
    #[error("Key '{key}' has type '{expected}', got '{actual}'")]
    TypeMismatch {
        /// The key
        key: String,
        /// The key's type signature
        expected: String,
        /// The signature of the offered or requested type
        actual: String,
    },
}

impl SettingsError {
    /// Check if this error indicates an unknown key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SettingsError::UnknownKey { .. })
    }

    /// Check if this error is a type mismatch.
    pub fn is_type_error(&self) -> bool {
        matches!(self, SettingsError::TypeMismatch { .. })
    }
}

impl From<SettingsError> for crate::Error {
    fn from(err: SettingsError) -> Self {
        crate::Error::Settings(err)
    }
}
