//! Error types for mapping settings paths onto native locations.

use thiserror::Error;

/// Errors raised while resolving a settings path to a [`Location`](super::Location).
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    /// The path does not have the `/a/b/` shape.
    #[error("Malformed settings path '{path}': {reason}")]
    MalformedPath {
        /// The offending path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// A relocatable schema was used without an instance path.
    #[error("Schema '{schema}' is relocatable and requires an instance path")]
    PathRequired {
        /// The schema id
        schema: String,
    },

    /// A native segment holds an escape sequence that does not decode.
    #[error("Invalid escape in segment '{segment}': {reason}")]
    InvalidEscape {
        /// The escaped segment
        segment: String,
        /// Why it could not be decoded
        reason: String,
    },
}

impl LocationError {
    /// Check if this error is about the shape of a path or segment.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LocationError::MalformedPath { .. } | LocationError::InvalidEscape { .. }
        )
    }

    /// Check if this error means a path was missing.
    pub fn is_path_required(&self) -> bool {
        matches!(self, LocationError::PathRequired { .. })
    }
}

impl From<LocationError> for crate::Error {
    fn from(err: LocationError) -> Self {
        crate::Error::Location(err)
    }
}
