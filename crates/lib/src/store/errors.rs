//! Error types for native store operations.
//!
//! Any [`NativeStore`](super::NativeStore) implementation reports failures
//! through this enum so callers can classify them without knowing the
//! backing storage.

use thiserror::Error;

/// Errors raised by a native store.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NativeStoreError {
    /// The store refused to modify a location.
    #[error("Permission denied writing to '{location}'")]
    PermissionDenied {
        /// The location that could not be modified
        location: String,
    },

    /// The location does not exist.
    #[error("Path not found: {location}")]
    PathNotFound {
        /// The missing location
        location: String,
    },

    /// The store cannot hold another watch.
    #[error("Watch limit of {limit} reached")]
    WatchLimit {
        /// The configured limit
        limit: usize,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl NativeStoreError {
    /// Check if this error indicates a location was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NativeStoreError::PathNotFound { .. })
    }

    /// Check if this error indicates the store refused a write.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, NativeStoreError::PermissionDenied { .. })
    }

    /// Check if this error is about watch resources.
    pub fn is_watch_error(&self) -> bool {
        matches!(self, NativeStoreError::WatchLimit { .. })
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            NativeStoreError::FileIo { .. }
                | NativeStoreError::SerializationFailed { .. }
                | NativeStoreError::DeserializationFailed { .. }
        )
    }

    /// Get the location if this error is about a specific location.
    pub fn location(&self) -> Option<&str> {
        match self {
            NativeStoreError::PermissionDenied { location }
            | NativeStoreError::PathNotFound { location } => Some(location),
            _ => None,
        }
    }
}

impl From<NativeStoreError> for crate::Error {
    fn from(err: NativeStoreError) -> Self {
        crate::Error::Store(err)
    }
}
