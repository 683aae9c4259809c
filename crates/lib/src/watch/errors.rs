//! Error types for the watch registry.

use thiserror::Error;

/// Errors raised while managing change subscriptions.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchError {
    /// No watch slot could be found or freed for a location.
    #[error("Cannot watch '{location}': all {max_watches} watches are in use")]
    CeilingExceeded {
        /// The location that could not be watched
        location: String,
        /// The configured ceiling
        max_watches: usize,
    },

    /// The subscription token is not registered.
    #[error("Unknown subscription {token}")]
    UnknownSubscription {
        /// The raw token value
        token: u64,
    },
}

impl WatchError {
    /// Check if this error means the watch ceiling was hit.
    pub fn is_ceiling_exceeded(&self) -> bool {
        matches!(self, WatchError::CeilingExceeded { .. })
    }

    /// Check if this error refers to a missing subscription.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WatchError::UnknownSubscription { .. })
    }
}

impl From<WatchError> for crate::Error {
    fn from(err: WatchError) -> Self {
        crate::Error::Watch(err)
    }
}
