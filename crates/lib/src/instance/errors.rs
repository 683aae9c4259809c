//! Instance error types for the regsettings library.
//!
//! Covers configuration problems found while opening an instance.

use thiserror::Error;

/// Errors that can occur while configuring or opening an instance.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InstanceError {
    /// The configuration is unusable.
    #[error("Invalid instance configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with it
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("Config file I/O error")]
    ConfigIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid config JSON.
    #[error("Config file parse error")]
    ConfigParse {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

impl InstanceError {
    /// Check if this error is about configuration contents.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            InstanceError::InvalidConfig { .. } | InstanceError::ConfigParse { .. }
        )
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(self, InstanceError::ConfigIo { .. })
    }
}

impl From<InstanceError> for crate::Error {
    fn from(err: InstanceError) -> Self {
        crate::Error::Instance(err)
    }
}
