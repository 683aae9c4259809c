//! Instance configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_BASE_PATH, DEFAULT_MAX_WATCHES},
    instance::InstanceError,
};

/// Settings that shape how an [`Instance`](crate::Instance) maps and watches.
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```json
/// { "max_watches": 8, "notify_self": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Native root all settings paths are placed under.
    pub base_path: String,

    /// Ceiling on the number of native watches held at once.
    pub max_watches: usize,

    /// Whether a session receives change events for its own writes.
    pub notify_self: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            max_watches: DEFAULT_MAX_WATCHES,
            notify_self: true,
        }
    }
}

impl InstanceConfig {
    /// Reads a JSON config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let json =
            std::fs::read_to_string(path).map_err(|source| InstanceError::ConfigIo { source })?;
        serde_json::from_str(&json).map_err(|source| InstanceError::ConfigParse { source })
    }

    /// Checks that the config can be used to open an instance.
    pub fn validate(&self) -> Result<(), InstanceError> {
        if self.base_path.split(['/', '\\']).all(str::is_empty) {
            return Err(InstanceError::InvalidConfig {
                reason: "base_path must name at least one component".to_string(),
            });
        }
        Ok(())
    }

    /// Sets the base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Sets the watch ceiling.
    pub fn with_max_watches(mut self, max_watches: usize) -> Self {
        self.max_watches = max_watches;
        self
    }

    /// Enables or disables self-notification.
    pub fn with_notify_self(mut self, notify_self: bool) -> Self {
        self.notify_self = notify_self;
        self
    }
}
