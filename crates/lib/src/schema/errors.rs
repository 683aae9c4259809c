//! Error types for schema loading and lookup.

use thiserror::Error;

use crate::variant::VariantError;

/// Errors raised while building, loading or looking up schemas.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema with this id is known.
    #[error("Schema not found: {id}")]
    NotFound {
        /// The requested schema id
        id: String,
    },

    /// A key's type signature could not be parsed.
    #[error("Invalid type for key '{key}' in schema '{schema}'")]
    InvalidType {
        /// The schema id
        schema: String,
        /// The key name
        key: String,
        /// The underlying signature error
        #[source]
        source: VariantError,
    },

    /// A key's default does not parse as its declared type.
    #[error("Invalid default for key '{key}' in schema '{schema}'")]
    InvalidDefault {
        /// The schema id
        schema: String,
        /// The key name
        key: String,
        /// The underlying parse error
        #[source]
        source: VariantError,
    },

    /// The same key name appears twice.
    #[error("Duplicate key '{key}' in schema '{schema}'")]
    DuplicateKey {
        /// The schema id
        schema: String,
        /// The repeated key name
        key: String,
    },

    /// Two keys map to the same native value name.
    #[error("Keys '{first}' and '{second}' in schema '{schema}' both map to '{native}'")]
    NameCollision {
        /// The schema id
        schema: String,
        /// The key already in the index
        first: String,
        /// The key that collided with it
        second: String,
        /// The shared native name
        native: String,
    },

    /// A fixed schema path is not of the `/a/b/` form.
    #[error("Invalid path '{path}' for schema '{schema}'")]
    InvalidPath {
        /// The schema id
        schema: String,
        /// The rejected path
        path: String,
    },

    /// Two schemas were registered under the same id.
    #[error("Schema '{id}' is already registered")]
    AlreadyRegistered {
        /// The repeated id
        id: String,
    },

    /// The schema file could not be read.
    #[error("Schema file I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Schemas could not be serialized.
    #[error("Schema serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// The schema file is not valid schema JSON.
    #[error("Schema file deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Check if this error indicates a schema was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::NotFound { .. })
    }

    /// Check if this error indicates an inconsistent schema definition.
    pub fn is_invalid_schema(&self) -> bool {
        matches!(
            self,
            SchemaError::InvalidType { .. }
                | SchemaError::InvalidDefault { .. }
                | SchemaError::DuplicateKey { .. }
                | SchemaError::NameCollision { .. }
                | SchemaError::InvalidPath { .. }
                | SchemaError::AlreadyRegistered { .. }
        )
    }

    /// Check if this error is related to reading schema files.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            SchemaError::FileIo { .. }
                | SchemaError::SerializationFailed { .. }
                | SchemaError::DeserializationFailed { .. }
        )
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
