//! In-process schema registry, optionally loaded from a JSON schema file.
//!
//! The file format is a list of schema definitions:
//!
//! ```json
//! {
//!   "schemas": [
//!     {
//!       "id": "org.example.editor",
//!       "path": "/org/example/editor/",
//!       "keys": [
//!         { "name": "tab-width", "type": "i", "default": "8", "summary": "Tab width" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::{collections::BTreeMap, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{Schema, SchemaDef, SchemaError, SchemaSource};

#[derive(Serialize, Deserialize)]
struct SchemaFile {
    schemas: Vec<SchemaDef>,
}

/// A fixed set of schemas keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema. Ids must be unique.
    pub fn insert(&mut self, schema: Schema) -> Result<Arc<Schema>, SchemaError> {
        if self.schemas.contains_key(schema.id()) {
            return Err(SchemaError::AlreadyRegistered {
                id: schema.id().to_string(),
            });
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.id().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_schema(mut self, schema: Schema) -> Result<Self, SchemaError> {
        self.insert(schema)?;
        Ok(self)
    }

    /// Parses a schema file held in memory.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(json)
            .map_err(|source| SchemaError::DeserializationFailed { source })?;
        let mut registry = Self::new();
        for def in file.schemas {
            registry.insert(Schema::from_def(def)?)?;
        }
        tracing::debug!(count = registry.schemas.len(), "loaded schemas");
        Ok(registry)
    }

    /// Reads and parses a schema file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::FileIo { source })?;
        Self::from_json(&json)
    }

    /// Serializes every schema in the file format.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        let file = SchemaFile {
            schemas: self.schemas.values().map(|s| s.to_def()).collect(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|source| SchemaError::SerializationFailed { source })
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// True if no schema is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaSource for SchemaRegistry {
    fn lookup(&self, id: &str) -> Option<Arc<Schema>> {
        self.schemas.get(id).cloned()
    }

    fn list(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }
}
