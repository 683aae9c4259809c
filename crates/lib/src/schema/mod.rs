//! Schemas: the typed key tables settings are read and written through.
//!
//! A [`Schema`] names a set of keys, each with a type and a default, and
//! either a fixed path or none (relocatable). Schemas are immutable once
//! built. Building one checks that every default parses as its key's type
//! and that no two keys map to the same native value name.
//!
//! Schemas are served to instances through the [`SchemaSource`] trait;
//! [`SchemaRegistry`] is the bundled implementation.

pub mod errors;
mod registry;

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

pub use errors::SchemaError;
pub use registry::SchemaRegistry;

use crate::{
    path,
    variant::{Variant, VariantType},
};

/// One key of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaKey {
    name: String,
    ty: VariantType,
    default: Variant,
    summary: Option<String>,
}

impl SchemaKey {
    /// The key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn value_type(&self) -> &VariantType {
        &self.ty
    }

    /// The value read when nothing is stored.
    pub fn default_value(&self) -> &Variant {
        &self.default
    }

    /// One-line description, if the schema provides one.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

/// Bidirectional map between key names and native value names.
///
/// Built once per schema; shared with the watch registry so that native
/// changes can be attributed to keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    by_native: BTreeMap<String, String>,
    by_key: BTreeMap<String, String>,
}

impl KeyIndex {
    /// Indexes `keys`, rejecting duplicates and native name collisions.
    pub fn build<'a>(
        schema: &str,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SchemaError> {
        let mut index = KeyIndex::default();
        for key in keys {
            if index.by_key.contains_key(key) {
                return Err(SchemaError::DuplicateKey {
                    schema: schema.to_string(),
                    key: key.to_string(),
                });
            }
            let native = path::value_name(key);
            if let Some(first) = index.by_native.get(&native) {
                return Err(SchemaError::NameCollision {
                    schema: schema.to_string(),
                    first: first.clone(),
                    second: key.to_string(),
                    native,
                });
            }
            index.by_native.insert(native.clone(), key.to_string());
            index.by_key.insert(key.to_string(), native);
        }
        Ok(index)
    }

    /// The key stored under a native value name.
    pub fn key_for(&self, native: &str) -> Option<&str> {
        self.by_native.get(native).map(String::as_str)
    }

    /// The native value name of a key.
    pub fn native_name(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True if no keys are indexed.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Serialized form of a key, as found in schema files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaKeyDef {
    /// Key name
    pub name: String,
    /// Type signature
    #[serde(rename = "type")]
    pub signature: String,
    /// Default value in canonical text form
    pub default: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Serialized form of a schema, as found in schema files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Schema id
    pub id: String,
    /// Fixed path; absent for relocatable schemas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Keys in declaration order
    #[serde(default)]
    pub keys: Vec<SchemaKeyDef>,
}

/// A validated, immutable schema.
#[derive(Debug, Clone)]
pub struct Schema {
    id: String,
    path: Option<String>,
    keys: Vec<SchemaKey>,
    positions: BTreeMap<String, usize>,
    index: Arc<KeyIndex>,
}

impl Schema {
    /// Starts building a schema with the given id.
    pub fn builder(id: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            def: SchemaDef {
                id: id.into(),
                path: None,
                keys: Vec::new(),
            },
        }
    }

    /// Validates a definition into a schema.
    pub fn from_def(def: SchemaDef) -> Result<Self, SchemaError> {
        if let Some(fixed) = &def.path {
            if path::split_path(fixed).is_err() {
                return Err(SchemaError::InvalidPath {
                    schema: def.id.clone(),
                    path: fixed.clone(),
                });
            }
        }

        let index = KeyIndex::build(&def.id, def.keys.iter().map(|k| k.name.as_str()))?;

        let mut keys = Vec::with_capacity(def.keys.len());
        let mut positions = BTreeMap::new();
        for key_def in def.keys {
            let ty = VariantType::parse(&key_def.signature).map_err(|source| {
                SchemaError::InvalidType {
                    schema: def.id.clone(),
                    key: key_def.name.clone(),
                    source,
                }
            })?;
            let default = Variant::parse(&key_def.default, &ty).map_err(|source| {
                SchemaError::InvalidDefault {
                    schema: def.id.clone(),
                    key: key_def.name.clone(),
                    source,
                }
            })?;
            positions.insert(key_def.name.clone(), keys.len());
            keys.push(SchemaKey {
                name: key_def.name,
                ty,
                default,
                summary: key_def.summary,
            });
        }

        Ok(Self {
            id: def.id,
            path: def.path,
            keys,
            positions,
            index: Arc::new(index),
        })
    }

    /// The schema id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The fixed path, or `None` for relocatable schemas.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// True if instances need an explicit path.
    pub fn is_relocatable(&self) -> bool {
        self.path.is_none()
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> &[SchemaKey] {
        &self.keys
    }

    /// Looks up a key by name.
    pub fn key(&self, name: &str) -> Option<&SchemaKey> {
        self.positions.get(name).map(|&i| &self.keys[i])
    }

    /// Looks up the key stored under a native value name.
    pub fn key_for_native(&self, native: &str) -> Option<&SchemaKey> {
        self.index.key_for(native).and_then(|name| self.key(name))
    }

    /// The native value name of a key.
    pub fn native_name(&self, key: &str) -> Option<&str> {
        self.index.native_name(key)
    }

    /// The shared key index.
    pub fn index(&self) -> &Arc<KeyIndex> {
        &self.index
    }

    /// Converts back to the serialized form.
    pub fn to_def(&self) -> SchemaDef {
        SchemaDef {
            id: self.id.clone(),
            path: self.path.clone(),
            keys: self
                .keys
                .iter()
                .map(|k| SchemaKeyDef {
                    name: k.name.clone(),
                    signature: k.ty.signature(),
                    default: k.default.to_string(),
                    summary: k.summary.clone(),
                })
                .collect(),
        }
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    def: SchemaDef,
}

impl SchemaBuilder {
    /// Gives the schema a fixed path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.def.path = Some(path.into());
        self
    }

    /// Adds a key with a type signature and a default in canonical text form.
    pub fn key(
        mut self,
        name: impl Into<String>,
        signature: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        self.def.keys.push(SchemaKeyDef {
            name: name.into(),
            signature: signature.into(),
            default: default.into(),
            summary: None,
        });
        self
    }

    /// Sets the summary of the most recently added key.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        if let Some(last) = self.def.keys.last_mut() {
            last.summary = Some(summary.into());
        }
        self
    }

    /// Validates and builds the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::from_def(self.def)
    }
}

/// Provider of schemas by id.
pub trait SchemaSource: Send + Sync {
    /// Looks up a schema.
    fn lookup(&self, id: &str) -> Option<Arc<Schema>>;

    /// Ids of every known schema, sorted.
    fn list(&self) -> Vec<String>;

    /// Looks up a schema, failing with [`SchemaError::NotFound`].
    fn get(&self, id: &str) -> Result<Arc<Schema>, SchemaError> {
        self.lookup(id).ok_or_else(|| SchemaError::NotFound { id: id.to_string() })
    }
}
