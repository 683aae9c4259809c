//! Persistence operations for the in-memory store
//!
//! The tree is saved as versioned JSON. Values keep their native kind so a
//! saved store reloads exactly.

use std::{io::ErrorKind, path::Path, sync::RwLock};

use serde::{Deserialize, Deserializer, Serialize};

use super::{InMemory, Node};
use crate::{Error, Result, store::NativeStoreError};

/// The current file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize, Deserialize)]
struct SerializableStore {
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    root: Node,
}

pub(super) fn save_to_file<P: AsRef<Path>>(store: &InMemory, path: P) -> Result<()> {
    let serializable = SerializableStore {
        version: PERSISTENCE_VERSION,
        root: store.read_root().clone(),
    };
    let json = serde_json::to_string_pretty(&serializable)
        .map_err(|e| -> Error { NativeStoreError::SerializationFailed { source: e }.into() })?;
    std::fs::write(path, json)
        .map_err(|e| -> Error { NativeStoreError::FileIo { source: e }.into() })
}

/// Reads a saved tree. A missing file reads as an empty tree.
pub(super) fn read_tree<P: AsRef<Path>>(path: P) -> Result<Node> {
    match std::fs::read_to_string(path) {
        Ok(json) => {
            let serializable: SerializableStore =
                serde_json::from_str(&json).map_err(|e| -> Error {
                    NativeStoreError::DeserializationFailed { source: e }.into()
                })?;
            Ok(serializable.root)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Node::default()),
        Err(e) => Err(NativeStoreError::FileIo { source: e }.into()),
    }
}

pub(super) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<InMemory> {
    Ok(InMemory {
        root: RwLock::new(read_tree(path)?),
        ..InMemory::default()
    })
}
