//! The native registry interface settings are mapped onto.
//!
//! A native store is a hierarchy of locations, each holding named values of
//! a few primitive kinds ([`NativeValue`]). Stores report changes through
//! watches: a watch on a location raises its [`ChangeSignal`] whenever a value
//! at or below that location changes. Signals carry no detail; the watch
//! registry re-reads the subtree to find out what changed.
//!
//! Stores are `Send + Sync` because out-of-band editors may live on other
//! threads, while the settings core that consumes them is single-threaded.

pub mod errors;
pub mod in_memory;

use std::{
    any::Any,
    collections::BTreeMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use serde::{Deserialize, Serialize};

pub use errors::NativeStoreError;
pub use in_memory::InMemory;

use crate::{Result, path::Location};

/// A value as held by the native store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NativeValue {
    /// 32-bit integer
    Dword(u32),
    /// 64-bit integer
    Qword(u64),
    /// Text
    String(String),
    /// Opaque bytes
    Binary(Vec<u8>),
}

impl NativeValue {
    /// The kind of this value.
    pub fn kind(&self) -> NativeKind {
        match self {
            NativeValue::Dword(_) => NativeKind::Dword,
            NativeValue::Qword(_) => NativeKind::Qword,
            NativeValue::String(_) => NativeKind::String,
            NativeValue::Binary(_) => NativeKind::Binary,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Dword(n) => write!(f, "dword:{n}"),
            NativeValue::Qword(n) => write!(f, "qword:{n}"),
            NativeValue::String(s) => write!(f, "string:{s:?}"),
            NativeValue::Binary(b) => write!(f, "binary:{}", hex::encode(b)),
        }
    }
}

/// Kinds of [`NativeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    /// 32-bit integer
    Dword,
    /// 64-bit integer
    Qword,
    /// Text
    String,
    /// Opaque bytes
    Binary,
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NativeKind::Dword => "dword",
            NativeKind::Qword => "qword",
            NativeKind::String => "string",
            NativeKind::Binary => "binary",
        })
    }
}

/// Flag raised by a store when a watched subtree changes.
///
/// Raising an already raised signal is a no-op, so any number of changes
/// between two checks collapse into one.
#[derive(Debug, Clone, Default)]
pub struct ChangeSignal(Arc<AtomicBool>);

impl ChangeSignal {
    /// Creates a lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lowers the signal, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Returns whether the signal is raised without lowering it.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Identifier of a native watch, unique per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

/// A live native watch.
#[derive(Debug, Clone)]
pub struct NativeWatch {
    /// Handle for [`NativeStore::unwatch`]
    pub id: WatchId,
    /// Raised on every change at or below the watched location
    pub signal: ChangeSignal,
}

/// One step of an atomic batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Store a value
    Set {
        /// Native value name
        name: String,
        /// The value
        value: NativeValue,
    },
    /// Remove a value if present
    Delete {
        /// Native value name
        name: String,
    },
}

/// Hierarchical key-value storage with change watches.
///
/// All implementations must be `Send` and `Sync` and implement `Any` so
/// that callers holding a trait object can downcast to the concrete store.
pub trait NativeStore: Send + Sync + Any {
    /// Creates a location and any missing ancestors.
    fn create_path(&self, location: &Location) -> Result<()>;

    /// Returns whether a location exists.
    fn path_exists(&self, location: &Location) -> Result<bool>;

    /// Reads a value. A missing location or value reads as `None`.
    fn get_value(&self, location: &Location, name: &str) -> Result<Option<NativeValue>>;

    /// Writes a value. The location must exist.
    fn set_value(&self, location: &Location, name: &str, value: NativeValue) -> Result<()>;

    /// Removes a value, returning whether it existed.
    fn delete_value(&self, location: &Location, name: &str) -> Result<bool>;

    /// Lists every value directly at a location.
    fn list_values(&self, location: &Location) -> Result<BTreeMap<String, NativeValue>>;

    /// Lists the names of the direct children of a location.
    fn list_subkeys(&self, location: &Location) -> Result<Vec<String>>;

    /// Removes a location with everything below it, returning whether it existed.
    fn delete_tree(&self, location: &Location) -> Result<bool>;

    /// Applies every operation at one location, all or nothing.
    ///
    /// Creates the location if needed. Readers never see part of a batch.
    fn write_batch(&self, location: &Location, ops: &[BatchOp]) -> Result<()>;

    /// Starts watching a location and everything below it.
    fn watch(&self, location: &Location) -> Result<NativeWatch>;

    /// Stops a watch. Unknown ids are ignored.
    fn unwatch(&self, id: WatchId) -> Result<()>;

    /// Returns a reference to the store as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
