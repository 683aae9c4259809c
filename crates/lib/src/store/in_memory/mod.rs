//! In-memory native store
//!
//! This module provides an in-memory implementation of the NativeStore
//! trait, suitable for testing, for tools that operate on a saved snapshot,
//! or for embedding where the real platform registry is not available.

mod persistence;

use std::{
    any::Any,
    collections::{BTreeMap, BTreeSet},
    path::Path,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Serialize};

use super::{BatchOp, ChangeSignal, NativeStore, NativeStoreError, NativeValue, NativeWatch, WatchId};
use crate::{Result, path::Location};

/// One location in the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Node {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    values: BTreeMap<String, NativeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, Node>,
}

impl Node {
    fn find(&self, components: &[String]) -> Option<&Node> {
        components
            .iter()
            .try_fold(self, |node, c| node.children.get(c))
    }

    fn find_mut(&mut self, components: &[String]) -> Option<&mut Node> {
        components
            .iter()
            .try_fold(self, |node, c| node.children.get_mut(c))
    }

    fn find_or_create(&mut self, components: &[String]) -> &mut Node {
        components.iter().fold(self, |node, c| {
            node.children.entry(c.clone()).or_default()
        })
    }
}

#[derive(Debug)]
struct WatchEntry {
    location: Location,
    signal: ChangeSignal,
}

#[derive(Debug, Default)]
struct WatchTable {
    next_id: u64,
    entries: BTreeMap<WatchId, WatchEntry>,
    limit: Option<usize>,
}

/// A native store held entirely in memory.
///
/// The tree sits behind a single `RwLock`, so every operation, batches
/// included, is atomic with respect to readers on any thread.
///
/// It can be persisted with [`save_to_file`](Self::save_to_file) and
/// restored with [`load_from_file`](Self::load_from_file) or, keeping
/// existing watches alive, [`reload_from_file`](Self::reload_from_file).
#[derive(Debug, Default)]
pub struct InMemory {
    root: RwLock<Node>,
    watches: RwLock<WatchTable>,
    read_only: RwLock<BTreeSet<Location>>,
}

impl InMemory {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of concurrent watches. `watch` fails past the cap.
    pub fn with_watch_limit(self, limit: usize) -> Self {
        self.write_watches().limit = Some(limit);
        self
    }

    /// Makes a location and everything below it refuse writes.
    pub fn deny_writes(&self, location: &Location) {
        self.read_only
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location.clone());
    }

    /// Lifts a previous [`deny_writes`](Self::deny_writes).
    pub fn allow_writes(&self, location: &Location) {
        self.read_only
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(location);
    }

    /// Number of live watches.
    pub fn watch_count(&self) -> usize {
        self.read_watches().entries.len()
    }

    /// Locations of the live watches, in creation order.
    pub fn watched_locations(&self) -> Vec<Location> {
        self.read_watches()
            .entries
            .values()
            .map(|w| w.location.clone())
            .collect()
    }

    /// Saves the whole tree to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path)
    }

    /// Loads a store from a JSON file. A missing file gives an empty store.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path)
    }

    /// Replaces the tree with the contents of a JSON file and raises every
    /// watch, as if every value had been rewritten by another process.
    pub fn reload_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let root = persistence::read_tree(path)?;
        *self.write_root() = root;
        self.notify_all();
        Ok(())
    }

    fn read_root(&self) -> RwLockReadGuard<'_, Node> {
        self.root.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_root(&self) -> RwLockWriteGuard<'_, Node> {
        self.root.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_watches(&self) -> RwLockReadGuard<'_, WatchTable> {
        self.watches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_watches(&self) -> RwLockWriteGuard<'_, WatchTable> {
        self.watches.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self, location: &Location) -> Result<()> {
        let read_only = self.read_only.read().unwrap_or_else(PoisonError::into_inner);
        if read_only.iter().any(|denied| denied.contains(location)) {
            return Err(NativeStoreError::PermissionDenied {
                location: location.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Raises every watch at or above `changed`. With `subtree`, watches
    /// below `changed` are raised too.
    fn notify(&self, changed: &Location, subtree: bool) {
        for watch in self.read_watches().entries.values() {
            if watch.location.contains(changed) || (subtree && changed.contains(&watch.location)) {
                watch.signal.raise();
            }
        }
    }

    fn notify_all(&self) {
        for watch in self.read_watches().entries.values() {
            watch.signal.raise();
        }
    }

    fn not_found(location: &Location) -> crate::Error {
        NativeStoreError::PathNotFound {
            location: location.to_string(),
        }
        .into()
    }
}

impl NativeStore for InMemory {
    fn create_path(&self, location: &Location) -> Result<()> {
        if self.read_root().find(location.components()).is_some() {
            return Ok(());
        }
        self.check_writable(location)?;
        self.write_root().find_or_create(location.components());
        self.notify(location, false);
        Ok(())
    }

    fn path_exists(&self, location: &Location) -> Result<bool> {
        Ok(self.read_root().find(location.components()).is_some())
    }

    fn get_value(&self, location: &Location, name: &str) -> Result<Option<NativeValue>> {
        Ok(self
            .read_root()
            .find(location.components())
            .and_then(|node| node.values.get(name).cloned()))
    }

    fn set_value(&self, location: &Location, name: &str, value: NativeValue) -> Result<()> {
        self.check_writable(location)?;
        {
            let mut root = self.write_root();
            let node = root
                .find_mut(location.components())
                .ok_or_else(|| Self::not_found(location))?;
            node.values.insert(name.to_string(), value);
        }
        self.notify(location, false);
        Ok(())
    }

    fn delete_value(&self, location: &Location, name: &str) -> Result<bool> {
        self.check_writable(location)?;
        let existed = {
            let mut root = self.write_root();
            root.find_mut(location.components())
                .and_then(|node| node.values.remove(name))
                .is_some()
        };
        if existed {
            self.notify(location, false);
        }
        Ok(existed)
    }

    fn list_values(&self, location: &Location) -> Result<BTreeMap<String, NativeValue>> {
        self.read_root()
            .find(location.components())
            .map(|node| node.values.clone())
            .ok_or_else(|| Self::not_found(location))
    }

    fn list_subkeys(&self, location: &Location) -> Result<Vec<String>> {
        self.read_root()
            .find(location.components())
            .map(|node| node.children.keys().cloned().collect())
            .ok_or_else(|| Self::not_found(location))
    }

    fn delete_tree(&self, location: &Location) -> Result<bool> {
        self.check_writable(location)?;
        let existed = {
            let mut root = self.write_root();
            match location.components().split_last() {
                Some((last, parent)) => root
                    .find_mut(parent)
                    .and_then(|node| node.children.remove(last))
                    .is_some(),
                None => {
                    *root = Node::default();
                    true
                }
            }
        };
        if existed {
            self.notify(location, true);
        }
        Ok(existed)
    }

    fn write_batch(&self, location: &Location, ops: &[BatchOp]) -> Result<()> {
        self.check_writable(location)?;
        {
            let mut root = self.write_root();
            let node = root.find_or_create(location.components());
            for op in ops {
                match op {
                    BatchOp::Set { name, value } => {
                        node.values.insert(name.clone(), value.clone());
                    }
                    BatchOp::Delete { name } => {
                        node.values.remove(name);
                    }
                }
            }
        }
        tracing::trace!(location = %location, ops = ops.len(), "applied batch");
        self.notify(location, false);
        Ok(())
    }

    fn watch(&self, location: &Location) -> Result<NativeWatch> {
        if !self.path_exists(location)? {
            return Err(Self::not_found(location));
        }
        let mut watches = self.write_watches();
        if let Some(limit) = watches.limit {
            if watches.entries.len() >= limit {
                return Err(NativeStoreError::WatchLimit { limit }.into());
            }
        }
        let id = WatchId(watches.next_id);
        watches.next_id += 1;
        let signal = ChangeSignal::new();
        watches.entries.insert(
            id,
            WatchEntry {
                location: location.clone(),
                signal: signal.clone(),
            },
        );
        Ok(NativeWatch { id, signal })
    }

    fn unwatch(&self, id: WatchId) -> Result<()> {
        self.write_watches().entries.remove(&id);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
