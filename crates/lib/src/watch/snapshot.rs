//! Recursive snapshots of a watched subtree.
//!
//! Native signals only say that something changed somewhere below a watched
//! location. A snapshot records every value in the subtree so that two of
//! them can be compared to find exactly which names changed, and where.

use std::collections::BTreeMap;

use crate::{
    Result,
    path::Location,
    store::{NativeStore, NativeValue},
};

/// Every value at or below a location, by location then value name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<Location, BTreeMap<String, NativeValue>>,
}

impl Snapshot {
    /// Reads the subtree rooted at `root`. A missing location reads as empty.
    pub fn capture(store: &dyn NativeStore, root: &Location) -> Result<Self> {
        let mut snapshot = Snapshot::default();
        let mut pending = vec![root.clone()];
        while let Some(location) = pending.pop() {
            let values = match store.list_values(&location) {
                Ok(values) => values,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let children = match store.list_subkeys(&location) {
                Ok(children) => children,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e),
            };
            pending.extend(children.into_iter().map(|child| location.join(child)));
            if !values.is_empty() {
                snapshot.values.insert(location, values);
            }
        }
        Ok(snapshot)
    }

    /// The part of this snapshot at or below `root`.
    pub fn restricted_to(&self, root: &Location) -> Snapshot {
        Snapshot {
            values: self
                .values
                .range(root.clone()..)
                .take_while(|(location, _)| root.contains(location))
                .map(|(location, values)| (location.clone(), values.clone()))
                .collect(),
        }
    }

    /// Names whose value differs between `self` and `newer`, including
    /// names added or removed, ordered by location then name.
    pub fn diff(&self, newer: &Snapshot) -> Vec<(Location, String)> {
        let empty = BTreeMap::new();
        let mut locations: Vec<&Location> =
            self.values.keys().chain(newer.values.keys()).collect();
        locations.sort();
        locations.dedup();

        let mut changes = Vec::new();
        for location in locations {
            let old = self.values.get(location).unwrap_or(&empty);
            let new = newer.values.get(location).unwrap_or(&empty);
            let mut names: Vec<&String> = old.keys().chain(new.keys()).collect();
            names.sort();
            names.dedup();
            for name in names {
                if old.get(name) != new.get(name) {
                    changes.push((location.clone(), name.clone()));
                }
            }
        }
        changes
    }

    /// Number of locations holding at least one value.
    pub fn location_count(&self) -> usize {
        self.values.len()
    }
}
