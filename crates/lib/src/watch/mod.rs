//! Deduplicating manager of native change watches.
//!
//! The registry owns every native watch an instance holds. Subscriptions for
//! the same location share one watch, and the number of watches never
//! exceeds the configured ceiling: once it is reached, new subscriptions
//! attach to a watched ancestor, or several watches are folded into a single
//! watch on their deepest common ancestor.
//!
//! Each watch keeps a recursive [`Snapshot`] of its subtree. [`poll`]
//! re-reads the subtrees of the watches whose signal fired and turns the
//! differences into one [`ChangeEvent`] per subscription and changed key.
//!
//! [`poll`]: WatchRegistry::poll

pub mod errors;
pub mod snapshot;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use tracing::{debug, trace, warn};

pub use errors::WatchError;
pub use snapshot::Snapshot;

use crate::{
    Result,
    path::Location,
    schema::KeyIndex,
    store::{NativeStore, NativeWatch},
};

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// The raw token value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A change to one key, as seen by one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The subscription the event is for
    pub token: SubscriptionToken,
    /// The changed key
    pub key: String,
    /// Where the change happened
    pub location: Location,
    descendant: bool,
}

impl ChangeEvent {
    /// True if the change happened below the subscribed location rather
    /// than at it.
    pub fn is_descendant(&self) -> bool {
        self.descendant
    }
}

#[derive(Debug)]
struct WatchEntry {
    native: NativeWatch,
    subscribers: BTreeSet<SubscriptionToken>,
    snapshot: Snapshot,
}

#[derive(Debug)]
struct Subscription {
    location: Location,
    index: Arc<KeyIndex>,
    watch: Location,
}

/// Reference-counted pool of native watches.
pub struct WatchRegistry {
    store: Arc<dyn NativeStore>,
    max_watches: usize,
    watches: BTreeMap<Location, WatchEntry>,
    subscriptions: BTreeMap<SubscriptionToken, Subscription>,
    next_token: u64,
    outbox: Vec<ChangeEvent>,
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("max_watches", &self.max_watches)
            .field("watches", &self.watches.keys().collect::<Vec<_>>())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl WatchRegistry {
    /// Creates an empty registry over `store`.
    pub fn new(store: Arc<dyn NativeStore>, max_watches: usize) -> Self {
        Self {
            store,
            max_watches,
            watches: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            next_token: 0,
            outbox: Vec::new(),
        }
    }

    /// Number of native watches currently held.
    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Locations currently watched, sorted.
    pub fn watched_locations(&self) -> Vec<Location> {
        self.watches.keys().cloned().collect()
    }

    /// The location of the watch serving a subscription.
    pub fn watched_location_of(&self, token: SubscriptionToken) -> Option<&Location> {
        self.subscriptions.get(&token).map(|s| &s.watch)
    }

    /// Subscribes to changes at `location` and below, for the keys in `index`.
    ///
    /// The location is created if it does not exist yet.
    pub fn subscribe(
        &mut self,
        location: &Location,
        index: Arc<KeyIndex>,
    ) -> Result<SubscriptionToken> {
        let watch = self.find_or_create_watch(location)?;
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;

        if let Some(entry) = self.watches.get_mut(&watch) {
            entry.subscribers.insert(token);
        }
        debug!(%token, %location, %watch, "subscribed");
        self.subscriptions.insert(
            token,
            Subscription {
                location: location.clone(),
                index,
                watch,
            },
        );
        Ok(token)
    }

    /// Drops a subscription, releasing its watch when nobody else uses it.
    ///
    /// Undelivered events for the subscription are discarded.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> Result<()> {
        let subscription = self
            .subscriptions
            .remove(&token)
            .ok_or(WatchError::UnknownSubscription { token: token.0 })?;
        self.outbox.retain(|event| event.token != token);

        let now_unused = match self.watches.get_mut(&subscription.watch) {
            Some(entry) => {
                entry.subscribers.remove(&token);
                entry.subscribers.is_empty()
            }
            None => false,
        };
        if now_unused {
            if let Some(entry) = self.watches.remove(&subscription.watch) {
                self.store.unwatch(entry.native.id)?;
                debug!(location = %subscription.watch, "released watch");
            }
        }
        debug!(%token, "unsubscribed");
        Ok(())
    }

    /// Collects the events of every watch whose signal fired since the
    /// last poll, in detection order.
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let mut events = std::mem::take(&mut self.outbox);
        let fired: Vec<Location> = self
            .watches
            .iter()
            .filter(|(_, entry)| entry.native.signal.take())
            .map(|(location, _)| location.clone())
            .collect();

        for location in fired {
            let snapshot = match Snapshot::capture(self.store.as_ref(), &location) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(%location, error = %e, "failed to re-read watched location");
                    continue;
                }
            };
            let Some(entry) = self.watches.get_mut(&location) else {
                continue;
            };
            let old = std::mem::replace(&mut entry.snapshot, snapshot);
            let changes = old.diff(&entry.snapshot);
            trace!(%location, changes = changes.len(), "diffed watched location");
            let subscribers: Vec<SubscriptionToken> = entry.subscribers.iter().copied().collect();
            self.emit(&subscribers, &changes, &mut events);
        }
        events
    }

    fn emit(
        &self,
        subscribers: &[SubscriptionToken],
        changes: &[(Location, String)],
        events: &mut Vec<ChangeEvent>,
    ) {
        for (location, name) in changes {
            for token in subscribers {
                let Some(sub) = self.subscriptions.get(token) else {
                    continue;
                };
                if !sub.location.contains(location) {
                    continue;
                }
                let Some(key) = sub.index.key_for(name) else {
                    continue;
                };
                events.push(ChangeEvent {
                    token: *token,
                    key: key.to_string(),
                    location: location.clone(),
                    descendant: &sub.location != location,
                });
            }
        }
    }

    /// Picks the watch a new subscription at `location` attaches to,
    /// creating or folding watches as needed.
    fn find_or_create_watch(&mut self, location: &Location) -> Result<Location> {
        if self.watches.contains_key(location) {
            return Ok(location.clone());
        }

        self.store.create_path(location)?;

        if self.watches.len() < self.max_watches {
            match self.add_watch(location) {
                Ok(()) => return Ok(location.clone()),
                Err(e) if e.is_watch_error() => {
                    debug!(%location, "native watch limit reached, sharing a watch")
                }
                Err(e) => return Err(e),
            }
        }

        let mut ancestor = location.parent();
        while let Some(candidate) = ancestor {
            if self.watches.contains_key(&candidate) {
                debug!(%location, watch = %candidate, "attached to watched ancestor");
                return Ok(candidate);
            }
            ancestor = candidate.parent();
        }

        self.fold_into_common_ancestor(location)
    }

    fn add_watch(&mut self, location: &Location) -> Result<()> {
        let (native, snapshot) = self.open_watch(location)?;
        debug!(%location, watches = self.watches.len() + 1, "created watch");
        self.watches.insert(
            location.clone(),
            WatchEntry {
                native,
                subscribers: BTreeSet::new(),
                snapshot,
            },
        );
        Ok(())
    }

    /// Replaces every watch below the deepest ancestor `location` shares
    /// with an existing watch by one watch on that ancestor.
    ///
    /// The folded watches are released before the ancestor is watched, so a
    /// native watch limit equal to the ceiling never blocks the fold. If the
    /// ancestor cannot be watched, the folded watches are restored.
    fn fold_into_common_ancestor(&mut self, location: &Location) -> Result<Location> {
        let Some(target) = self
            .watches
            .keys()
            .map(|watched| watched.common_ancestor(location))
            .max_by_key(Location::depth)
        else {
            return Err(WatchError::CeilingExceeded {
                location: location.to_string(),
                max_watches: self.max_watches,
            }
            .into());
        };

        let folded: Vec<Location> = self
            .watches
            .keys()
            .filter(|watched| target.contains(watched))
            .cloned()
            .collect();
        let mut migrated = Vec::with_capacity(folded.len());
        for watched in folded {
            let Some(entry) = self.watches.remove(&watched) else {
                continue;
            };
            if let Err(e) = self.store.unwatch(entry.native.id) {
                warn!(location = %watched, error = %e, "failed to release folded watch");
            }
            migrated.push((watched, entry));
        }

        let (native, snapshot) = match self.open_watch(&target) {
            Ok(opened) => opened,
            Err(e) => {
                self.restore(migrated);
                if e.is_watch_error() {
                    return Err(WatchError::CeilingExceeded {
                        location: location.to_string(),
                        max_watches: self.max_watches,
                    }
                    .into());
                }
                return Err(e);
            }
        };

        let mut subscribers = BTreeSet::new();
        let mut flushed = Vec::new();
        let folded_count = migrated.len();
        for (watched, entry) in migrated {
            // Anything the old watch saw but never reported is reported now,
            // against the state the new watch starts from.
            let changes = entry.snapshot.diff(&snapshot.restricted_to(&watched));
            let tokens: Vec<SubscriptionToken> = entry.subscribers.iter().copied().collect();
            self.emit(&tokens, &changes, &mut flushed);
            subscribers.extend(entry.subscribers);
        }
        self.outbox.extend(flushed);

        for token in &subscribers {
            if let Some(sub) = self.subscriptions.get_mut(token) {
                sub.watch = target.clone();
            }
        }
        debug!(
            %target,
            folded = folded_count,
            watches = self.watches.len() + 1,
            "folded watches into common ancestor"
        );
        self.watches.insert(
            target.clone(),
            WatchEntry {
                native,
                subscribers,
                snapshot,
            },
        );
        Ok(target)
    }

    /// Watches `location` and captures its subtree.
    fn open_watch(&self, location: &Location) -> Result<(NativeWatch, Snapshot)> {
        let native = self.store.watch(location)?;
        match Snapshot::capture(self.store.as_ref(), location) {
            Ok(snapshot) => Ok((native, snapshot)),
            Err(e) => {
                self.store.unwatch(native.id)?;
                Err(e)
            }
        }
    }

    /// Puts back watches taken out for a fold that could not complete.
    ///
    /// Changes made while a watch was released are queued as events.
    fn restore(&mut self, migrated: Vec<(Location, WatchEntry)>) {
        let mut flushed = Vec::new();
        for (watched, mut entry) in migrated {
            match self.open_watch(&watched) {
                Ok((native, snapshot)) => {
                    let changes = entry.snapshot.diff(&snapshot);
                    let tokens: Vec<SubscriptionToken> =
                        entry.subscribers.iter().copied().collect();
                    self.emit(&tokens, &changes, &mut flushed);
                    entry.native = native;
                    entry.snapshot = snapshot;
                }
                Err(e) => {
                    warn!(location = %watched, error = %e, "failed to restore watch after fold");
                }
            }
            self.watches.insert(watched, entry);
        }
        self.outbox.extend(flushed);
    }
}
