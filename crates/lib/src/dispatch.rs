//! Queue and handler table for change notifications.
//!
//! Events produced by the watch registry wait here until the instance's next
//! iteration, which hands each one to the handlers connected for its
//! subscription. Nothing in here calls a handler; the instance does that
//! after releasing its borrow of the dispatcher so handlers may freely use
//! the instance, including dropping sessions.

use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    fmt,
    rc::Rc,
};

use crate::{store::NativeValue, watch::{ChangeEvent, SubscriptionToken}};

/// Identifies a connected change handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

pub(crate) type Handler = Rc<RefCell<dyn FnMut(&ChangeEvent)>>;

/// The value a session last wrote for a key, used to recognise the echo of
/// its own write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelfWrite {
    pub(crate) native: String,
    pub(crate) value: Option<NativeValue>,
}

#[derive(Default)]
pub(crate) struct Dispatcher {
    queue: VecDeque<ChangeEvent>,
    handlers: BTreeMap<SubscriptionToken, Vec<(HandlerId, Handler)>>,
    next_handler: u64,
    self_writes: BTreeMap<(SubscriptionToken, String), SelfWrite>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.queue.len())
            .field("handlers", &self.handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl Dispatcher {
    pub(crate) fn connect(
        &mut self,
        token: SubscriptionToken,
        handler: impl FnMut(&ChangeEvent) + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        let handler: Handler = Rc::new(RefCell::new(handler));
        self.handlers.entry(token).or_default().push((id, handler));
        id
    }

    pub(crate) fn disconnect(&mut self, token: SubscriptionToken, id: HandlerId) -> bool {
        let Some(list) = self.handlers.get_mut(&token) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        list.len() != before
    }

    pub(crate) fn is_connected(&self, token: SubscriptionToken, id: HandlerId) -> bool {
        self.handlers
            .get(&token)
            .is_some_and(|list| list.iter().any(|(handler_id, _)| *handler_id == id))
    }

    pub(crate) fn handlers_for(&self, token: SubscriptionToken) -> Vec<(HandlerId, Handler)> {
        self.handlers.get(&token).cloned().unwrap_or_default()
    }

    pub(crate) fn enqueue(&mut self, events: impl IntoIterator<Item = ChangeEvent>) {
        self.queue.extend(events);
    }

    pub(crate) fn next_event(&mut self) -> Option<ChangeEvent> {
        self.queue.pop_front()
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn record_self_write(
        &mut self,
        token: SubscriptionToken,
        key: &str,
        native: &str,
        value: Option<NativeValue>,
    ) {
        self.self_writes.insert(
            (token, key.to_string()),
            SelfWrite {
                native: native.to_string(),
                value,
            },
        );
    }

    pub(crate) fn take_self_write(
        &mut self,
        token: SubscriptionToken,
        key: &str,
    ) -> Option<SelfWrite> {
        self.self_writes.remove(&(token, key.to_string()))
    }

    /// Drops everything held for a subscription.
    pub(crate) fn forget(&mut self, token: SubscriptionToken) {
        self.queue.retain(|event| event.token != token);
        self.handlers.remove(&token);
        self.self_writes.retain(|(t, _), _| *t != token);
    }
}
