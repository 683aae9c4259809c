//!
//! Provides the `Instance`, the owner of everything one settings backend
//! shares between its sessions: the native store, the schema source, the
//! watch registry and the change dispatcher.
//!
//! An instance is driven by a cooperative event loop owned by the caller.
//! Native changes are only turned into events, and events only delivered,
//! when the loop calls [`Instance::iterate`].

use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    Result,
    config::InstanceConfig,
    dispatch::Dispatcher,
    path::Location,
    schema::SchemaSource,
    settings::Settings,
    store::NativeStore,
    watch::{ChangeEvent, WatchRegistry},
};

pub mod errors;

pub use errors::InstanceError;

/// Internal state for Instance
///
/// Instance itself is just a cheap-to-clone handle wrapping
/// `Rc<InstanceInternal>`.
pub(crate) struct InstanceInternal {
    config: InstanceConfig,
    base: Location,
    store: Arc<dyn NativeStore>,
    schemas: Arc<dyn SchemaSource>,
    pub(crate) registry: RefCell<WatchRegistry>,
    pub(crate) dispatcher: RefCell<Dispatcher>,
}

impl fmt::Debug for InstanceInternal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceInternal")
            .field("config", &self.config)
            .field("base", &self.base)
            .field("store", &"<NativeStore>")
            .field("schemas", &self.schemas.list())
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Entry point for settings access.
///
/// Instance is a cheap-to-clone handle. It is deliberately `!Send`: every
/// session, the watch registry and the dispatcher belong to the thread that
/// runs the loop. The native store underneath may still be shared with
/// other threads.
///
/// ## Example
///
/// ```
/// # use std::sync::Arc;
/// # use regsettings::{Instance, schema::{Schema, SchemaRegistry}, store::InMemory};
/// # fn main() -> regsettings::Result<()> {
/// let schemas = SchemaRegistry::new().with_schema(
///     Schema::builder("org.example.editor")
///         .path("/org/example/editor/")
///         .key("tab-width", "i", "8")
///         .build()?,
/// )?;
/// let instance = Instance::open(Arc::new(InMemory::new()), Arc::new(schemas))?;
///
/// let settings = instance.settings("org.example.editor")?;
/// assert_eq!(settings.get_int("tab-width")?, 8);
/// settings.set_int("tab-width", 4)?;
/// assert_eq!(settings.get_int("tab-width")?, 4);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Instance {
    inner: Rc<InstanceInternal>,
}

impl Instance {
    /// Opens an instance with the default configuration.
    pub fn open(store: Arc<dyn NativeStore>, schemas: Arc<dyn SchemaSource>) -> Result<Self> {
        Self::open_with_config(store, schemas, InstanceConfig::default())
    }

    /// Opens an instance with an explicit configuration.
    pub fn open_with_config(
        store: Arc<dyn NativeStore>,
        schemas: Arc<dyn SchemaSource>,
        config: InstanceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let base = Location::root(&config.base_path);
        debug!(base = %base, max_watches = config.max_watches, "opening instance");
        let registry = WatchRegistry::new(Arc::clone(&store), config.max_watches);
        Ok(Self {
            inner: Rc::new(InstanceInternal {
                config,
                base,
                store,
                schemas,
                registry: RefCell::new(registry),
                dispatcher: RefCell::new(Dispatcher::default()),
            }),
        })
    }

    /// Opens a session for a fixed-path schema.
    pub fn settings(&self, schema_id: &str) -> Result<Settings> {
        Settings::new(self.clone(), schema_id, None)
    }

    /// Opens a session for a schema at an explicit path.
    ///
    /// The path is required for relocatable schemas and ignored for
    /// fixed-path ones.
    pub fn settings_with_path(&self, schema_id: &str, path: &str) -> Result<Settings> {
        Settings::new(self.clone(), schema_id, Some(path))
    }

    /// Runs one loop iteration: collects native changes and delivers every
    /// queued event. Returns the number of handler invocations.
    pub fn iterate(&self) -> usize {
        let events = self.inner.registry.borrow_mut().poll();
        self.inner.dispatcher.borrow_mut().enqueue(events);

        let mut delivered = 0;
        loop {
            let Some(event) = self.inner.dispatcher.borrow_mut().next_event() else {
                break;
            };
            if self.is_own_write(&event) {
                debug!(key = %event.key, token = %event.token, "suppressed own write");
                continue;
            }
            delivered += self.deliver(&event);
        }
        delivered
    }

    /// Iterates until `done` returns true, at most `max_iterations` times.
    ///
    /// Returns the final value of `done`.
    pub fn iterate_until(&self, mut done: impl FnMut() -> bool, max_iterations: usize) -> bool {
        for _ in 0..max_iterations {
            if done() {
                return true;
            }
            if self.iterate() == 0 {
                std::thread::yield_now();
            }
        }
        done()
    }

    /// Number of events queued for the next iteration.
    pub fn pending_events(&self) -> usize {
        self.inner.dispatcher.borrow().pending()
    }

    /// Number of native watches held.
    pub fn watch_count(&self) -> usize {
        self.inner.registry.borrow().watch_count()
    }

    /// Locations currently watched.
    pub fn watched_locations(&self) -> Vec<Location> {
        self.inner.registry.borrow().watched_locations()
    }

    /// The native store.
    pub fn store(&self) -> &Arc<dyn NativeStore> {
        &self.inner.store
    }

    /// The schema source.
    pub fn schemas(&self) -> &Arc<dyn SchemaSource> {
        &self.inner.schemas
    }

    /// The configuration the instance was opened with.
    pub fn config(&self) -> &InstanceConfig {
        &self.inner.config
    }

    /// The root every settings path is placed under.
    pub fn base_location(&self) -> &Location {
        &self.inner.base
    }

    pub(crate) fn internal(&self) -> &InstanceInternal {
        &self.inner
    }

    /// True if `event` only echoes the subscriber's own latest write.
    fn is_own_write(&self, event: &ChangeEvent) -> bool {
        if self.inner.config.notify_self || event.is_descendant() {
            return false;
        }
        let Some(marker) = self
            .inner
            .dispatcher
            .borrow_mut()
            .take_self_write(event.token, &event.key)
        else {
            return false;
        };
        match self.inner.store.get_value(&event.location, &marker.native) {
            Ok(current) => current == marker.value,
            Err(e) => {
                warn!(key = %event.key, error = %e, "failed to re-read value after change");
                false
            }
        }
    }

    fn deliver(&self, event: &ChangeEvent) -> usize {
        let handlers = self.inner.dispatcher.borrow().handlers_for(event.token);
        let mut delivered = 0;
        for (id, handler) in handlers {
            // An earlier handler may have disconnected this one or dropped
            // the whole session.
            if !self.inner.dispatcher.borrow().is_connected(event.token, id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut callback) => {
                    (*callback)(event);
                    delivered += 1;
                }
                Err(_) => warn!(key = %event.key, "skipping re-entrant change handler"),
            }
        }
        delivered
    }
}
