//! Settings sessions.
//!
//! A [`Settings`] session binds one schema to one location. Reads go
//! straight to the native store and fall back to schema defaults; writes are
//! type-checked and either stored at once or, in delayed-apply mode, kept in
//! a pending change set until [`Settings::apply`].
//!
//! Sessions subscribe to changes when created and unsubscribe when dropped.
//! Change handlers run from [`Instance::iterate`](crate::Instance::iterate).

pub mod errors;

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

use tracing::{debug, warn};

pub use errors::SettingsError;

use crate::{
    Instance, Result,
    dispatch::HandlerId,
    marshal::{self, Decoded},
    path::{self, Location},
    schema::{Schema, SchemaKey},
    store::{BatchOp, NativeValue},
    variant::{Variant, VariantType},
    watch::{ChangeEvent, SubscriptionToken},
};

/// Pending writes of a delayed session: a value, or `None` for a reset.
type PendingChangeSet = BTreeMap<String, Option<Variant>>;

/// A handle on the settings of one schema at one location.
///
/// ```
/// # use std::{cell::RefCell, rc::Rc, sync::Arc};
/// # use regsettings::{Instance, schema::{Schema, SchemaRegistry}, store::InMemory};
/// # fn main() -> regsettings::Result<()> {
/// # let schemas = SchemaRegistry::new().with_schema(
/// #     Schema::builder("org.example.plugin").key("enabled", "b", "false").build()?,
/// # )?;
/// # let instance = Instance::open(Arc::new(InMemory::new()), Arc::new(schemas))?;
/// let settings = instance.settings_with_path("org.example.plugin", "/plugins/spell/")?;
///
/// let changed = Rc::new(RefCell::new(Vec::new()));
/// let seen = changed.clone();
/// settings.on_changed(move |event| seen.borrow_mut().push(event.key.clone()));
///
/// settings.set_bool("enabled", true)?;
/// instance.iterate();
/// assert_eq!(*changed.borrow(), ["enabled"]);
/// # Ok(())
/// # }
/// ```
pub struct Settings {
    instance: Instance,
    schema: Arc<Schema>,
    location: Location,
    token: SubscriptionToken,
    delayed: Cell<bool>,
    pending: RefCell<PendingChangeSet>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("schema", &self.schema.id())
            .field("location", &self.location)
            .field("token", &self.token)
            .field("delayed", &self.delayed.get())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl Settings {
    pub(crate) fn new(instance: Instance, schema_id: &str, path: Option<&str>) -> Result<Self> {
        let schema = instance.schemas().get(schema_id)?;
        let location = path::resolve(instance.base_location(), &schema, path)?;
        let token = instance
            .internal()
            .registry
            .borrow_mut()
            .subscribe(&location, Arc::clone(schema.index()))?;
        debug!(schema = schema_id, %location, %token, "opened settings");
        Ok(Self {
            instance,
            schema,
            location,
            token,
            delayed: Cell::new(false),
            pending: RefCell::new(PendingChangeSet::new()),
        })
    }

    /// The session's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Where the session's values are stored.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Names of every key, in schema order.
    pub fn keys(&self) -> Vec<&str> {
        self.schema.keys().iter().map(SchemaKey::name).collect()
    }

    fn key(&self, name: &str) -> Result<&SchemaKey> {
        self.schema.key(name).ok_or_else(|| {
            SettingsError::UnknownKey {
                schema: self.schema.id().to_string(),
                key: name.to_string(),
            }
            .into()
        })
    }

    fn native_name<'a>(&'a self, key: &'a SchemaKey) -> &'a str {
        self.schema.native_name(key.name()).unwrap_or(key.name())
    }

    /// Reads a key.
    ///
    /// Fails only for keys outside the schema. Missing, malformed or
    /// unreadable stored values read as the key's default.
    pub fn get(&self, name: &str) -> Result<Variant> {
        let key = self.key(name)?;
        if self.delayed.get() {
            if let Some(pending) = self.pending.borrow().get(name) {
                return Ok(pending
                    .clone()
                    .unwrap_or_else(|| key.default_value().clone()));
            }
        }

        let stored = match self
            .instance
            .store()
            .get_value(&self.location, self.native_name(key))
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key = name, location = %self.location, error = %e, "failed to read setting, using default");
                None
            }
        };
        let decoded = marshal::decode_or_fallback(stored.as_ref(), key);
        if let Decoded::Fallback { error, .. } = &decoded {
            warn!(key = name, location = %self.location, %error, "unusable stored value, using default");
        }
        Ok(decoded.into_value())
    }

    /// Writes a key. The value must have the key's type.
    pub fn set(&self, name: &str, value: Variant) -> Result<()> {
        let key = self.key(name)?;
        if !value.is_of_type(key.value_type()) {
            return Err(SettingsError::TypeMismatch {
                key: name.to_string(),
                expected: key.value_type().signature(),
                actual: value.type_signature(),
            }
            .into());
        }
        if self.delayed.get() {
            self.pending.borrow_mut().insert(name.to_string(), Some(value));
            return Ok(());
        }

        let native = self.native_name(key);
        let encoded = marshal::encode(&value);
        let store = self.instance.store();
        store.create_path(&self.location)?;
        store.set_value(&self.location, native, encoded.clone())?;
        self.note_write(key, Some(encoded));
        Ok(())
    }

    /// Removes the stored value of a key so it reads as its default.
    pub fn reset(&self, name: &str) -> Result<()> {
        let key = self.key(name)?;
        if self.delayed.get() {
            self.pending.borrow_mut().insert(name.to_string(), None);
            return Ok(());
        }
        self.instance
            .store()
            .delete_value(&self.location, self.native_name(key))?;
        self.note_write(key, None);
        Ok(())
    }

    /// Switches to delayed-apply mode: writes are buffered until
    /// [`apply`](Self::apply).
    pub fn enable_delay(&self) {
        self.delayed.set(true);
    }

    /// True in delayed-apply mode.
    pub fn is_delayed(&self) -> bool {
        self.delayed.get()
    }

    /// True if buffered writes are waiting for [`apply`](Self::apply).
    pub fn has_unapplied(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Writes every buffered change in one atomic batch.
    ///
    /// On failure nothing is written and the buffered changes are kept so
    /// the caller can retry.
    pub fn apply(&self) -> Result<()> {
        let ops: Vec<BatchOp> = {
            let pending = self.pending.borrow();
            if pending.is_empty() {
                return Ok(());
            }
            pending
                .iter()
                .map(|(name, value)| {
                    let native = self.schema.native_name(name).unwrap_or(name.as_str()).to_string();
                    match value {
                        Some(value) => BatchOp::Set {
                            name: native,
                            value: marshal::encode(value),
                        },
                        None => BatchOp::Delete { name: native },
                    }
                })
                .collect()
        };

        self.instance.store().write_batch(&self.location, &ops)?;
        debug!(location = %self.location, changes = ops.len(), "applied pending changes");

        let applied = std::mem::take(&mut *self.pending.borrow_mut());
        for (name, value) in applied {
            if let Some(key) = self.schema.key(&name) {
                self.note_write(key, value.as_ref().map(marshal::encode));
            }
        }
        Ok(())
    }

    /// Discards every buffered change.
    pub fn revert(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Connects a handler called once per changed key on each loop
    /// iteration. Changes at descendant locations are included; see
    /// [`ChangeEvent::is_descendant`].
    pub fn on_changed(&self, handler: impl FnMut(&ChangeEvent) + 'static) -> HandlerId {
        self.instance
            .internal()
            .dispatcher
            .borrow_mut()
            .connect(self.token, handler)
    }

    /// Disconnects a handler. Returns false if it was not connected.
    pub fn disconnect(&self, id: HandlerId) -> bool {
        self.instance
            .internal()
            .dispatcher
            .borrow_mut()
            .disconnect(self.token, id)
    }

    fn note_write(&self, key: &SchemaKey, value: Option<NativeValue>) {
        if self.instance.config().notify_self {
            return;
        }
        self.instance.internal().dispatcher.borrow_mut().record_self_write(
            self.token,
            key.name(),
            self.native_name(key),
            value,
        );
    }

    fn get_typed(&self, name: &str, ty: &VariantType) -> Result<Variant> {
        let key = self.key(name)?;
        if key.value_type() != ty {
            return Err(SettingsError::TypeMismatch {
                key: name.to_string(),
                expected: key.value_type().signature(),
                actual: ty.signature(),
            }
            .into());
        }
        self.get(name)
    }

    /// Reads a `b` key.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        Ok(self
            .get_typed(name, &VariantType::Bool)?
            .as_bool()
            .unwrap_or_default())
    }

    /// Reads an `i` key.
    pub fn get_int(&self, name: &str) -> Result<i32> {
        Ok(self
            .get_typed(name, &VariantType::Int32)?
            .as_i32()
            .unwrap_or_default())
    }

    /// Reads an `x` key.
    pub fn get_int64(&self, name: &str) -> Result<i64> {
        Ok(self
            .get_typed(name, &VariantType::Int64)?
            .as_i64()
            .unwrap_or_default())
    }

    /// Reads a `t` key.
    pub fn get_uint64(&self, name: &str) -> Result<u64> {
        Ok(self
            .get_typed(name, &VariantType::UInt64)?
            .as_u64()
            .unwrap_or_default())
    }

    /// Reads a `d` key.
    pub fn get_double(&self, name: &str) -> Result<f64> {
        Ok(self
            .get_typed(name, &VariantType::Double)?
            .as_f64()
            .unwrap_or_default())
    }

    /// Reads an `s` key.
    pub fn get_string(&self, name: &str) -> Result<String> {
        Ok(self
            .get_typed(name, &VariantType::String)?
            .as_str()
            .map(str::to_string)
            .unwrap_or_default())
    }

    /// Reads an `as` key.
    pub fn get_strv(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .get_typed(name, &VariantType::string_array())?
            .as_strv()
            .map(|items| items.into_iter().map(str::to_string).collect())
            .unwrap_or_default())
    }

    /// Writes a `b` key.
    pub fn set_bool(&self, name: &str, value: bool) -> Result<()> {
        self.set(name, Variant::Bool(value))
    }

    /// Writes an `i` key.
    pub fn set_int(&self, name: &str, value: i32) -> Result<()> {
        self.set(name, Variant::Int32(value))
    }

    /// Writes an `x` key.
    pub fn set_int64(&self, name: &str, value: i64) -> Result<()> {
        self.set(name, Variant::Int64(value))
    }

    /// Writes a `t` key.
    pub fn set_uint64(&self, name: &str, value: u64) -> Result<()> {
        self.set(name, Variant::UInt64(value))
    }

    /// Writes a `d` key.
    pub fn set_double(&self, name: &str, value: f64) -> Result<()> {
        self.set(name, Variant::Double(value))
    }

    /// Writes an `s` key.
    pub fn set_string(&self, name: &str, value: &str) -> Result<()> {
        self.set(name, Variant::String(value.to_string()))
    }

    /// Writes an `as` key.
    pub fn set_strv(&self, name: &str, value: &[&str]) -> Result<()> {
        self.set(name, Variant::strv(value.iter().copied()))
    }
}

impl Drop for Settings {
    fn drop(&mut self) {
        let internal = self.instance.internal();
        match internal.dispatcher.try_borrow_mut() {
            Ok(mut dispatcher) => dispatcher.forget(self.token),
            Err(_) => warn!(token = %self.token, "dispatcher busy while dropping settings"),
        }
        match internal.registry.try_borrow_mut() {
            Ok(mut registry) => {
                if let Err(e) = registry.unsubscribe(self.token) {
                    warn!(token = %self.token, error = %e, "failed to unsubscribe settings");
                }
            }
            Err(_) => warn!(token = %self.token, "watch registry busy while dropping settings"),
        }
        if self.has_unapplied() {
            debug!(location = %self.location, "discarding unapplied changes");
        }
    }
}
