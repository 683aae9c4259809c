//!
//! regsettings: typed, schema-driven settings on top of a flat native registry.
//!
//! ## Core Concepts
//!
//! * **Schemas (`schema::Schema`)**: Named tables of keys, each with a type and a default. A schema either has a fixed path or is relocatable.
//! * **Locations (`path::Location`)**: Positions in the native store. Settings paths and key names are mapped onto native names reversibly.
//! * **Variants (`variant::Variant`)**: The typed values keys hold: booleans, integers, doubles, strings, and maybes, arrays, tuples and dictionaries of them.
//! * **Native stores (`store::NativeStore`)**: A pluggable hierarchical key-value store with change watches. `store::InMemory` is bundled.
//! * **Instances (`Instance`)**: Own the store, the schema source and the watch registry shared by every session, and deliver change events when the caller's loop iterates.
//! * **Settings (`settings::Settings`)**: A session on one schema at one location, with typed reads and writes, delayed-apply batches and change handlers.

pub mod config;
pub mod constants;
pub(crate) mod dispatch;
pub mod instance;
pub mod marshal;
pub mod path;
pub mod schema;
pub mod settings;
pub mod store;
pub mod variant;
pub mod watch;

pub use config::InstanceConfig;
pub use dispatch::HandlerId;
pub use instance::Instance;
pub use settings::Settings;
pub use variant::{Variant, VariantType};
pub use watch::ChangeEvent;

/// Result type used throughout the regsettings library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the regsettings library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured errors from the variant model
    #[error(transparent)]
    Variant(variant::VariantError),

    /// Structured errors from the path mapper
    #[error(transparent)]
    Location(path::LocationError),

    /// Structured errors from the schema module
    #[error(transparent)]
    Schema(schema::SchemaError),

    /// Structured errors from the native store
    #[error(transparent)]
    Store(store::NativeStoreError),

    /// Structured errors from the type marshaler
    #[error(transparent)]
    Decode(marshal::DecodeError),

    /// Structured errors from the watch registry
    #[error(transparent)]
    Watch(watch::WatchError),

    /// Structured errors from settings sessions
    #[error(transparent)]
    Settings(settings::SettingsError),

    /// Structured errors from instance setup
    #[error(transparent)]
    Instance(instance::InstanceError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Variant(_) => "variant",
            Error::Location(_) => "path",
            Error::Schema(_) => "schema",
            Error::Store(_) => "store",
            Error::Decode(_) => "marshal",
            Error::Watch(_) => "watch",
            Error::Settings(_) => "settings",
            Error::Instance(_) => "instance",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Schema(schema_err) => schema_err.is_not_found(),
            Error::Store(store_err) => store_err.is_not_found(),
            Error::Watch(watch_err) => watch_err.is_not_found(),
            Error::Settings(settings_err) => settings_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates permission was denied.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_permission_denied(),
            _ => false,
        }
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Variant(variant_err) => variant_err.is_type_error(),
            Error::Decode(decode_err) => decode_err.is_wrong_type(),
            Error::Settings(settings_err) => settings_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error comes from parsing text, signatures or paths.
    pub fn is_parse_error(&self) -> bool {
        match self {
            Error::Variant(variant_err) => variant_err.is_parse_error(),
            Error::Location(location_err) => location_err.is_malformed(),
            Error::Decode(decode_err) => decode_err.is_malformed(),
            _ => false,
        }
    }

    /// Check if this error is about watch resources.
    pub fn is_watch_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_watch_error(),
            Error::Watch(watch_err) => watch_err.is_ceiling_exceeded(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_io_error(),
            Error::Schema(schema_err) => schema_err.is_io_error(),
            Error::Instance(instance_err) => instance_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error is configuration-related.
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::Schema(schema_err) => schema_err.is_invalid_schema(),
            Error::Instance(instance_err) => instance_err.is_config_error(),
            Error::Location(location_err) => location_err.is_path_required(),
            _ => false,
        }
    }
}
