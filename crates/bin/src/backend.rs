//! Store, schema and instance creation for the commands.

use std::{path::PathBuf, sync::Arc};

use regsettings::{Instance, InstanceConfig, Settings, schema::SchemaRegistry, store::InMemory};

use crate::cli::{SchemaArgs, StoreArgs};

const STORE_FILE: &str = "registry.json";

/// Everything a command needs: the instance and the store behind it.
pub struct Backend {
    pub store: Arc<InMemory>,
    pub instance: Instance,
    store_path: PathBuf,
}

impl Backend {
    /// Loads the registry file, the schemas and the configuration.
    ///
    /// A missing registry file starts an empty store.
    pub fn open(args: &StoreArgs) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&args.data_dir)?;
        let store_path = args.data_dir.join(STORE_FILE);
        let store = Arc::new(InMemory::load_from_file(&store_path)?);
        tracing::debug!("Loaded registry from {}", store_path.display());

        let schemas = SchemaRegistry::load_from_file(&args.schemas).map_err(|e| {
            format!("Failed to load schemas from {}: {e}", args.schemas.display())
        })?;

        let instance = Instance::open_with_config(
            store.clone(),
            Arc::new(schemas),
            instance_config(args)?,
        )?;
        Ok(Self {
            store,
            instance,
            store_path,
        })
    }

    /// Opens a session on the schema instance named by `target`.
    pub fn settings(&self, target: &SchemaArgs) -> regsettings::Result<Settings> {
        match &target.path {
            Some(path) => self.instance.settings_with_path(&target.schema, path),
            None => self.instance.settings(&target.schema),
        }
    }

    /// Writes the store back to the registry file.
    pub fn save(&self) -> regsettings::Result<()> {
        self.store.save_to_file(&self.store_path)?;
        tracing::debug!("Saved registry to {}", self.store_path.display());
        Ok(())
    }

    /// Re-reads the registry file, firing watches for anything that changed.
    pub fn reload(&self) -> regsettings::Result<()> {
        self.store.reload_from_file(&self.store_path)
    }
}

/// The config file, if any, with command-line overrides applied.
fn instance_config(args: &StoreArgs) -> Result<InstanceConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => InstanceConfig::load_from_file(path)?,
        None => InstanceConfig::default(),
    };
    if let Some(base_path) = &args.base_path {
        config = config.with_base_path(base_path.clone());
    }
    if let Some(max_watches) = args.max_watches {
        config = config.with_max_watches(max_watches);
    }
    Ok(config)
}
