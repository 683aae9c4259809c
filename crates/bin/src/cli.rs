//! CLI argument definitions for the regsettings binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect and edit schema-typed settings kept in a native registry file
#[derive(Parser, Debug)]
#[command(name = "regsettings")]
#[command(about = "Schema-typed settings on top of a flat native registry")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the registry, the schemas and the configuration come from
#[derive(clap::Args, Debug)]
pub struct StoreArgs {
    /// Data directory holding registry.json
    #[arg(short = 'D', long, default_value = ".", env = "REGSETTINGS_DATA_DIR")]
    pub data_dir: PathBuf,

    /// JSON file listing the schemas
    #[arg(short, long, default_value = "schemas.json", env = "REGSETTINGS_SCHEMAS")]
    pub schemas: PathBuf,

    /// Optional instance configuration file
    #[arg(short, long, env = "REGSETTINGS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Native root all settings paths are placed under
    #[arg(long, env = "REGSETTINGS_BASE_PATH")]
    pub base_path: Option<String>,

    /// Ceiling on the number of native watches
    #[arg(long, env = "REGSETTINGS_MAX_WATCHES")]
    pub max_watches: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List loaded schemas and their keys
    Schemas,
    /// Print the value of a key
    Get(KeyArgs),
    /// Parse and write the value of a key
    Set(SetArgs),
    /// Remove the stored value of a key
    Reset(KeyArgs),
    /// Print every key of a schema with its value
    List(SchemaArgs),
    /// Print the native store tree
    Dump,
    /// Print change events until interrupted
    Monitor(MonitorArgs),
}

/// A schema instance
#[derive(clap::Args, Debug)]
pub struct SchemaArgs {
    /// Schema id
    pub schema: String,

    /// Settings path, required for relocatable schemas
    #[arg(short, long)]
    pub path: Option<String>,
}

/// One key of a schema instance
#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    #[command(flatten)]
    pub target: SchemaArgs,

    /// Key name
    pub key: String,
}

/// Arguments for the set command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: KeyArgs,

    /// New value in text form, e.g. 42, 'text' or ['a', 'b']
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

/// Arguments for the monitor command
#[derive(clap::Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub target: SchemaArgs,

    /// How often to re-read the registry file
    #[arg(short, long, default_value_t = 500, env = "REGSETTINGS_INTERVAL_MS")]
    pub interval_ms: u64,
}
