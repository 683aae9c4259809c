//! Dump command - prints the whole native store tree.

use std::collections::BTreeMap;

use regsettings::{
    path::Location,
    store::{NativeStore, NativeValue},
};

use crate::backend::Backend;
use crate::output::{OutputFormat, print_json};

/// Run the dump command
pub fn run(backend: &Backend, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let tree = collect(backend.store.as_ref())?;

    match format {
        OutputFormat::Human => {
            if tree.is_empty() {
                println!("Registry is empty.");
                return Ok(());
            }
            for (location, values) in &tree {
                println!("[{location}]");
                for (name, value) in values {
                    println!("  {name} = {value}");
                }
            }
        }
        OutputFormat::Json => {
            let mut map = serde_json::Map::new();
            for (location, values) in tree {
                map.insert(location.to_string(), serde_json::to_value(values)?);
            }
            print_json(&serde_json::Value::Object(map))?;
        }
    }
    Ok(())
}

/// Every location that exists, with its values, in tree order.
fn collect(
    store: &dyn NativeStore,
) -> regsettings::Result<BTreeMap<Location, BTreeMap<String, NativeValue>>> {
    let mut tree = BTreeMap::new();
    let mut pending = vec![Location::default()];
    while let Some(location) = pending.pop() {
        for child in store.list_subkeys(&location)? {
            pending.push(location.join(child));
        }
        if location.depth() > 0 {
            tree.insert(location.clone(), store.list_values(&location)?);
        }
    }
    Ok(tree)
}
