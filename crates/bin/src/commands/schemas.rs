//! Schemas command - lists every loaded schema with its keys.

use crate::backend::Backend;
use crate::output::{OutputFormat, print_json, print_table};

/// Run the schemas command
pub fn run(backend: &Backend, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let source = backend.instance.schemas();
    let schemas: Vec<_> = source
        .list()
        .iter()
        .filter_map(|id| source.lookup(id))
        .collect();

    match format {
        OutputFormat::Human => {
            if schemas.is_empty() {
                println!("No schemas loaded.");
                return Ok(());
            }
            for (i, schema) in schemas.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{} ({})", schema.id(), schema.path().unwrap_or("relocatable"));
                let rows: Vec<Vec<String>> = schema
                    .keys()
                    .iter()
                    .map(|key| {
                        vec![
                            key.name().to_string(),
                            key.value_type().signature(),
                            key.default_value().to_string(),
                            key.summary().unwrap_or_default().to_string(),
                        ]
                    })
                    .collect();
                print_table(&["KEY", "TYPE", "DEFAULT", "SUMMARY"], &rows);
            }
        }
        OutputFormat::Json => {
            let defs = schemas
                .iter()
                .map(|schema| serde_json::to_value(schema.to_def()))
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&serde_json::Value::Array(defs))?;
        }
    }

    Ok(())
}
