//! Key commands - get, set, reset and list values of a schema instance.

use regsettings::{Settings, Variant, settings::SettingsError};

use crate::backend::Backend;
use crate::cli::{KeyArgs, SchemaArgs, SetArgs};
use crate::output::{OutputFormat, print_json, print_table};

/// Run the `get` command
pub fn get(
    backend: &Backend,
    args: &KeyArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = backend.settings(&args.target)?;
    let value = settings.get(&args.key)?;
    match format {
        OutputFormat::Human => println!("{value}"),
        OutputFormat::Json => print_json(&serde_json::json!({
            "key": args.key,
            "type": value.type_signature(),
            "value": value.to_string(),
        }))?,
    }
    Ok(())
}

/// Run the `set` command
pub fn set(backend: &Backend, args: &SetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = backend.settings(&args.target.target)?;
    let key = &args.target.key;
    let ty = settings
        .schema()
        .key(key)
        .map(|k| k.value_type().clone())
        .ok_or_else(|| SettingsError::UnknownKey {
            schema: settings.schema().id().to_string(),
            key: key.clone(),
        })?;
    let value = Variant::parse(&args.value, &ty)?;
    settings.set(key, value)?;
    backend.save()?;
    tracing::info!("Set {key} at {}", settings.location());
    Ok(())
}

/// Run the `reset` command
pub fn reset(backend: &Backend, args: &KeyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = backend.settings(&args.target)?;
    settings.reset(&args.key)?;
    backend.save()?;
    tracing::info!("Reset {} at {}", args.key, settings.location());
    Ok(())
}

/// Run the `list` command
pub fn list(
    backend: &Backend,
    args: &SchemaArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = backend.settings(args)?;
    let values = current_values(&settings)?;

    match format {
        OutputFormat::Human => {
            let rows: Vec<Vec<String>> = values
                .iter()
                .map(|(name, value)| {
                    vec![name.clone(), value.type_signature(), value.to_string()]
                })
                .collect();
            print_table(&["KEY", "TYPE", "VALUE"], &rows);
        }
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = values
                .into_iter()
                .map(|(name, value)| (name, serde_json::Value::String(value.to_string())))
                .collect();
            print_json(&serde_json::Value::Object(map))?;
        }
    }
    Ok(())
}

/// Every key of the session with its current value, in schema order.
pub fn current_values(settings: &Settings) -> regsettings::Result<Vec<(String, Variant)>> {
    settings
        .keys()
        .into_iter()
        .map(|name| Ok((name.to_string(), settings.get(name)?)))
        .collect()
}
