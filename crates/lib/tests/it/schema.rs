//! Schema file and registry tests

use std::sync::Arc;

use regsettings::{
    Instance,
    schema::{Schema, SchemaRegistry, SchemaSource},
    store::InMemory,
};

use crate::helpers::*;

const SCHEMA_FILE: &str = r#"{
    "schemas": [
        {
            "id": "org.example.terminal",
            "path": "/org/example/terminal/",
            "keys": [
                { "name": "font-size", "type": "i", "default": "11" },
                { "name": "palette", "type": "as", "default": "['black', 'white']",
                  "summary": "Colours, darkest first" }
            ]
        },
        {
            "id": "org.example.terminal.profile",
            "keys": [
                { "name": "title", "type": "ms", "default": "nothing" }
            ]
        }
    ]
}"#;

#[test]
fn test_instance_from_schema_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("schemas.json");
    std::fs::write(&file, SCHEMA_FILE).unwrap();

    let registry = SchemaRegistry::load_from_file(&file).unwrap();
    assert_eq!(
        registry.list(),
        ["org.example.terminal", "org.example.terminal.profile"]
    );

    let instance = Instance::open(Arc::new(InMemory::new()), Arc::new(registry)).unwrap();
    let terminal = instance.settings("org.example.terminal").unwrap();
    assert_eq!(terminal.get_int("font-size").unwrap(), 11);
    assert_eq!(terminal.get_strv("palette").unwrap(), ["black", "white"]);
    assert_eq!(
        terminal.schema().key("palette").unwrap().summary(),
        Some("Colours, darkest first")
    );

    let profile = instance
        .settings_with_path("org.example.terminal.profile", "/org/example/terminal/profiles/default/")
        .unwrap();
    assert!(profile.schema().is_relocatable());
    assert!(terminal.location().is_ancestor_of(profile.location()));
}

#[test]
fn test_invalid_schema_files() {
    let bad_type = r#"{"schemas": [{"id": "x", "keys": [{"name": "k", "type": "q", "default": "0"}]}]}"#;
    let err = SchemaRegistry::from_json(bad_type).unwrap_err();
    assert!(err.is_invalid_schema());

    let bad_default =
        r#"{"schemas": [{"id": "x", "keys": [{"name": "k", "type": "i", "default": "'text'"}]}]}"#;
    assert!(SchemaRegistry::from_json(bad_default).unwrap_err().is_invalid_schema());

    let duplicate = r#"{"schemas": [
        {"id": "x", "keys": [{"name": "k", "type": "i", "default": "0"},
                             {"name": "k", "type": "s", "default": "''"}]}]}"#;
    assert!(SchemaRegistry::from_json(duplicate).unwrap_err().is_invalid_schema());

    let dir = tempfile::tempdir().unwrap();
    let err = SchemaRegistry::load_from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(err.is_io_error());
}

#[test]
fn test_registry_json_round_trip() {
    let registry = test_schemas();
    let json = registry.to_json().unwrap();
    let reloaded = SchemaRegistry::from_json(&json).unwrap();
    assert_eq!(reloaded.len(), 2);

    let first = registry.get(STORAGE_SCHEMA).unwrap();
    let copy = reloaded.get(STORAGE_SCHEMA).unwrap();
    assert_eq!(copy.to_def(), first.to_def());
    assert_eq!(
        copy.native_name(LONG_KEY),
        first.native_name(LONG_KEY)
    );
}

#[test]
fn test_duplicate_schema_ids_are_rejected() {
    let err = test_schemas().with_schema(storage_schema()).unwrap_err();
    assert!(err.is_invalid_schema());
}

#[test]
fn test_long_key_names_map_to_distinct_native_names() {
    let long_a = format!("{}-alpha", "x".repeat(40));
    let long_b = format!("{}-beta", "x".repeat(40));
    let schema = Schema::builder("org.example.long")
        .key(long_a.as_str(), "i", "0")
        .key(long_b.as_str(), "i", "1")
        .build()
        .unwrap();
    assert_ne!(schema.native_name(&long_a), schema.native_name(&long_b));
    assert_eq!(
        schema.key_for_native(schema.native_name(&long_b).unwrap()).map(|k| k.name()),
        Some(long_b.as_str())
    );
}
