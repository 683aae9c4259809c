//! Native store tests
//!
//! Persistence of the in-memory store and edits that arrive through a
//! reloaded file.

use std::sync::Arc;

use regsettings::{
    InstanceConfig,
    store::{InMemory, NativeStore, NativeValue},
};

use crate::helpers::*;

#[test]
fn test_values_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("registry.json");

    {
        let ctx = TestContext::new();
        let settings = ctx.storage();
        settings.set_int("int32", -999).unwrap();
        settings.set_strv("strv", &["saved"]).unwrap();
        set_marker(&ctx.long_path("/tests/storage/persisted/"), "kept");
        ctx.store().save_to_file(&file).unwrap();
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert!(json.get("_v").is_none());
    assert!(json["root"].is_object());

    let store = Arc::new(InMemory::load_from_file(&file).unwrap());
    let ctx = TestContext::with_store(store, InstanceConfig::default());
    let settings = ctx.storage();
    assert_eq!(settings.get_int("int32").unwrap(), -999);
    assert_eq!(settings.get_strv("strv").unwrap(), ["saved"]);
    assert_eq!(
        marker(&ctx.long_path("/tests/storage/persisted/")).as_deref(),
        Some("kept")
    );
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemory::load_from_file(dir.path().join("absent.json")).unwrap();
    assert!(
        !store
            .path_exists(&regsettings::path::Location::root("Software"))
            .unwrap()
    );
}

#[test]
fn test_unsupported_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("registry.json");
    std::fs::write(&file, r#"{"_v": 99, "root": {}}"#).unwrap();
    assert!(InMemory::load_from_file(&file).is_err());

    std::fs::write(&file, "not json").unwrap();
    assert!(InMemory::load_from_file(&file).is_err());
}

#[test]
fn test_reload_reports_changed_keys() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("registry.json");

    let ctx = TestContext::new();
    let settings = ctx.storage();
    settings.set_int("int32", 1).unwrap();
    settings.set_string("string", "unchanged").unwrap();
    ctx.drain();

    // Another process edits a copy of the same registry.
    ctx.store().save_to_file(&file).unwrap();
    let other = InMemory::load_from_file(&file).unwrap();
    other
        .set_value(settings.location(), "int32", NativeValue::Dword(2))
        .unwrap();
    other.save_to_file(&file).unwrap();

    let log = ChangeLog::attach(&settings);
    ctx.store().reload_from_file(&file).unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["int32"]);
    assert_eq!(settings.get_int("int32").unwrap(), 2);
    assert_eq!(settings.get_string("string").unwrap(), "unchanged");
}

#[test]
fn test_instance_store_downcasts() {
    let ctx = TestContext::new();
    let store = ctx.instance().store();
    let concrete = store
        .as_any()
        .downcast_ref::<InMemory>()
        .expect("store is not InMemory");
    assert_eq!(concrete.watch_count(), 0);

    let _settings = ctx.storage();
    assert_eq!(concrete.watch_count(), 1);
}
