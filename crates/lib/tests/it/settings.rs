//! Settings session tests
//!
//! Reads and writes of every supported type, delayed apply, relocatable
//! schemas and recovery from values damaged by other writers.

use regsettings::{
    Variant, VariantType,
    path::value_name,
    store::{NativeStore, NativeValue},
};

use crate::helpers::*;

#[test]
fn test_defaults_read_back_without_stored_values() {
    let ctx = TestContext::new();
    let settings = ctx.storage();

    assert!(settings.get_bool("bool").unwrap());
    assert_eq!(settings.get_int("int32").unwrap(), 55);
    assert_eq!(settings.get_int("a-5").unwrap(), 666666);
    assert_eq!(settings.get_int64("qword").unwrap(), 4398046511104);
    assert_eq!(settings.get_string("string").unwrap(), "Hello world");
    assert_eq!(settings.get_double("double").unwrap(), 3.1415926535897932);
    assert_eq!(settings.get_strv("strv").unwrap(), ["Hello world", "Pipo"]);
    assert_eq!(settings.get_string("junk").unwrap(), "");
    assert_eq!(
        settings.get("box").unwrap(),
        Variant::tuple([Variant::Int32(20), Variant::Int32(30), Variant::Int32(30)])
    );
    assert_eq!(settings.keys().len(), 12);
    assert_eq!(
        settings.schema().key("string").unwrap().summary(),
        Some("A plain string")
    );
}

#[test]
fn test_simple_values() {
    let ctx = TestContext::new();
    let settings = ctx.storage();

    settings.set_bool("bool", false).unwrap();
    assert!(!settings.get_bool("bool").unwrap());

    settings.set_int("int32", -999).unwrap();
    assert_eq!(settings.get_int("int32").unwrap(), -999);

    settings.set_int("a-5", 66666666).unwrap();
    assert_eq!(settings.get_int("a-5").unwrap(), 66666666);

    settings.set_int64("qword", 31313131).unwrap();
    assert_eq!(settings.get_int64("qword").unwrap(), 31313131);
    settings.set_int64("qword", -1).unwrap();
    assert_eq!(settings.get_int64("qword").unwrap(), -1);

    settings.set_string("string", "Goodbye world").unwrap();
    assert_eq!(settings.get_string("string").unwrap(), "Goodbye world");

    settings.set_double("double", -10000000000.5).unwrap();
    assert_eq!(settings.get_double("double").unwrap(), -10000000000.5);

    settings.set_strv("strv", &["one", "two", "three"]).unwrap();
    assert_eq!(settings.get_strv("strv").unwrap(), ["one", "two", "three"]);

    // Another session sees the same stored values.
    let other = ctx.storage();
    assert_eq!(other.get_int("int32").unwrap(), -999);
    assert_eq!(other.get_int64("qword").unwrap(), -1);
    assert_eq!(other.get_string("string").unwrap(), "Goodbye world");
}

#[test]
fn test_native_representation() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let at = settings.location().clone();
    assert_eq!(at.to_string(), "Software\\GSettings\\tests\\storage");

    settings.set_bool("bool", true).unwrap();
    settings.set_int("int32", -1).unwrap();
    settings.set_int64("qword", -1).unwrap();
    settings.set_string("string", "plain").unwrap();
    settings.set_strv("strv", &["a"]).unwrap();

    let store = ctx.store();
    assert_eq!(store.get_value(&at, "bool").unwrap(), Some(NativeValue::Dword(1)));
    assert_eq!(
        store.get_value(&at, "int32").unwrap(),
        Some(NativeValue::Dword(u32::MAX))
    );
    assert_eq!(
        store.get_value(&at, "qword").unwrap(),
        Some(NativeValue::Qword(u64::MAX))
    );
    assert_eq!(
        store.get_value(&at, "string").unwrap(),
        Some(NativeValue::String("plain".to_string()))
    );
    assert_eq!(
        store.get_value(&at, "strv").unwrap(),
        Some(NativeValue::String("['a']".to_string()))
    );
}

#[test]
fn test_complex_values() {
    let ctx = TestContext::new();
    let settings = ctx.storage();

    let breakfast = Variant::dict(
        VariantType::Double,
        [
            ("toast", Variant::Double(2.0)),
            ("beans", Variant::Double(0.5)),
        ],
    )
    .unwrap();
    settings.set("breakfast", breakfast.clone()).unwrap();
    assert_eq!(settings.get("breakfast").unwrap(), breakfast);

    let row = |a, b, c| Variant::tuple([Variant::Int32(a), Variant::Int32(b), Variant::Int32(c)]);
    let board = Variant::array(
        VariantType::parse("(iii)").unwrap(),
        vec![row(0, 1, 0), row(1, 0, 1), row(-1, 1, 0)],
    )
    .unwrap();
    settings.set("noughts-and-crosses", board.clone()).unwrap();
    assert_eq!(settings.get("noughts-and-crosses").unwrap(), board);

    settings.set("box", row(-1, 99, 11111)).unwrap();
    assert_eq!(settings.get("box").unwrap(), row(-1, 99, 11111));
}

#[test]
fn test_type_mismatch_is_rejected() {
    let ctx = TestContext::new();
    let settings = ctx.storage();

    let err = settings.set("int32", Variant::String("55".into())).unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(err.module(), "settings");
    assert!(settings.set("box", Variant::tuple([Variant::Int32(1)])).is_err());
    assert!(settings.get_string("int32").unwrap_err().is_type_error());
    assert!(settings.get("no-such-key").unwrap_err().is_not_found());
    assert!(settings.set_int("no-such-key", 1).unwrap_err().is_not_found());

    // Nothing was written.
    assert!(ctx.store().list_values(settings.location()).unwrap().is_empty());
}

#[test]
fn test_escaped_strings() {
    let ctx = TestContext::new();
    let settings = ctx.storage();

    settings.set_string("string", "foo\\.bar").unwrap();
    assert_eq!(settings.get_string("string").unwrap(), "foo\\.bar");

    settings.set_strv("strv", &["foo\\.bar", "\\pipo\\.bar"]).unwrap();
    assert_eq!(settings.get_strv("strv").unwrap(), ["foo\\.bar", "\\pipo\\.bar"]);

    settings
        .set_strv("strv", &["it's", "say \"hi\"", "tab\there"])
        .unwrap();
    assert_eq!(
        settings.get_strv("strv").unwrap(),
        ["it's", "say \"hi\"", "tab\there"]
    );
}

#[test]
fn test_reset_restores_default() {
    let ctx = TestContext::new();
    let settings = ctx.storage();

    settings.set_string("string", "changed").unwrap();
    settings.reset("string").unwrap();
    assert_eq!(settings.get_string("string").unwrap(), "Hello world");
    assert_eq!(
        ctx.store().get_value(settings.location(), "string").unwrap(),
        None
    );

    // Resetting an unset key is fine.
    settings.reset("string").unwrap();
}

#[test]
fn test_delay_apply() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    settings.enable_delay();
    assert!(settings.is_delayed());

    settings.set_int("a-5", 88).unwrap();
    settings.set_string("string", "I got 99 problems").unwrap();
    settings.set_string("junk", "but GSettings ain't one").unwrap();
    assert!(settings.has_unapplied());

    // Pending values are visible to this session only.
    assert_eq!(settings.get_int("a-5").unwrap(), 88);
    let other = ctx.storage();
    assert_eq!(other.get_int("a-5").unwrap(), 666666);

    settings.apply().unwrap();
    assert!(!settings.has_unapplied());

    let fresh = ctx.storage();
    assert_eq!(fresh.get_int("a-5").unwrap(), 88);
    assert_eq!(fresh.get_string("string").unwrap(), "I got 99 problems");
    assert_eq!(fresh.get_string("junk").unwrap(), "but GSettings ain't one");
}

#[test]
fn test_delay_revert() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    settings.enable_delay();

    settings.set_int("int32", 1).unwrap();
    settings.revert();
    assert!(!settings.has_unapplied());
    assert_eq!(settings.get_int("int32").unwrap(), 55);

    // Applying with nothing pending writes nothing.
    settings.apply().unwrap();
    assert!(ctx.store().list_values(settings.location()).unwrap().is_empty());
}

#[test]
fn test_failed_apply_keeps_pending_changes() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    settings.enable_delay();
    settings.set_int("int32", 7).unwrap();

    ctx.store().deny_writes(settings.location());
    let err = settings.apply().unwrap_err();
    assert!(err.is_permission_denied());
    assert!(settings.has_unapplied());

    ctx.store().allow_writes(settings.location());
    settings.apply().unwrap();
    assert_eq!(ctx.storage().get_int("int32").unwrap(), 7);
}

#[test]
fn test_long_key_name() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    settings.enable_delay();
    settings.set_int(LONG_KEY, 88).unwrap();
    settings.apply().unwrap();

    assert_eq!(ctx.storage().get_int(LONG_KEY).unwrap(), 88);

    let native = value_name(LONG_KEY);
    assert_ne!(native, LONG_KEY);
    assert!(native.chars().count() <= 32);
    assert_eq!(
        ctx.store().get_value(settings.location(), &native).unwrap(),
        Some(NativeValue::Dword(88))
    );
    assert_eq!(ctx.store().get_value(settings.location(), LONG_KEY).unwrap(), None);
}

#[test]
fn test_relocatable_paths_are_independent() {
    let ctx = TestContext::new();
    let lamp = ctx.long_path("/tests/storage/a/maze/of/twisty/little/pathnames/all/different/");
    let pirate = ctx.long_path("/tests/storage/a/maze/of/little/twisty/pathnames/all/different/");

    assert_eq!(marker(&lamp), None);
    set_marker(&lamp, "lamp");
    assert_eq!(marker(&pirate), None);

    set_marker(&pirate, "pirate");
    assert_eq!(marker(&lamp).as_deref(), Some("lamp"));
    assert_eq!(marker(&pirate).as_deref(), Some("pirate"));
}

#[test]
fn test_relocatable_schema_requires_path() {
    let ctx = TestContext::new();
    let err = ctx.instance().settings(LONG_PATH_SCHEMA).unwrap_err();
    assert!(err.is_config_error());

    let err = ctx
        .instance()
        .settings_with_path(LONG_PATH_SCHEMA, "no/leading/slash/")
        .unwrap_err();
    assert!(err.is_parse_error());

    let err = ctx.instance().settings("org.example.missing").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_fixed_path_ignores_requested_path() {
    let ctx = TestContext::new();
    let fixed = ctx.storage();
    let requested = ctx
        .instance()
        .settings_with_path(STORAGE_SCHEMA, "/somewhere/else/")
        .unwrap();
    assert_eq!(requested.location(), fixed.location());
}

#[test]
fn test_unusual_path_segments() {
    let ctx = TestContext::new();
    let odd = ctx.long_path("/tests/storage/back\\slash/100%/");
    assert_eq!(
        odd.location().components().last().map(String::as_str),
        Some("100%25")
    );
    assert!(odd
        .location()
        .components()
        .iter()
        .any(|segment| segment == "back%5Cslash"));
    set_marker(&odd, "odd");
    assert_eq!(marker(&ctx.long_path("/tests/storage/back\\slash/100%/")).as_deref(), Some("odd"));

}

#[test]
fn test_long_path_segments() {
    let ctx = TestContext::new();
    let paths = [
        format!("/tests/{}/", "x".repeat(300)),
        format!("/tests/{}/", "x".repeat(301)),
        format!("/tests/{}/", "\\".repeat(100)),
    ];
    let sessions: Vec<_> = paths.iter().map(|path| ctx.long_path(path)).collect();
    for session in &sessions {
        let last = session.location().components().last().unwrap();
        assert!(last.chars().count() <= 255, "{last} is too long");
    }
    assert_ne!(sessions[0].location(), sessions[1].location());
    assert_ne!(sessions[0].location(), sessions[2].location());

    for (session, text) in sessions.iter().zip(["three hundred", "one more", "slashes"]) {
        set_marker(session, text);
    }
    for (path, text) in paths.iter().zip(["three hundred", "one more", "slashes"]) {
        assert_eq!(marker(&ctx.long_path(path)).as_deref(), Some(text));
    }
}

#[test]
fn test_breakage_falls_back_to_defaults() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let at = settings.location().clone();
    let store = ctx.store();

    settings.set_string("string", "Customised").unwrap();
    assert!(store.delete_value(&at, "string").unwrap());
    assert_eq!(settings.get_string("string").unwrap(), "Hello world");

    store
        .set_value(&at, "int32", NativeValue::String("I am not a number!!".into()))
        .unwrap();
    assert_eq!(settings.get_int("int32").unwrap(), 55);

    store
        .set_value(&at, "box", NativeValue::String("(20, 30".into()))
        .unwrap();
    assert_eq!(
        settings.get("box").unwrap(),
        Variant::tuple([Variant::Int32(20), Variant::Int32(30), Variant::Int32(30)])
    );

    store.set_value(&at, "bool", NativeValue::Dword(7)).unwrap();
    assert!(settings.get_bool("bool").unwrap());

    store.set_value(&at, "qword", NativeValue::Dword(1)).unwrap();
    assert_eq!(settings.get_int64("qword").unwrap(), 4398046511104);

    store
        .set_value(&at, "string", NativeValue::String(String::new()))
        .unwrap();
    assert_eq!(settings.get_string("string").unwrap(), "");

    store
        .set_value(&at, "strv", NativeValue::Binary(vec![0xde, 0xad]))
        .unwrap();
    assert_eq!(settings.get_strv("strv").unwrap(), ["Hello world", "Pipo"]);
}

#[test]
fn test_deleted_tree_reads_defaults() {
    let ctx = TestContext::new();
    let s1 = ctx.long_path("/tests/storage/a/twisty/little/maze/of/pathnames/all/alike/");
    let s2 = ctx.long_path("/tests/storage/a/twisty/little/maze/of/pathnames/all/alike/");

    set_marker(&s1, "lamp");
    assert_eq!(marker(&s2).as_deref(), Some("lamp"));

    let a = s1
        .location()
        .parent()
        .and_then(|l| l.parent())
        .and_then(|l| l.parent())
        .and_then(|l| l.parent())
        .and_then(|l| l.parent())
        .and_then(|l| l.parent())
        .and_then(|l| l.parent())
        .unwrap();
    assert_eq!(a.components().last().map(String::as_str), Some("a"));
    assert!(ctx.store().delete_tree(&a).unwrap());

    assert_eq!(marker(&s2), None);

    // Writing again recreates the path.
    set_marker(&s2, "again");
    assert_eq!(marker(&s1).as_deref(), Some("again"));
}

#[test]
fn test_denied_write_keeps_stored_value() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    settings.set_int("int32", 3).unwrap();

    ctx.store().deny_writes(settings.location());
    let err = settings.set_int("int32", 4).unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(settings.get_int("int32").unwrap(), 3);
}
