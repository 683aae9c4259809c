//! Change notification tests
//!
//! Events for writes made through sessions and directly on the store,
//! watch sharing between sessions, and behaviour at the watch ceiling.

use std::sync::Arc;

use rand::Rng;
use regsettings::{
    InstanceConfig, Variant,
    store::{InMemory, NativeStore, NativeValue},
};

use crate::helpers::*;

#[test]
fn test_session_writes_notify() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let log = ChangeLog::attach(&settings);

    settings.set_string("string", "Notify me").unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["string"]);
    assert_eq!(settings.get_string("string").unwrap(), "Notify me");

    log.clear();
    settings.set_int("int32", 1691).unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["int32"]);

    log.clear();
    settings.set_int64("qword", -778019).unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["qword"]);

    log.clear();
    settings
        .set(
            "box",
            Variant::tuple([Variant::Int32(-1), Variant::Int32(99), Variant::Int32(11111)]),
        )
        .unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["box"]);

    log.clear();
    settings.reset("string").unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["string"]);
    assert_eq!(settings.get_string("string").unwrap(), "Hello world");
}

#[test]
fn test_external_writes_notify() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let log = ChangeLog::attach(&settings);
    let at = settings.location().clone();

    settings.set_string("string", "I'm getting deleted!").unwrap();
    ctx.drain();
    log.clear();

    ctx.store().delete_value(&at, "string").unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["string"]);
    assert_eq!(settings.get_string("string").unwrap(), "Hello world");

    log.clear();
    ctx.store()
        .set_value(&at, "double", NativeValue::String("2.99e8".into()))
        .unwrap();
    ctx.drain();
    assert_eq!(log.keys(), ["double"]);
    assert_eq!(settings.get_double("double").unwrap(), 299000000.0);

    // Rewriting the same value is not a change.
    log.clear();
    ctx.store()
        .set_value(&at, "double", NativeValue::String("2.99e8".into()))
        .unwrap();
    ctx.drain();
    assert!(log.is_empty());
}

#[test]
fn test_batch_reports_every_key_once() {
    let ctx = TestContext::new();
    let writer = ctx.storage();
    let reader = ctx.storage();
    let log = ChangeLog::attach(&reader);

    writer.enable_delay();
    writer.set_int("a-5", 88).unwrap();
    writer.set_string("string", "batched").unwrap();
    writer.set_int("a-5", 89).unwrap();
    ctx.drain();
    assert!(log.is_empty());

    writer.apply().unwrap();
    ctx.drain();
    let mut keys = log.keys();
    keys.sort();
    assert_eq!(keys, ["a-5", "string"]);
}

#[test]
fn test_values_outside_schema_are_ignored() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let log = ChangeLog::attach(&settings);

    ctx.store()
        .set_value(settings.location(), "intruder", NativeValue::String("oh no".into()))
        .unwrap();
    for _ in 0..100 {
        ctx.instance().iterate();
    }
    assert!(log.is_empty());
}

#[test]
fn test_events_wait_for_iteration() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let log = ChangeLog::attach(&settings);

    settings.set_bool("bool", false).unwrap();
    settings.set_bool("bool", true).unwrap();
    settings.set_bool("bool", false).unwrap();
    assert!(log.is_empty());

    // Changes between iterations coalesce.
    assert_eq!(ctx.instance().iterate(), 1);
    assert_eq!(log.keys(), ["bool"]);
    assert_eq!(ctx.instance().iterate(), 0);
}

#[test]
fn test_nested_sessions() {
    let ctx = TestContext::new();
    let s1 = ctx.long_path("/tests/storage/");
    let s2 = ctx.long_path("/tests/storage/nested/");
    let s3 = ctx.long_path("/tests/storage/nested/even/further/");
    let outer = ChangeLog::attach(&s1);
    let middle = ChangeLog::attach(&s2);
    let inner = ChangeLog::attach(&s3);

    set_marker(&s3, "bird");
    ctx.drain();

    let events = outer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "marker");
    assert!(events[0].is_descendant());
    assert_eq!(&events[0].location, s3.location());
    assert_eq!(middle.keys(), ["marker"]);
    assert!(!inner.events()[0].is_descendant());

    // The outer sessions still read their own values.
    assert_eq!(marker(&s1), None);
    assert_eq!(marker(&s2), None);

    ctx.store()
        .set_value(
            s3.location(),
            "marker",
            NativeValue::String("\"tasty food\"".into()),
        )
        .unwrap();
    ctx.drain();
    assert_eq!(marker(&s3).as_deref(), Some("tasty food"));
    assert_eq!(inner.keys(), ["marker", "marker"]);
}

#[test]
fn test_deleting_tree_notifies_every_session_below() {
    let ctx = TestContext::new();
    let s1 = ctx.long_path("/tests/storage/a/twisty/little/maze/of/pathnames/all/alike/");
    let s2 = ctx.long_path("/tests/storage/a/twisty/maze/of/little/pathnames/all/alike/");
    set_marker(&s1, "lamp");
    set_marker(&s2, "pirate");
    ctx.drain();

    let first = ChangeLog::attach(&s1);
    let second = ChangeLog::attach(&s2);

    // Subkeys outside any schema are not changes.
    let base = ctx.storage().location().clone();
    ctx.store().create_path(&base.join("a").join("twisty").join("snake")).unwrap();
    ctx.drain();
    assert!(first.is_empty() && second.is_empty());

    assert!(ctx.store().delete_tree(&base.join("a")).unwrap());
    ctx.drain();
    assert_eq!(first.keys(), ["marker"]);
    assert_eq!(second.keys(), ["marker"]);
    assert_eq!(marker(&s1), None);
    assert_eq!(marker(&s2), None);
}

#[test]
fn test_sessions_on_one_path_share_a_watch() {
    let ctx = TestContext::new();
    let mut rng = rand::thread_rng();

    let sessions: Vec<_> = (0..100).map(|_| ctx.storage()).collect();
    assert_eq!(ctx.instance().watch_count(), 1);
    assert_eq!(ctx.store().watch_count(), 1);

    for i in 0..1000 {
        let writer = rng.gen_range(0..sessions.len());
        sessions[writer].set_int("a-5", i).unwrap();
        let reader = rng.gen_range(0..sessions.len());
        assert_eq!(sessions[reader].get_int("a-5").unwrap(), i);
    }

    let log = ChangeLog::attach(&sessions[42]);
    ctx.drain();
    assert_eq!(log.keys(), ["a-5"]);

    drop(sessions);
    assert_eq!(ctx.instance().watch_count(), 0);
    assert_eq!(ctx.store().watch_count(), 0);
}

#[test]
fn test_watches_up_to_the_ceiling() {
    const NONSENSE: [&str; 10] = [
        "Leeds",
        "London",
        "Manchester",
        "Bristol",
        "Birmingham",
        "Shrewsbury",
        "Swansea",
        "Harrogate",
        "Llanyfyllin",
        "Perth",
    ];

    let ctx = TestContext::new();
    let mut rng = rand::thread_rng();
    let s0 = ctx.storage();
    let sessions: Vec<_> = (0..62)
        .map(|i| ctx.long_path(&format!("/tests/storage/prefix{i}/")))
        .collect();
    assert_eq!(ctx.instance().watch_count(), 63);

    for i in 0..1000 {
        let j = rng.gen_range(0..10);
        set_marker(&sessions[j], NONSENSE[i % 10]);
        assert_eq!(marker(&sessions[j]).as_deref(), Some(NONSENSE[i % 10]));
    }

    // One more attaches to the watched ancestor.
    let extra = ctx.long_path("/tests/storage/prefix62/");
    assert_eq!(ctx.instance().watch_count(), 63);
    let log = ChangeLog::attach(&extra);
    ctx.drain();
    set_marker(&extra, "Aberystwyth");
    ctx.drain();
    assert_eq!(log.keys(), ["marker"]);

    drop(extra);
    drop(sessions);
    drop(s0);
    assert_eq!(ctx.instance().watch_count(), 0);
    assert_eq!(ctx.store().watch_count(), 0);
}

#[test]
fn test_ceiling_folds_into_common_ancestor() {
    let ctx = TestContext::with_config(InstanceConfig::default().with_max_watches(2));
    let a = ctx.long_path("/folded/a/");
    let b = ctx.long_path("/folded/b/");
    assert_eq!(ctx.instance().watch_count(), 2);
    let log_a = ChangeLog::attach(&a);

    // A change seen by the old watch but not yet polled survives the fold.
    set_marker(&a, "before");

    let c = ctx.long_path("/folded/c/");
    let watched = ctx.instance().watched_locations();
    assert_eq!(watched.len(), 1);
    assert!(watched[0].is_ancestor_of(a.location()));
    assert!(watched[0].is_ancestor_of(c.location()));
    assert_eq!(ctx.store().watch_count(), 1);

    ctx.drain();
    assert_eq!(log_a.keys(), ["marker"]);

    let log_b = ChangeLog::attach(&b);
    let log_c = ChangeLog::attach(&c);
    log_a.clear();
    set_marker(&b, "b");
    set_marker(&c, "c");
    ctx.drain();
    assert!(log_a.is_empty());
    assert_eq!(log_b.keys(), ["marker"]);
    assert_eq!(log_c.keys(), ["marker"]);
}

#[test]
fn test_zero_ceiling_refuses_sessions() {
    let ctx = TestContext::with_config(InstanceConfig::default().with_max_watches(0));
    let err = ctx.instance().settings(STORAGE_SCHEMA).unwrap_err();
    assert!(err.is_watch_error());
    assert_eq!(err.module(), "watch");
}

#[test]
fn test_native_watch_limit_falls_back_to_ancestor() {
    let store = Arc::new(InMemory::new().with_watch_limit(1));
    let ctx = TestContext::with_store(store, InstanceConfig::default());
    let outer = ctx.storage();
    let inner = ctx.long_path("/tests/storage/nested/");
    assert_eq!(ctx.store().watch_count(), 1);
    assert_eq!(ctx.instance().watched_locations(), [outer.location().clone()]);

    let log = ChangeLog::attach(&inner);
    set_marker(&inner, "shared");
    ctx.drain();
    assert_eq!(log.keys(), ["marker"]);

    // With no ancestor to share, the watch folds up to the common ancestor.
    let elsewhere = ctx
        .instance()
        .settings_with_path(LONG_PATH_SCHEMA, "/elsewhere/")
        .unwrap();
    assert_eq!(ctx.store().watch_count(), 1);
    assert_eq!(
        ctx.instance().watched_locations(),
        [ctx.instance().base_location().clone()]
    );

    log.clear();
    let log_elsewhere = ChangeLog::attach(&elsewhere);
    set_marker(&elsewhere, "folded");
    set_marker(&inner, "again");
    ctx.drain();
    assert_eq!(log_elsewhere.keys(), ["marker"]);
    assert_eq!(log.keys(), ["marker"]);
}

#[test]
fn test_fold_with_native_limit_equal_to_ceiling() {
    let store = Arc::new(InMemory::new().with_watch_limit(2));
    let ctx = TestContext::with_store(store, InstanceConfig::default().with_max_watches(2));
    let a = ctx.long_path("/folded/a/");
    let b = ctx.long_path("/folded/b/");
    assert_eq!(ctx.store().watch_count(), 2);
    let log_a = ChangeLog::attach(&a);
    set_marker(&a, "before");

    let c = ctx.long_path("/folded/c/");
    let watched = ctx.instance().watched_locations();
    assert_eq!(watched.len(), 1);
    assert!(watched[0].is_ancestor_of(a.location()));
    assert!(watched[0].is_ancestor_of(b.location()));
    assert!(watched[0].is_ancestor_of(c.location()));
    assert_eq!(ctx.store().watch_count(), 1);

    ctx.drain();
    assert_eq!(log_a.keys(), ["marker"]);

    let log_c = ChangeLog::attach(&c);
    set_marker(&c, "c");
    ctx.drain();
    assert_eq!(log_c.keys(), ["marker"]);
}

#[test]
fn test_writes_from_other_threads_are_seen() {
    let ctx = TestContext::new();
    let settings = ctx.storage();
    let log = ChangeLog::attach(&settings);
    let at = settings.location().clone();

    let store = Arc::clone(ctx.store_arc());
    std::thread::spawn(move || {
        store
            .set_value(&at, "int32", NativeValue::Dword(77))
            .expect("Failed to write from thread");
    })
    .join()
    .unwrap();

    assert!(ctx.instance().iterate_until(|| !log.is_empty(), 100));
    assert_eq!(log.keys(), ["int32"]);
    assert_eq!(settings.get_int("int32").unwrap(), 77);
}
