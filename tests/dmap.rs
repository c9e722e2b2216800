//! `DMap`'s operations, exercised directly without any `Task`/`Rules` machinery.

use fetchbase::{DMap, Key, Query};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Num(i64);
impl Query for Num {
    type Value = i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Name(&'static str);
impl Query for Name {
    type Value = String;
}

#[test]
fn insert_lookup_remove_roundtrip() {
    let mut map = DMap::new();
    assert!(map.is_empty());

    assert_eq!(map.insert(Num(1), 100), None);
    assert_eq!(map.insert(Num(1), 200), Some(100));
    assert_eq!(map.lookup(&Num(1)), Some(200));
    assert_eq!(map.lookup(&Num(2)), None);
    assert_eq!(map.len(), 1);

    assert_eq!(map.remove(&Num(1)), Some(200));
    assert_eq!(map.remove(&Num(1)), None);
    assert!(map.is_empty());
}

#[test]
fn alter_lookup_inserts_updates_and_removes_in_one_step() {
    let mut map = DMap::new();

    let observed = map.alter_lookup(&Num(7), |old| {
        assert_eq!(old, None);
        Some(42)
    });
    assert_eq!(observed, None);
    assert_eq!(map.lookup(&Num(7)), Some(42));

    let observed = map.alter_lookup(&Num(7), |old| {
        assert_eq!(old, Some(42));
        Some(old.unwrap() + 1)
    });
    assert_eq!(observed, Some(42));
    assert_eq!(map.lookup(&Num(7)), Some(43));

    let observed = map.alter_lookup(&Num(7), |_| None);
    assert_eq!(observed, Some(43));
    assert!(map.lookup(&Num(7)).is_none());
    assert!(map.is_empty());
}

#[test]
fn to_list_reports_every_stored_entry_erased() {
    let mut map = DMap::new();
    map.insert(Num(3), 9);
    map.insert(Name("pi"), "3.14".to_string());

    let mut entries: Vec<(String, String)> = map
        .to_list()
        .into_iter()
        .map(|(key, value)| (format!("{key:?}"), debug_erased(key, value)))
        .collect();
    entries.sort();

    let rendered = format!("{entries:?}");
    expect_test::expect![[r#"[("Name(\"pi\")", "\"3.14\""), ("Num(3)", "9")]"#]]
        .assert_eq(&rendered);
}

fn debug_erased(key: &Key, value: &(dyn std::any::Any + Send + Sync)) -> String {
    if key.downcast::<Num>().is_some() {
        return format!("{:?}", value.downcast_ref::<i64>().expect("Num stores i64"));
    }
    if key.downcast::<Name>().is_some() {
        return format!(
            "{:?}",
            value.downcast_ref::<String>().expect("Name stores String")
        );
    }
    unreachable!("no other query type was inserted")
}
