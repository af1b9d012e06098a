//! Lattice store and merge-behavior tests.

mod common;

use common::*;
use std::collections::HashSet;
use strata::core::error::StrataError;
use strata::lattice::registry::LatticeRegistry;
use strata::lattice::store::LatticeStore;
use strata::lattice::values::{self, CounterValue, OrderedSetValue, SetValue};
use strata::lattice::LatticeType;

// ============================================================================
// Write-once type tags
// ============================================================================

#[test]
fn tag_is_fixed_by_the_first_write() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    store.put("k", LatticeType::Lww, &lww_bytes(1, b"v"), &registry).unwrap();

    let err = store.put("k", LatticeType::Set, &set_bytes(b"x"), &registry).unwrap_err();
    assert!(matches!(err, StrataError::LatticeTypeMismatch { .. }));

    let value = store.get("k").unwrap();
    assert_eq!(value.lattice_type(), LatticeType::Lww);
    assert_eq!(lww_value(value.payload()), b"v");

    store.put("k", LatticeType::Lww, &lww_bytes(2, b"w"), &registry).unwrap();
    assert_eq!(lww_value(store.get("k").unwrap().payload()), b"w");
}

#[test]
fn untyped_puts_are_rejected() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    let err = store.put("k", LatticeType::None, b"raw", &registry).unwrap_err();
    assert!(matches!(err, StrataError::MissingLatticeType { .. }));
    assert!(store.is_empty());
}

#[test]
fn undecodable_payload_is_rejected() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    let err = store.put("k", LatticeType::Lww, b"\x01\x02", &registry).unwrap_err();
    assert!(matches!(err, StrataError::PayloadDecode { .. }));
    assert!(!store.contains("k"));
}

// ============================================================================
// Merge semantics
// ============================================================================

#[test]
fn lww_merge_is_order_insensitive() {
    let registry = LatticeRegistry::standard();
    let mut forward = LatticeStore::new();
    let mut reverse = LatticeStore::new();

    forward.put("k", LatticeType::Lww, &lww_bytes(9, b"new"), &registry).unwrap();
    forward.put("k", LatticeType::Lww, &lww_bytes(3, b"old"), &registry).unwrap();
    reverse.put("k", LatticeType::Lww, &lww_bytes(3, b"old"), &registry).unwrap();
    reverse.put("k", LatticeType::Lww, &lww_bytes(9, b"new"), &registry).unwrap();

    assert_eq!(
        forward.get("k").unwrap().payload(),
        reverse.get("k").unwrap().payload()
    );
    assert_eq!(lww_value(forward.get("k").unwrap().payload()), b"new");
}

#[test]
fn set_union_is_order_insensitive() {
    let registry = LatticeRegistry::standard();
    let mut forward = LatticeStore::new();
    let mut reverse = LatticeStore::new();

    let payloads = [set_bytes(b"a"), set_bytes(b"b"), set_bytes(b"c")];
    for payload in &payloads {
        forward.put("k", LatticeType::Set, payload, &registry).unwrap();
    }
    for payload in payloads.iter().rev() {
        reverse.put("k", LatticeType::Set, payload, &registry).unwrap();
    }

    let elements = |store: &LatticeStore| -> HashSet<Vec<u8>> {
        let set: SetValue =
            values::decode(store.get("k").unwrap().payload(), LatticeType::Set).unwrap();
        set.elements().clone()
    };
    let merged = elements(&forward);
    assert_eq!(merged, elements(&reverse));
    assert_eq!(merged.len(), 3);
    assert!(merged.contains(b"a".as_slice()));
}

#[test]
fn ordered_set_iterates_sorted() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    for name in ["pear", "apple", "mango"] {
        let payload = values::encode(
            &OrderedSetValue::singleton(name.as_bytes().to_vec()),
            LatticeType::OrderedSet,
        )
        .unwrap();
        store.put("k", LatticeType::OrderedSet, &payload, &registry).unwrap();
    }

    let value: OrderedSetValue =
        values::decode(store.get("k").unwrap().payload(), LatticeType::OrderedSet).unwrap();
    let ordered: Vec<Vec<u8>> = value.elements().iter().cloned().collect();
    assert_eq!(
        ordered,
        vec![b"apple".to_vec(), b"mango".to_vec(), b"pear".to_vec()]
    );
}

#[test]
fn counter_accumulates_across_writers() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    let mut first = CounterValue::new();
    first.record("w1", 5);
    let mut second = CounterValue::new();
    second.record("w2", 3);
    let mut stale = CounterValue::new();
    stale.record("w1", 4);

    for value in [&first, &second, &stale] {
        let payload = values::encode(value, LatticeType::Counter).unwrap();
        store.put("c", LatticeType::Counter, &payload, &registry).unwrap();
    }

    let merged: CounterValue =
        values::decode(store.get("c").unwrap().payload(), LatticeType::Counter).unwrap();
    assert_eq!(merged.count_for("w1"), 5, "a writer's count never regresses");
    assert_eq!(merged.count_for("w2"), 3);
    assert_eq!(merged.total(), 8);
}

// ============================================================================
// Changeset bookkeeping
// ============================================================================

#[test]
fn changeset_tracks_merged_writes_only() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    store.put("a", LatticeType::Lww, &lww_bytes(1, b"v"), &registry).unwrap();
    let dirty = store.take_changeset();
    assert_eq!(dirty.len(), 1);
    assert!(dirty.contains("a"));
    assert!(store.take_changeset().is_empty());

    store.put("a", LatticeType::Set, &set_bytes(b"x"), &registry).unwrap_err();
    assert!(store.take_changeset().is_empty(), "rejected puts leave no dirt");

    store.put("a", LatticeType::Lww, &lww_bytes(1, b"v"), &registry).unwrap();
    assert!(store.take_changeset().is_empty(), "absorbed puts leave no dirt");

    store.mark_dirty("a");
    assert!(store.take_changeset().contains("a"));
}

#[test]
fn clear_resets_entries_and_dirt() {
    let registry = LatticeRegistry::standard();
    let mut store = LatticeStore::new();

    store.put("a", LatticeType::Lww, &lww_bytes(1, b"v"), &registry).unwrap();
    store.put("b", LatticeType::Set, &set_bytes(b"x"), &registry).unwrap();
    let stored =
        store.get("a").unwrap().payload().len() + store.get("b").unwrap().payload().len();
    assert_eq!(store.payload_bytes(), stored);

    assert_eq!(store.clear(), 2);
    assert!(store.is_empty());
    assert_eq!(store.payload_bytes(), 0);
    assert!(store.take_changeset().is_empty());
}
