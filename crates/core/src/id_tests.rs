// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId;
}

#[test]
fn define_id_display_and_eq() {
    let id = TestId::new("hello");
    assert_eq!(id.to_string(), "hello");
    assert_eq!(id, "hello");
}

#[test]
fn define_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(TestId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));
}

#[test]
fn define_id_serializes_as_plain_string() {
    let id = TestId::new("abc");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    let back: TestId = serde_json::from_str("\"abc\"").unwrap();
    assert_eq!(back, id);
}

#[test]
fn uuid_gen_produces_distinct_ids() {
    let ids = UuidIdGen;
    let a = ids.next();
    let b = ids.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn sequential_gen_counts_from_one_and_shares_counter_across_clones() {
    let ids = SequentialIdGen::new("t");
    let clone = ids.clone();
    assert_eq!(ids.next(), "t-1");
    assert_eq!(clone.next(), "t-2");
}
