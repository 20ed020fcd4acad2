//! # Index Operation Tests
//!
//! Covers the point-operation surface: lifecycle, duplicate semantics,
//! fixed-key scans, statistics triage, and transaction-scoped cursor
//! cleanup.

use std::sync::Arc;

use sortdex::{MemEnv, ResultSet, SortedIndex, Txn, U64Converter, Utf8Converter};

fn open_index(name: &str) -> SortedIndex<u64, String> {
    let env = Arc::new(MemEnv::new());
    let index = SortedIndex::new(name, env, Arc::new(U64Converter), Arc::new(Utf8Converter));
    index.open().unwrap();
    index
}

fn s(text: &str) -> String {
    text.to_owned()
}

fn drain_forward(rs: &mut ResultSet<String>) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(v) = rs.next().unwrap() {
        out.push(v);
    }
    out
}

#[test]
fn test_duplicates_iterate_in_value_order() {
    let index = open_index("dups");
    let tx = Txn::autocommit();

    index.add_entry(&tx, &1, &s("c")).unwrap();
    index.add_entry(&tx, &1, &s("a")).unwrap();
    index.add_entry(&tx, &1, &s("b")).unwrap();

    let mut rs = index.find(&tx, &1).unwrap();
    assert_eq!(drain_forward(&mut rs), vec![s("a"), s("b"), s("c")]);

    assert_eq!(index.get(&tx, &1).unwrap(), Some(s("a")));
    assert_eq!(index.find_first(&tx, &1).unwrap(), Some(s("a")));
    assert_eq!(index.find_last(&tx, &1).unwrap(), Some(s("c")));
}

#[test]
fn test_identical_pair_is_stored_once() {
    let index = open_index("set_semantics");
    let tx = Txn::autocommit();

    index.add_entry(&tx, &1, &s("v")).unwrap();
    index.add_entry(&tx, &1, &s("v")).unwrap();
    assert_eq!(index.count_key(&tx, &1).unwrap(), 1);

    index.remove_entry(&tx, &1, &s("v")).unwrap();
    assert_eq!(index.count_key(&tx, &1).unwrap(), 0);
    assert_eq!(index.get(&tx, &1).unwrap(), None);

    // removing what is not there is a silent no-op
    index.remove_entry(&tx, &1, &s("v")).unwrap();
    index.remove_all_entries(&tx, &42).unwrap();
}

#[test]
fn test_remove_all_entries_clears_the_group() {
    let index = open_index("remove_all");
    let tx = Txn::autocommit();

    for v in ["a", "b", "c"] {
        index.add_entry(&tx, &5, &s(v)).unwrap();
    }
    index.add_entry(&tx, &6, &s("keep")).unwrap();

    index.remove_all_entries(&tx, &5).unwrap();
    assert!(index.find(&tx, &5).unwrap().is_empty_set());
    assert_eq!(index.get(&tx, &6).unwrap(), Some(s("keep")));
}

#[test]
fn test_unsorted_duplicates_keep_insertion_order() {
    let env = Arc::new(MemEnv::new());
    let index: SortedIndex<u64, String> = SortedIndex::new(
        "insertion_order",
        env,
        Arc::new(U64Converter),
        Arc::new(Utf8Converter),
    )
    .with_unsorted_duplicates();
    index.open().unwrap();
    let tx = Txn::autocommit();

    index.add_entry(&tx, &1, &s("c")).unwrap();
    index.add_entry(&tx, &1, &s("a")).unwrap();
    index.add_entry(&tx, &1, &s("c")).unwrap();

    let mut rs = index.find(&tx, &1).unwrap();
    assert_eq!(drain_forward(&mut rs), vec![s("c"), s("a")]);
}

#[test]
fn test_empty_result_set_is_valid_not_null() {
    let index = open_index("empty");
    let tx = Txn::autocommit();

    let mut rs = index.find(&tx, &99).unwrap();
    assert!(rs.is_empty_set());
    assert!(!rs.has_next().unwrap());
    assert!(!rs.has_prev().unwrap());
    assert_eq!(rs.next().unwrap(), None);
    assert_eq!(rs.prev().unwrap(), None);
    rs.close();
    rs.close();

    assert!(index.scan_keys(&tx).unwrap().is_empty_set());
    assert!(index.scan_values(&tx).unwrap().is_empty_set());
    assert!(index.find_gt(&tx, &0).unwrap().is_empty_set());
}

#[test]
fn test_scan_keys_visits_each_key_once() {
    let index = open_index("scan_keys");
    let tx = Txn::autocommit();

    index.add_entry(&tx, &1, &s("x")).unwrap();
    index.add_entry(&tx, &1, &s("y")).unwrap();
    index.add_entry(&tx, &2, &s("z")).unwrap();

    let mut keys = index.scan_keys(&tx).unwrap();
    let mut seen = Vec::new();
    while let Some(k) = keys.next().unwrap() {
        seen.push(k);
    }
    assert_eq!(seen, vec![1, 2]);

    // back over the turning point
    assert_eq!(keys.prev().unwrap(), Some(1));
}

#[test]
fn test_scan_values_includes_duplicates() {
    let index = open_index("scan_values");
    let tx = Txn::autocommit();

    index.add_entry(&tx, &1, &s("x")).unwrap();
    index.add_entry(&tx, &1, &s("y")).unwrap();
    index.add_entry(&tx, &2, &s("z")).unwrap();

    let mut values = index.scan_values(&tx).unwrap();
    assert_eq!(drain_forward(&mut values), vec![s("x"), s("y"), s("z")]);
}

#[test]
fn test_prev_before_next_seeks_to_the_end() {
    let index = open_index("fresh_prev");
    let tx = Txn::autocommit();

    for k in [1u64, 2, 3] {
        index.add_entry(&tx, &k, &s(&format!("v{k}"))).unwrap();
    }

    let mut values = index.scan_values(&tx).unwrap();
    assert_eq!(values.prev().unwrap(), Some(s("v3")));
    assert_eq!(values.prev().unwrap(), Some(s("v2")));

    let mut dups = index.find(&tx, &2).unwrap();
    assert_eq!(dups.prev().unwrap(), Some(s("v2")));
}

#[test]
fn test_lifecycle_guards() {
    let env = Arc::new(MemEnv::new());
    let index: SortedIndex<u64, String> = SortedIndex::new(
        "lifecycle",
        env,
        Arc::new(U64Converter),
        Arc::new(Utf8Converter),
    );
    let tx = Txn::autocommit();

    assert!(!index.is_open());
    let err = index.add_entry(&tx, &1, &s("v")).unwrap_err();
    assert!(err.to_string().contains("is not open"), "{err}");

    index.open().unwrap();
    index.open().unwrap();
    index.add_entry(&tx, &1, &s("v")).unwrap();

    index.close();
    index.close();
    assert!(index.get(&tx, &1).is_err());

    // reopening under the same configuration binds the same data
    index.open().unwrap();
    assert_eq!(index.get(&tx, &1).unwrap(), Some(s("v")));
}

#[test]
fn test_statistics_cost_triage() {
    let index = open_index("stats");
    let tx = Txn::autocommit();

    for k in [1u64, 2, 3] {
        index.add_entry(&tx, &k, &s("a")).unwrap();
        index.add_entry(&tx, &k, &s("b")).unwrap();
    }

    let stats = index.stats();

    // less than full-scan cost without estimates is unsatisfiable
    assert!(stats.keys(&tx, 0, false).unwrap().is_none());
    assert!(stats.keys(&tx, 100, false).unwrap().is_none());

    let exact = stats.keys(&tx, u64::MAX, false).unwrap().unwrap();
    assert_eq!(exact.value, 3);
    assert!(!exact.is_estimate);

    let estimate = stats.keys(&tx, 1, true).unwrap().unwrap();
    assert!(estimate.is_estimate);

    let entries = stats.entries(&tx, u64::MAX, false).unwrap().unwrap();
    assert_eq!(entries.value, 6);
    let values = stats.values(&tx, u64::MAX, false).unwrap().unwrap();
    assert_eq!(values.value, 6);

    let of_key = stats.values_of_key(&tx, &2, u64::MAX, false).unwrap().unwrap();
    assert_eq!(of_key.value, 2);
    assert!(!of_key.is_estimate);
    assert!(stats.values_of_key(&tx, &2, 0, true).unwrap().is_none());
    let absent = stats.values_of_key(&tx, &9, 1, false).unwrap().unwrap();
    assert_eq!(absent.value, 0);

    // reverse lookup is not a capability of the forward index
    assert!(stats.keys_with_value(&tx, &s("a"), u64::MAX, false).unwrap().is_none());
}

#[test]
fn test_count_helpers_use_exact_paths() {
    let index = open_index("counts");
    let tx = Txn::autocommit();

    index.add_entry(&tx, &1, &s("a")).unwrap();
    index.add_entry(&tx, &1, &s("b")).unwrap();
    index.add_entry(&tx, &2, &s("c")).unwrap();

    assert_eq!(index.count(&tx).unwrap(), 2);
    assert_eq!(index.count_key(&tx, &1).unwrap(), 2);
    assert_eq!(index.count_key(&tx, &7).unwrap(), 0);
}

#[test]
fn test_transaction_end_force_closes_result_sets() {
    let index = open_index("txn_cleanup");

    {
        let setup = Txn::autocommit();
        for k in [1u64, 2, 3] {
            index.add_entry(&setup, &k, &s("v")).unwrap();
        }
    }

    let tx = Txn::begin();
    let mut rs = index.scan_values(&tx).unwrap();
    assert_eq!(rs.next().unwrap(), Some(s("v")));
    tx.commit();

    // the cursor died with the transaction, not with the result set
    assert!(!rs.has_next().unwrap());
    assert_eq!(rs.next().unwrap(), None);
}

#[test]
fn test_dropping_a_transaction_aborts_and_closes_cursors() {
    let index = open_index("txn_drop");

    {
        let setup = Txn::autocommit();
        index.add_entry(&setup, &1, &s("v")).unwrap();
    }

    let mut rs = {
        let tx = Txn::begin();
        index.scan_values(&tx).unwrap()
        // tx dropped here without commit
    };
    assert!(!rs.has_next().unwrap());
    assert_eq!(rs.next().unwrap(), None);
}
