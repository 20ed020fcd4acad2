//! # Ordered Range Search
//!
//! Implements the four directional range queries over the sorted store by
//! positioning a single cursor and choosing a forward/backward advance pair
//! for the result set. All four start from the same probe: seek the
//! smallest key at or above the boundary.
//!
//! ```text
//! seek_range(k)
//!  ├─ found, upper range (GT/GTE)
//!  │   ├─ strict and landed exactly on k → skip k's whole duplicate group
//!  │   └─ wrap as ascending scan; backward stops at the boundary group
//!  ├─ found, lower range (LT/LTE)
//!  │   ├─ inclusive and landed exactly on k → boundary-group scan
//!  │   └─ otherwise one prev() lands on the true predecessor group;
//!  │      wrap as descending scan
//!  └─ nothing at or above k
//!      ├─ lower range → the whole store is below k: start from last()
//!      └─ upper range → empty result
//! ```
//!
//! Membership at the edges is decided by the key comparator only; a
//! duplicate group is never split across a range boundary. The inclusive
//! lower bound that lands exactly on a stored key needs its own advance
//! pair because the boundary group must still be walkable in both
//! directions with ordinary duplicate steps; only exhausting the group
//! jumps to the neighboring key.

use std::cmp::Ordering;

use eyre::{Result, WrapErr};

use super::result::{Advance, CursorScan, EntryPart, RangeOp, ResultSet};
use super::SortedIndex;
use crate::txn::Txn;

impl<K, V> SortedIndex<K, V> {
    /// Entries with key strictly greater than `key`, ascending.
    pub fn find_gt(&self, tx: &Txn, key: &K) -> Result<ResultSet<V>> {
        self.find_ordered(tx, key, false, false)
    }

    /// Entries with key greater than or equal to `key`, ascending.
    pub fn find_gte(&self, tx: &Txn, key: &K) -> Result<ResultSet<V>> {
        self.find_ordered(tx, key, false, true)
    }

    /// Entries with key strictly less than `key`, descending.
    pub fn find_lt(&self, tx: &Txn, key: &K) -> Result<ResultSet<V>> {
        self.find_ordered(tx, key, true, false)
    }

    /// Entries with key less than or equal to `key`, descending.
    pub fn find_lte(&self, tx: &Txn, key: &K) -> Result<ResultSet<V>> {
        self.find_ordered(tx, key, true, true)
    }

    fn find_ordered(
        &self,
        tx: &Txn,
        key: &K,
        lower_range: bool,
        compare_equals: bool,
    ) -> Result<ResultSet<V>> {
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let op = match (lower_range, compare_equals) {
            (false, false) => RangeOp::Gt,
            (false, true) => RangeOp::Gte,
            (true, false) => RangeOp::Lt,
            (true, true) => RangeOp::Lte,
        };

        let lookup_ctx = || format!("failed to look up index '{}'", self.name);
        let mut cursor = store.open_cursor()?;
        let located = cursor.seek_range(&key_bytes).wrap_err_with(lookup_ctx)?;

        let (start, advance) = match located {
            Some(entry) => {
                let on_key =
                    self.key_order.compare(&key_bytes, &entry.key) == Ordering::Equal;
                if !lower_range {
                    // strict upper bound: leave the boundary key's whole
                    // duplicate group behind
                    let start = if on_key && !compare_equals {
                        cursor.next_no_dup().wrap_err_with(lookup_ctx)?
                    } else {
                        Some(entry)
                    };
                    match start {
                        Some(start) => (
                            start,
                            Advance::RangeAsc {
                                op,
                                key: key_bytes,
                            },
                        ),
                        None => return Ok(ResultSet::empty()),
                    }
                } else if on_key && compare_equals {
                    (
                        entry,
                        Advance::BoundaryGroup {
                            key: key_bytes,
                            in_group: true,
                        },
                    )
                } else {
                    // seek_range found the immediate successor, so a single
                    // prev() lands on the true predecessor group
                    match cursor.prev().wrap_err_with(lookup_ctx)? {
                        Some(start) => (
                            start,
                            Advance::RangeDesc {
                                op,
                                key: key_bytes,
                            },
                        ),
                        None => return Ok(ResultSet::empty()),
                    }
                }
            }
            None if lower_range => {
                // the boundary exceeds every stored key: the range is the
                // whole store, iterated from the physical end
                match cursor.last().wrap_err_with(lookup_ctx)? {
                    Some(start) => (
                        start,
                        Advance::RangeDesc {
                            op,
                            key: key_bytes,
                        },
                    ),
                    None => return Ok(ResultSet::empty()),
                }
            }
            None => return Ok(ResultSet::empty()),
        };

        let slot = tx.attach(cursor)?;
        Ok(ResultSet::Scan(CursorScan::new(
            slot,
            self.key_order.clone(),
            self.value_converter.clone(),
            EntryPart::Value,
            advance,
            start,
        )))
    }
}
