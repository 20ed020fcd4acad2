//! # Cost-Aware Index Statistics
//!
//! Counting queries with an explicit price tag. The caller states how much
//! work it is willing to pay for (`cost`) and whether an engine estimate is
//! acceptable; the query answers exactly, answers approximately, or
//! declines with `None`. Declining is an answer, not an error.
//!
//! | cost            | estimate ok | whole-index answer            |
//! |-----------------|-------------|-------------------------------|
//! | `u64::MAX`      | any         | exact, O(n) full scan         |
//! | `< u64::MAX`    | false       | declined (unsatisfiable ask)  |
//! | `< u64::MAX`    | true        | structural estimate, flagged  |
//!
//! Per-key value counts cost one positioned seek plus the engine's
//! duplicate count, so only a zero cost budget declines them; the answer is
//! always exact. Reverse lookup (`keys_with_value`) is a capability of
//! secondary-index variants; the plain forward index declines it
//! unconditionally.

use eyre::{Result, WrapErr};
use tracing::trace;

use super::SortedIndex;
use crate::txn::Txn;

/// Outcome of a statistics query that was not declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count {
    pub value: u64,
    /// True when the value is a structural estimate rather than a scan.
    pub is_estimate: bool,
}

impl Count {
    pub fn exact(value: u64) -> Self {
        Self {
            value,
            is_estimate: false,
        }
    }

    pub fn estimated(value: u64) -> Self {
        Self {
            value,
            is_estimate: true,
        }
    }
}

/// Statistics view over one open index.
pub struct IndexStats<'a, K, V> {
    index: &'a SortedIndex<K, V>,
}

impl<'a, K, V> IndexStats<'a, K, V> {
    pub(crate) fn new(index: &'a SortedIndex<K, V>) -> Self {
        Self { index }
    }

    /// Total number of stored entries, duplicates included.
    pub fn entries(&self, tx: &Txn, cost: u64, is_estimate_ok: bool) -> Result<Option<Count>> {
        self.whole_index(tx, cost, is_estimate_ok, WholeIndexScan::Values)
    }

    /// Number of distinct keys.
    pub fn keys(&self, tx: &Txn, cost: u64, is_estimate_ok: bool) -> Result<Option<Count>> {
        self.whole_index(tx, cost, is_estimate_ok, WholeIndexScan::Keys)
    }

    /// Total number of stored values, duplicates included.
    pub fn values(&self, tx: &Txn, cost: u64, is_estimate_ok: bool) -> Result<Option<Count>> {
        self.whole_index(tx, cost, is_estimate_ok, WholeIndexScan::Values)
    }

    /// Number of values under one key. Always exact; only a zero cost
    /// budget declines.
    pub fn values_of_key(
        &self,
        tx: &Txn,
        key: &K,
        cost: u64,
        _is_estimate_ok: bool,
    ) -> Result<Option<Count>> {
        let store = self.index.store()?;
        if cost == 0 {
            return Ok(None);
        }
        self.index.check_tx(tx)?;
        let key_bytes = self.index.key_converter.to_bytes(key);
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .seek(&key_bytes)
            .wrap_err_with(|| format!("failed to look up index '{}'", self.index.name()))?;
        let value = match found {
            Some(_) => cursor
                .dup_count()
                .wrap_err_with(|| format!("failed to look up index '{}'", self.index.name()))?,
            None => 0,
        };
        Ok(Some(Count::exact(value)))
    }

    /// Number of keys holding one value. Reverse lookup is not a capability
    /// of the plain forward index, so this always declines.
    pub fn keys_with_value(
        &self,
        _tx: &Txn,
        _value: &V,
        _cost: u64,
        _is_estimate_ok: bool,
    ) -> Result<Option<Count>> {
        self.index.store()?;
        Ok(None)
    }

    fn whole_index(
        &self,
        tx: &Txn,
        cost: u64,
        is_estimate_ok: bool,
        scan: WholeIndexScan,
    ) -> Result<Option<Count>> {
        let store = self.index.store()?;
        if cost < u64::MAX && !is_estimate_ok {
            trace!(index = %self.index.name(), cost, "statistics query declined");
            return Ok(None);
        }
        if cost == u64::MAX {
            self.index.check_tx(tx)?;
            let mut count = 0u64;
            match scan {
                WholeIndexScan::Keys => {
                    let mut keys = self.index.scan_keys(tx)?;
                    while keys.next()?.is_some() {
                        count += 1;
                    }
                }
                WholeIndexScan::Values => {
                    let mut values = self.index.scan_values(tx)?;
                    while values.next()?.is_some() {
                        count += 1;
                    }
                }
            }
            return Ok(Some(Count::exact(count)));
        }
        let estimate = store
            .estimate_entries()
            .wrap_err_with(|| format!("failed to look up index '{}'", self.index.name()))?;
        Ok(Some(Count::estimated(estimate)))
    }
}

enum WholeIndexScan {
    Keys,
    Values,
}
