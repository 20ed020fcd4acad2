//! # Sorted Store Abstraction
//!
//! The seam between the index layer and whatever ordered storage primitive
//! backs it. The index only ever talks to these traits; the bundled
//! [`mem`] engine implements them over an in-memory ordered map, and a
//! B-tree or LSM engine can be slotted in behind the same surface.
//!
//! ## Record model
//!
//! A store is a sorted multimap of raw byte entries. Entries sharing a key
//! form a *duplicate group*; groups are ordered by the key comparator and,
//! when duplicate sorting is enabled, values inside a group are ordered by
//! the value comparator. The record space is totally ordered:
//!
//! ```text
//! (k1,v1) (k1,v2) | (k2,v1) | (k3,v1) (k3,v2) (k3,v3)
//!  \_ group k1 _/  \_ k2 _/  \______ group k3 ______/
//! ```
//!
//! ## Cursor contract
//!
//! A [`StoreCursor`] is a mutable position in that record space, owned by
//! exactly one scan at a time. Every positioning or stepping call returns
//! the entry it landed on, or `None` when no such record exists. A call
//! that returns `None` leaves the position unchanged; callers rely on this
//! to probe a boundary and continue in the opposite direction afterwards.
//!
//! `seek_pair` positions on an exact key/value pair. It exists for
//! exact-pair deletion and for restoring a position from a remembered raw
//! entry after a compound repositioning fails halfway.
//!
//! ## Thread model
//!
//! Stores are shared (`Send + Sync`); cursors are single-owner and must not
//! be shared between threads. Isolation between concurrent cursors and
//! writers is the engine's concern, not the index layer's.

pub mod mem;

use std::sync::Arc;

use eyre::Result;

use crate::order::OrderRef;

/// One stored key/value record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

/// Outcome of a no-overwrite insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    Inserted,
    /// The exact key/value pair was already present. Callers treat this as
    /// success; an index stores set semantics per duplicate group.
    KeyValueExists,
}

/// Per-store configuration fixed at open time. Reopening a store must use
/// the same configuration it was first opened with.
#[derive(Clone)]
pub struct StoreConfig {
    pub key_order: OrderRef,
    pub value_order: OrderRef,
    /// When false, values inside a duplicate group keep insertion order and
    /// only exact-pair uniqueness is enforced.
    pub sorted_duplicates: bool,
}

impl StoreConfig {
    pub fn new(key_order: OrderRef, value_order: OrderRef, sorted_duplicates: bool) -> Self {
        Self {
            key_order,
            value_order,
            sorted_duplicates,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_order: Arc::new(crate::order::LexicalOrder),
            value_order: Arc::new(crate::order::LexicalOrder),
            sorted_duplicates: true,
        }
    }
}

/// Opens named stores. The environment owns the physical data; dropping a
/// store handle releases nothing, and reopening by name binds the same data.
pub trait StoreEnv: Send + Sync {
    fn open_store(&self, name: &str, config: StoreConfig) -> Result<Arc<dyn SortedStore>>;
}

/// An open handle over one sorted multimap.
pub trait SortedStore: Send + Sync {
    fn name(&self) -> &str;

    /// Inserts unless the exact pair is already present.
    fn put_no_overwrite(&self, key: &[u8], value: &[u8]) -> Result<PutStatus>;

    /// Deletes the whole duplicate group of `key`. Returns whether the key
    /// was present.
    fn delete_key(&self, key: &[u8]) -> Result<bool>;

    /// Returns the first value in duplicate order for `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn open_cursor(&self) -> Result<Box<dyn StoreCursor>>;

    /// Structurally derived size estimate (distinct-key count for the
    /// bundled engine, leaf count for a page engine). Cheap; never a scan.
    fn estimate_entries(&self) -> Result<u64>;
}

/// Mutable position in a store's record space. See the module docs for the
/// no-move-on-failure contract.
pub trait StoreCursor: Send {
    fn first(&mut self) -> Result<Option<Entry>>;
    fn last(&mut self) -> Result<Option<Entry>>;

    /// Positions on the first duplicate of exactly `key`.
    fn seek(&mut self, key: &[u8]) -> Result<Option<Entry>>;

    /// Positions on the smallest key greater than or equal to `key`.
    fn seek_range(&mut self, key: &[u8]) -> Result<Option<Entry>>;

    /// Positions on the exact `key`/`value` pair (byte equality on the value).
    fn seek_pair(&mut self, key: &[u8], value: &[u8]) -> Result<Option<Entry>>;

    fn next(&mut self) -> Result<Option<Entry>>;
    fn prev(&mut self) -> Result<Option<Entry>>;

    /// Next record within the current duplicate group.
    fn next_dup(&mut self) -> Result<Option<Entry>>;
    /// Previous record within the current duplicate group.
    fn prev_dup(&mut self) -> Result<Option<Entry>>;

    /// First record of the next distinct key.
    fn next_no_dup(&mut self) -> Result<Option<Entry>>;
    /// Last record of the previous distinct key.
    fn prev_no_dup(&mut self) -> Result<Option<Entry>>;

    /// Deletes the record at the current position. The position is
    /// unpositioned afterwards.
    fn delete_current(&mut self) -> Result<()>;

    /// Number of records in the current position's duplicate group.
    fn dup_count(&mut self) -> Result<u64>;
}

/// Steps a positioned cursor to the last record of its current duplicate
/// group: hop to the next distinct key and back, or to the store's last
/// record when the group is the final one.
pub(crate) fn group_last(cursor: &mut dyn StoreCursor) -> Result<Option<Entry>> {
    if cursor.next_no_dup()?.is_some() {
        cursor.prev()
    } else {
        cursor.last()
    }
}
