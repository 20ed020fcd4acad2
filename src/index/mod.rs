//! # Sorted Index
//!
//! The public face of the crate: a named, typed view over one sorted
//! multimap store. The index owns the comparators and converters, opens and
//! closes the store handle, and wraps every lookup in a transaction-scoped
//! result set.
//!
//! ## Shape
//!
//! ```text
//! SortedIndex<K, V>
//! ├── key/value ByteConverter      domain type ↔ raw bytes
//! ├── key/value ByteOrder          total order over the raw bytes
//! └── Arc<dyn SortedStore>         open handle, None while closed
//!     └── StoreCursor              one per scan, attached to the Txn
//! ```
//!
//! An index is created cheaply with configuration only; `open()` binds the
//! physical store, `close()` releases it idempotently, and the index can be
//! reopened later under the same configuration. Every other operation
//! requires the open state and fails with an error naming the index
//! otherwise.
//!
//! Lookups that match nothing return `None` or the empty result set, never
//! an error. Engine failures are wrapped with the index name and the
//! operation before they propagate.

mod search;

pub mod result;
pub mod stats;

use std::sync::Arc;

use eyre::{bail, ensure, Result, WrapErr};
use parking_lot::RwLock;
use tracing::debug;

use crate::convert::ConverterRef;
use crate::order::{LexicalOrder, OrderRef};
use crate::store::{
    group_last, PutStatus, SortedStore, StoreConfig, StoreEnv,
};
use crate::txn::Txn;

use result::{Advance, CursorScan, EntryPart, ResultSet};
use stats::IndexStats;

/// Prefix of the physical store names this crate claims inside an
/// environment.
pub const STORE_NAME_PREFIX: &str = "idx_";

/// A typed sorted multimap index over one physical store.
pub struct SortedIndex<K, V> {
    name: String,
    env: Arc<dyn StoreEnv>,
    pub(crate) key_converter: ConverterRef<K>,
    pub(crate) value_converter: ConverterRef<V>,
    pub(crate) key_order: OrderRef,
    pub(crate) value_order: OrderRef,
    sorted_duplicates: bool,
    store: RwLock<Option<Arc<dyn SortedStore>>>,
}

impl<K, V> SortedIndex<K, V> {
    /// Creates a closed index handle. No store is touched until `open()`.
    /// Defaults: lexicographic key and value order, sorted duplicates.
    pub fn new(
        name: impl Into<String>,
        env: Arc<dyn StoreEnv>,
        key_converter: ConverterRef<K>,
        value_converter: ConverterRef<V>,
    ) -> Self {
        Self {
            name: name.into(),
            env,
            key_converter,
            value_converter,
            key_order: Arc::new(LexicalOrder),
            value_order: Arc::new(LexicalOrder),
            sorted_duplicates: true,
            store: RwLock::new(None),
        }
    }

    pub fn with_key_order(mut self, order: OrderRef) -> Self {
        self.key_order = order;
        self
    }

    pub fn with_value_order(mut self, order: OrderRef) -> Self {
        self.value_order = order;
        self
    }

    /// Keeps duplicate groups in insertion order instead of value order.
    /// `find_last` is implementation-defined physical order in this mode.
    pub fn with_unsorted_duplicates(mut self) -> Self {
        self.sorted_duplicates = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the backing store inside the environment.
    pub fn store_name(&self) -> String {
        format!("{STORE_NAME_PREFIX}{}", self.name)
    }

    pub fn key_order(&self) -> &OrderRef {
        &self.key_order
    }

    pub fn value_order(&self) -> &OrderRef {
        &self.value_order
    }

    pub fn is_open(&self) -> bool {
        self.store.read().is_some()
    }

    /// Binds (or creates) the physical store. A no-op when already open.
    pub fn open(&self) -> Result<()> {
        let mut slot = self.store.write();
        if slot.is_some() {
            return Ok(());
        }
        let config = StoreConfig::new(
            self.key_order.clone(),
            self.value_order.clone(),
            self.sorted_duplicates,
        );
        let store = self
            .env
            .open_store(&self.store_name(), config)
            .wrap_err_with(|| format!("failed to open index '{}'", self.name))?;
        debug!(index = %self.name, "index opened");
        *slot = Some(store);
        Ok(())
    }

    /// Releases the store handle. Idempotent; closing a never-opened index
    /// is a no-op.
    pub fn close(&self) {
        if self.store.write().take().is_some() {
            debug!(index = %self.name, "index closed");
        }
    }

    pub(crate) fn store(&self) -> Result<Arc<dyn SortedStore>> {
        match self.store.read().as_ref() {
            Some(store) => Ok(store.clone()),
            None => bail!("index '{}' is not open", self.name),
        }
    }

    fn check_tx(&self, tx: &Txn) -> Result<()> {
        ensure!(
            tx.is_active(),
            "index '{}': transaction has already ended",
            self.name
        );
        Ok(())
    }

    /// Inserts the pair. Re-adding an identical pair is a silent success;
    /// an index holds set semantics per duplicate group.
    pub fn add_entry(&self, tx: &Txn, key: &K, value: &V) -> Result<()> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let value_bytes = self.value_converter.to_bytes(value);
        match store
            .put_no_overwrite(&key_bytes, &value_bytes)
            .wrap_err_with(|| format!("failed to add entry to index '{}'", self.name))?
        {
            PutStatus::Inserted | PutStatus::KeyValueExists => Ok(()),
        }
    }

    /// Deletes the exact pair if present; silently does nothing otherwise.
    pub fn remove_entry(&self, tx: &Txn, key: &K, value: &V) -> Result<()> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let value_bytes = self.value_converter.to_bytes(value);
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .seek_pair(&key_bytes, &value_bytes)
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        if found.is_some() {
            cursor
                .delete_current()
                .wrap_err_with(|| format!("failed to delete entry from index '{}'", self.name))?;
        }
        Ok(())
    }

    /// Deletes every value stored under `key`. A no-op when the key is
    /// absent.
    pub fn remove_all_entries(&self, tx: &Txn, key: &K) -> Result<()> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        store
            .delete_key(&key_bytes)
            .wrap_err_with(|| format!("failed to delete entry from index '{}'", self.name))?;
        Ok(())
    }

    /// First value in duplicate order for `key`, or `None`.
    pub fn get(&self, tx: &Txn, key: &K) -> Result<Option<V>> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let value = store
            .get(&key_bytes)
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        value
            .map(|raw| self.value_converter.from_bytes(&raw))
            .transpose()
    }

    /// Same result as [`get`](Self::get), realized through a positioned
    /// cursor.
    pub fn find_first(&self, tx: &Txn, key: &K) -> Result<Option<V>> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .seek(&key_bytes)
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        found
            .map(|entry| self.value_converter.from_bytes(&entry.value))
            .transpose()
    }

    /// Greatest value in duplicate order for `key`, or `None`. Only
    /// meaningful with sorted duplicates; with insertion-ordered duplicates
    /// this is whatever the engine stores last.
    pub fn find_last(&self, tx: &Txn, key: &K) -> Result<Option<V>> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .seek(&key_bytes)
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        if found.is_none() {
            return Ok(None);
        }
        let entry = group_last(cursor.as_mut())
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        entry
            .map(|entry| self.value_converter.from_bytes(&entry.value))
            .transpose()
    }

    /// All values under `key` in duplicate order. Empty-but-valid result
    /// set when the key has none.
    pub fn find(&self, tx: &Txn, key: &K) -> Result<ResultSet<V>> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let key_bytes = self.key_converter.to_bytes(key);
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .seek(&key_bytes)
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        match found {
            Some(start) => {
                let slot = tx.attach(cursor)?;
                Ok(ResultSet::Scan(CursorScan::new(
                    slot,
                    self.key_order.clone(),
                    self.value_converter.clone(),
                    EntryPart::Value,
                    Advance::WithinGroup,
                    start,
                )))
            }
            None => Ok(ResultSet::empty()),
        }
    }

    /// Every distinct key, ascending.
    pub fn scan_keys(&self, tx: &Txn) -> Result<ResultSet<K>> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .first()
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        match found {
            Some(start) => {
                let slot = tx.attach(cursor)?;
                Ok(ResultSet::Scan(CursorScan::new(
                    slot,
                    self.key_order.clone(),
                    self.key_converter.clone(),
                    EntryPart::Key,
                    Advance::DistinctKey,
                    start,
                )))
            }
            None => Ok(ResultSet::empty()),
        }
    }

    /// Every stored value in ascending key order, duplicates included.
    pub fn scan_values(&self, tx: &Txn) -> Result<ResultSet<V>> {
        self.check_tx(tx)?;
        let store = self.store()?;
        let mut cursor = store.open_cursor()?;
        let found = cursor
            .first()
            .wrap_err_with(|| format!("failed to look up index '{}'", self.name))?;
        match found {
            Some(start) => {
                let slot = tx.attach(cursor)?;
                Ok(ResultSet::Scan(CursorScan::new(
                    slot,
                    self.key_order.clone(),
                    self.value_converter.clone(),
                    EntryPart::Value,
                    Advance::Record,
                    start,
                )))
            }
            None => Ok(ResultSet::empty()),
        }
    }

    pub fn stats(&self) -> IndexStats<'_, K, V> {
        IndexStats::new(self)
    }

    /// Exact number of distinct keys; pays the full-scan price.
    pub fn count(&self, tx: &Txn) -> Result<u64> {
        match self.stats().keys(tx, u64::MAX, false)? {
            Some(count) => Ok(count.value),
            None => bail!("index '{}': exact key count unavailable", self.name),
        }
    }

    /// Exact number of values stored under `key`.
    pub fn count_key(&self, tx: &Txn, key: &K) -> Result<u64> {
        match self.stats().values_of_key(tx, key, u64::MAX, false)? {
            Some(count) => Ok(count.value),
            None => bail!("index '{}': exact value count unavailable", self.name),
        }
    }
}
