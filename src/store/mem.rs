//! # In-Memory Sorted Store
//!
//! The bundled reference engine behind the [`SortedStore`] seam: duplicate
//! groups kept in a comparator-ordered vector behind a `parking_lot`
//! read-write lock. It is the engine the test suite runs against and the
//! default choice for embedding when durability is handled elsewhere.
//!
//! ## Layout
//!
//! ```text
//! MemEnv
//! └── stores: { name → MemStore }
//!     MemStore
//!     └── groups: RwLock<Vec<Group>>          sorted by key order
//!         Group { key, values: Vec<Vec<u8>> } values sorted by value order
//!                                             (or insertion order)
//! ```
//!
//! Lookups binary-search the group vector with the configured key order;
//! inserts shift, which is O(n) on distinct keys. That trade is deliberate:
//! the structure stays obviously correct under pluggable comparators, and
//! workloads that outgrow it belong on a page engine behind the same traits.
//!
//! ## Cursors
//!
//! A [`MemCursor`] holds a `(group, value)` index pair and takes the read
//! lock per call, so cursors never pin the store between steps. Positions
//! are not revalidated against concurrent writers; a cursor is single-owner
//! and isolation between scans and writers is delegated to callers, as with
//! any engine behind the store seam. A step that finds no record leaves the
//! position untouched.

use std::sync::Arc;

use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{Entry, PutStatus, SortedStore, StoreConfig, StoreCursor, StoreEnv};

/// One duplicate group: every value stored under a single key.
#[derive(Debug, Clone)]
struct Group {
    key: Vec<u8>,
    values: Vec<Vec<u8>>,
}

type Groups = Arc<RwLock<Vec<Group>>>;

/// Opens [`MemStore`]s by name. Data lives in the environment, so closing
/// and reopening a store under the same configuration binds the same
/// contents.
#[derive(Default)]
pub struct MemEnv {
    stores: Mutex<HashMap<String, Arc<MemStore>>>,
}

impl MemEnv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreEnv for MemEnv {
    fn open_store(&self, name: &str, config: StoreConfig) -> Result<Arc<dyn SortedStore>> {
        let mut stores = self.stores.lock();
        if let Some(existing) = stores.get(name) {
            ensure!(
                existing.config.sorted_duplicates == config.sorted_duplicates,
                "store '{}' was created with a different duplicate configuration",
                name
            );
            return Ok(existing.clone());
        }
        debug!(store = name, "creating in-memory store");
        let store = Arc::new(MemStore {
            name: name.to_owned(),
            config,
            groups: Arc::new(RwLock::new(Vec::new())),
        });
        stores.insert(name.to_owned(), store.clone());
        Ok(store)
    }
}

pub struct MemStore {
    name: String,
    config: StoreConfig,
    groups: Groups,
}

impl MemStore {
    fn find_group(&self, groups: &[Group], key: &[u8]) -> std::result::Result<usize, usize> {
        groups.binary_search_by(|g| self.config.key_order.compare(&g.key, key))
    }
}

impl SortedStore for MemStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn put_no_overwrite(&self, key: &[u8], value: &[u8]) -> Result<PutStatus> {
        let mut groups = self.groups.write();
        match self.find_group(&groups, key) {
            Ok(gi) => {
                let group = &mut groups[gi];
                if self.config.sorted_duplicates {
                    let order = &self.config.value_order;
                    match group
                        .values
                        .binary_search_by(|v| order.compare(v, value))
                    {
                        Ok(_) => Ok(PutStatus::KeyValueExists),
                        Err(vi) => {
                            group.values.insert(vi, value.to_vec());
                            Ok(PutStatus::Inserted)
                        }
                    }
                } else if group.values.iter().any(|v| v == value) {
                    Ok(PutStatus::KeyValueExists)
                } else {
                    group.values.push(value.to_vec());
                    Ok(PutStatus::Inserted)
                }
            }
            Err(gi) => {
                groups.insert(
                    gi,
                    Group {
                        key: key.to_vec(),
                        values: vec![value.to_vec()],
                    },
                );
                Ok(PutStatus::Inserted)
            }
        }
    }

    fn delete_key(&self, key: &[u8]) -> Result<bool> {
        let mut groups = self.groups.write();
        match self.find_group(&groups, key) {
            Ok(gi) => {
                groups.remove(gi);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let groups = self.groups.read();
        Ok(match self.find_group(&groups, key) {
            Ok(gi) => groups[gi].values.first().cloned(),
            Err(_) => None,
        })
    }

    fn open_cursor(&self) -> Result<Box<dyn StoreCursor>> {
        Ok(Box::new(MemCursor {
            groups: self.groups.clone(),
            config: self.config.clone(),
            pos: None,
        }))
    }

    fn estimate_entries(&self) -> Result<u64> {
        Ok(self.groups.read().len() as u64)
    }
}

/// Cursor position: indices into the group vector and into a group's value
/// vector. `None` means unpositioned; stepping an unpositioned cursor finds
/// nothing.
pub struct MemCursor {
    groups: Groups,
    config: StoreConfig,
    pos: Option<(usize, usize)>,
}

impl MemCursor {
    fn entry_at(groups: &[Group], gi: usize, vi: usize) -> Option<Entry> {
        let group = groups.get(gi)?;
        let value = group.values.get(vi)?;
        Some(Entry::new(group.key.clone(), value.clone()))
    }

    fn land(&mut self, groups: &[Group], gi: usize, vi: usize) -> Option<Entry> {
        let entry = Self::entry_at(groups, gi, vi)?;
        self.pos = Some((gi, vi));
        Some(entry)
    }

    fn find_group(&self, groups: &[Group], key: &[u8]) -> std::result::Result<usize, usize> {
        groups.binary_search_by(|g| self.config.key_order.compare(&g.key, key))
    }
}

impl StoreCursor for MemCursor {
    fn first(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        Ok(self.land(&groups, 0, 0))
    }

    fn last(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        match groups.len().checked_sub(1) {
            Some(gi) => {
                let vi = groups[gi].values.len() - 1;
                Ok(self.land(&groups, gi, vi))
            }
            None => Ok(None),
        }
    }

    fn seek(&mut self, key: &[u8]) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        match self.find_group(&groups, key) {
            Ok(gi) => Ok(self.land(&groups, gi, 0)),
            Err(_) => Ok(None),
        }
    }

    fn seek_range(&mut self, key: &[u8]) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let gi = match self.find_group(&groups, key) {
            Ok(gi) => gi,
            Err(gi) => gi,
        };
        Ok(self.land(&groups, gi, 0))
    }

    fn seek_pair(&mut self, key: &[u8], value: &[u8]) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        match self.find_group(&groups, key) {
            Ok(gi) => match groups[gi].values.iter().position(|v| v == value) {
                Some(vi) => Ok(self.land(&groups, gi, vi)),
                None => Ok(None),
            },
            Err(_) => Ok(None),
        }
    }

    fn next(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, vi)) = self.pos else {
            return Ok(None);
        };
        if let Some(entry) = Self::entry_at(&groups, gi, vi + 1) {
            self.pos = Some((gi, vi + 1));
            return Ok(Some(entry));
        }
        Ok(self.land(&groups, gi + 1, 0))
    }

    fn prev(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, vi)) = self.pos else {
            return Ok(None);
        };
        if vi > 0 {
            return Ok(self.land(&groups, gi, vi - 1));
        }
        match gi.checked_sub(1) {
            Some(pg) => {
                let vi = groups.get(pg).map(|g| g.values.len() - 1).unwrap_or(0);
                Ok(self.land(&groups, pg, vi))
            }
            None => Ok(None),
        }
    }

    fn next_dup(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, vi)) = self.pos else {
            return Ok(None);
        };
        Ok(self.land(&groups, gi, vi + 1))
    }

    fn prev_dup(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, vi)) = self.pos else {
            return Ok(None);
        };
        match vi.checked_sub(1) {
            Some(vi) => Ok(self.land(&groups, gi, vi)),
            None => Ok(None),
        }
    }

    fn next_no_dup(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, _)) = self.pos else {
            return Ok(None);
        };
        Ok(self.land(&groups, gi + 1, 0))
    }

    fn prev_no_dup(&mut self) -> Result<Option<Entry>> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, _)) = self.pos else {
            return Ok(None);
        };
        match gi.checked_sub(1) {
            Some(pg) => {
                let vi = groups.get(pg).map(|g| g.values.len() - 1).unwrap_or(0);
                Ok(self.land(&groups, pg, vi))
            }
            None => Ok(None),
        }
    }

    fn delete_current(&mut self) -> Result<()> {
        let groups = Arc::clone(&self.groups);
        let mut groups = groups.write();
        let Some((gi, vi)) = self.pos.take() else {
            bail!("cursor is not positioned on a record");
        };
        ensure!(
            gi < groups.len() && vi < groups[gi].values.len(),
            "cursor position no longer exists"
        );
        groups[gi].values.remove(vi);
        if groups[gi].values.is_empty() {
            groups.remove(gi);
        }
        Ok(())
    }

    fn dup_count(&mut self) -> Result<u64> {
        let groups = Arc::clone(&self.groups);
        let groups = groups.read();
        let Some((gi, _)) = self.pos else {
            bail!("cursor is not positioned on a record");
        };
        Ok(groups.get(gi).map(|g| g.values.len() as u64).unwrap_or(0))
    }
}
