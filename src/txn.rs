//! # Transaction Context
//!
//! Every index operation takes an explicit [`Txn`]. The transaction carries
//! no engine state of its own at this layer; its job is cursor lifetime:
//! cursors opened for a result set are *attached* to the transaction, and
//! ending the transaction (commit, abort, or drop) force-closes every
//! attached cursor that the caller forgot to close. The transaction
//! boundary is authoritative, so long-lived result sets cannot leak
//! engine resources past it.
//!
//! ## Null transaction
//!
//! [`Txn::autocommit`] is the "no transaction" context. Cursors opened
//! under it are owned solely by their result set and close when the result
//! set closes or drops; the autocommit handle itself never force-closes
//! anything.
//!
//! ## States
//!
//! ```text
//! ┌────────┐  commit()/abort()/drop  ┌───────┐
//! │ Active │ ──────────────────────> │ Ended │   (attached cursors closed)
//! └────────┘                         └───────┘
//! ```
//!
//! Attaching a cursor to an ended transaction is a usage error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use eyre::{bail, Result};
use parking_lot::Mutex;
use tracing::debug;

use crate::store::StoreCursor;

/// A cursor registered with a transaction. The slot is the single owner of
/// the boxed engine cursor; closing the slot drops the cursor and releases
/// whatever the engine holds for it. Close is idempotent.
pub struct CursorSlot {
    cursor: Mutex<Option<Box<dyn StoreCursor>>>,
}

impl CursorSlot {
    fn new(cursor: Box<dyn StoreCursor>) -> Arc<Self> {
        Arc::new(Self {
            cursor: Mutex::new(Some(cursor)),
        })
    }

    pub fn close(&self) {
        *self.cursor.lock() = None;
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.lock().is_none()
    }

    /// Runs `f` against the live cursor. Fails once the slot has been
    /// closed, whether by the result set or by the transaction.
    pub(crate) fn with<R>(
        &self,
        f: impl FnOnce(&mut dyn StoreCursor) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.cursor.lock();
        match guard.as_mut() {
            Some(cursor) => f(cursor.as_mut()),
            None => bail!("cursor is closed"),
        }
    }
}

enum TxnKind {
    /// No transactional scope; cursor lifetime equals result-set lifetime.
    Null,
    Scoped,
}

/// Explicit transaction context passed into every index operation.
pub struct Txn {
    kind: TxnKind,
    ended: AtomicBool,
    cursors: Mutex<Vec<Weak<CursorSlot>>>,
}

impl Txn {
    /// Begins a transactional scope that force-closes attached cursors when
    /// it ends.
    pub fn begin() -> Self {
        Self {
            kind: TxnKind::Scoped,
            ended: AtomicBool::new(false),
            cursors: Mutex::new(Vec::new()),
        }
    }

    /// The null transaction: per-operation auto-commit semantics.
    pub fn autocommit() -> Self {
        Self {
            kind: TxnKind::Null,
            ended: AtomicBool::new(false),
            cursors: Mutex::new(Vec::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.ended.load(Ordering::Acquire)
    }

    pub fn commit(self) {
        self.end();
    }

    pub fn abort(self) {
        self.end();
    }

    /// Takes ownership of an engine cursor, registering it for force-close
    /// at transaction end.
    pub(crate) fn attach(&self, cursor: Box<dyn StoreCursor>) -> Result<Arc<CursorSlot>> {
        let slot = CursorSlot::new(cursor);
        if let TxnKind::Scoped = self.kind {
            if !self.is_active() {
                bail!("cannot open a cursor under an ended transaction");
            }
            self.cursors.lock().push(Arc::downgrade(&slot));
        }
        Ok(slot)
    }

    fn end(&self) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        if let TxnKind::Null = self.kind {
            return;
        }
        let slots = std::mem::take(&mut *self.cursors.lock());
        let mut forced = 0usize;
        for slot in slots.iter().filter_map(Weak::upgrade) {
            if !slot.is_closed() {
                forced += 1;
                slot.close();
            }
        }
        if forced > 0 {
            debug!(forced, "transaction end force-closed open cursors");
        }
    }
}

impl Drop for Txn {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entry;

    struct NopCursor;

    impl StoreCursor for NopCursor {
        fn first(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn last(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn seek(&mut self, _key: &[u8]) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn seek_range(&mut self, _key: &[u8]) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn seek_pair(&mut self, _key: &[u8], _value: &[u8]) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn next(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn prev(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn next_dup(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn prev_dup(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn next_no_dup(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn prev_no_dup(&mut self) -> Result<Option<Entry>> {
            Ok(None)
        }
        fn delete_current(&mut self) -> Result<()> {
            Ok(())
        }
        fn dup_count(&mut self) -> Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn scoped_end_force_closes_attached_cursors() {
        let tx = Txn::begin();
        let slot = tx.attach(Box::new(NopCursor)).unwrap();
        assert!(!slot.is_closed());
        tx.commit();
        assert!(slot.is_closed());
    }

    #[test]
    fn drop_acts_like_abort() {
        let slot;
        {
            let tx = Txn::begin();
            slot = tx.attach(Box::new(NopCursor)).unwrap();
        }
        assert!(slot.is_closed());
    }

    #[test]
    fn autocommit_never_force_closes() {
        let slot;
        {
            let tx = Txn::autocommit();
            slot = tx.attach(Box::new(NopCursor)).unwrap();
        }
        assert!(!slot.is_closed());
        slot.close();
        slot.close();
        assert!(slot.is_closed());
    }

    #[test]
    fn attach_after_end_is_rejected() {
        let tx = Txn::begin();
        tx.end();
        assert!(tx.attach(Box::new(NopCursor)).is_err());
    }
}
