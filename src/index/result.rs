//! # Result Sets
//!
//! A result set is a lazy, bidirectional, resumable view over one engine
//! cursor. Three scan shapes share the machinery, differing only in how a
//! step moves the cursor and which half of the entry gets decoded:
//!
//! - whole-index value scan: plain record stepping
//! - distinct-key scan: group-skipping steps, decodes keys
//! - fixed-key scan: steps confined to one duplicate group
//! - ranged scan: direction pair chosen once at construction by the range
//!   search, including the boundary-group special case
//!
//! ## State machine
//!
//! The scan holds an explicit position state instead of reusing the raw
//! cursor as an implicit one:
//!
//! ```text
//!              next(): yield start          step ok
//!   ┌───────┐ ─────────────────────▶ ┌────┐ ──────▶ (stays On)
//!   │ Fresh │                        │ On │
//!   └───────┘ ─────────────────────▶ └────┘ ◀────── prev()/next() recover
//!              prev(): seek scan end   │  │
//!                                      │  └── forward step fails ──▶ DrainedForward
//!                                      └──── backward step fails ──▶ DrainedBackward
//! ```
//!
//! Draining one direction never poisons the other: the cursor keeps its
//! last position, so stepping the opposite way resumes from there. `next`
//! and `prev` use on-element semantics (move, then yield the record moved
//! onto); `has_next`/`has_prev` probe by stepping and caching the peeked
//! record, unwinding it if the caller turns around.
//!
//! The scan remembers the last raw entry it stood on. Compound steps that
//! reposition the cursor in several engine calls use it to restore the
//! position when the reposition dead-ends.
//!
//! [`ResultSet::Empty`] is the zero-row result: a valid set whose probes
//! are always false. Queries return it instead of an option-of-result-set.

use std::cmp::Ordering;
use std::sync::Arc;

use eyre::Result;

use crate::convert::ConverterRef;
use crate::order::OrderRef;
use crate::store::{group_last, Entry};
use crate::txn::CursorSlot;

/// Which half of a stored entry a scan decodes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EntryPart {
    Key,
    Value,
}

/// Range operator; equality is always decided by the key order alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    /// Whether a candidate key with the given ordering relative to the
    /// boundary key lies inside the range.
    fn admits(self, ord: Ordering) -> bool {
        match self {
            Self::Gt => ord == Ordering::Greater,
            Self::Gte => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Lte => ord != Ordering::Greater,
        }
    }
}

/// The advance-strategy pair, fixed when the scan is built.
pub(crate) enum Advance {
    /// Every record, ascending.
    Record,
    /// One position per distinct key.
    DistinctKey,
    /// Records of a single duplicate group.
    WithinGroup,
    /// Ascending range (GT/GTE): forward is unbounded, backward stops at
    /// the boundary key's duplicate group.
    RangeAsc { op: RangeOp, key: Vec<u8> },
    /// Descending range (LT/LTE predecessor case): forward walks down,
    /// backward walks up until the boundary.
    RangeDesc { op: RangeOp, key: Vec<u8> },
    /// Inclusive lower bound sitting exactly on a stored key: the boundary
    /// group is traversed with ordinary duplicate steps, and only group
    /// exhaustion jumps to the neighboring key.
    BoundaryGroup { key: Vec<u8>, in_group: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Fresh,
    On,
    DrainedForward,
    DrainedBackward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Cursor-backed scan. Owns its cursor slot; dropping the scan closes it.
pub struct CursorScan<T> {
    slot: Arc<CursorSlot>,
    key_order: OrderRef,
    convert: ConverterRef<T>,
    part: EntryPart,
    advance: Advance,
    state: ScanState,
    /// Record already stepped onto by a probe but not yet consumed.
    peek: Option<(Direction, Entry)>,
    /// Last raw entry the scan stood on; restore target for compound steps.
    last: Option<Entry>,
}

impl<T> CursorScan<T> {
    pub(crate) fn new(
        slot: Arc<CursorSlot>,
        key_order: OrderRef,
        convert: ConverterRef<T>,
        part: EntryPart,
        advance: Advance,
        start: Entry,
    ) -> Self {
        Self {
            slot,
            key_order,
            convert,
            part,
            advance,
            state: ScanState::Fresh,
            peek: None,
            last: Some(start),
        }
    }

    fn decode(&self, entry: &Entry) -> Result<T> {
        match self.part {
            EntryPart::Key => self.convert.from_bytes(&entry.key),
            EntryPart::Value => self.convert.from_bytes(&entry.value),
        }
    }

    fn step_forward(&mut self) -> Result<Option<Entry>> {
        let slot = &self.slot;
        let advance = &mut self.advance;
        let restore = self.last.clone();
        slot.with(|c| match advance {
            Advance::Record => c.next(),
            Advance::DistinctKey => c.next_no_dup(),
            Advance::WithinGroup => c.next_dup(),
            Advance::RangeAsc { .. } => c.next(),
            Advance::RangeDesc { .. } => c.prev(),
            Advance::BoundaryGroup { key, in_group } => {
                if !*in_group {
                    return c.prev();
                }
                if let Some(entry) = c.next_dup()? {
                    return Ok(Some(entry));
                }
                // boundary group exhausted: jump to the neighboring key below
                if c.seek(key)?.is_some() {
                    if let Some(entry) = c.prev()? {
                        *in_group = false;
                        return Ok(Some(entry));
                    }
                }
                if let Some(last) = &restore {
                    c.seek_pair(&last.key, &last.value)?;
                }
                Ok(None)
            }
        })
    }

    fn step_backward(&mut self) -> Result<Option<Entry>> {
        let slot = &self.slot;
        let advance = &mut self.advance;
        let order = self.key_order.clone();
        slot.with(|c| match advance {
            Advance::Record => c.prev(),
            Advance::DistinctKey => c.prev_no_dup(),
            Advance::WithinGroup => c.prev_dup(),
            Advance::RangeAsc { op, key } => match c.prev()? {
                Some(entry) if op.admits(order.compare(&entry.key, key)) => Ok(Some(entry)),
                Some(_) => {
                    // stepped out of the range: undo and report the edge
                    c.next()?;
                    Ok(None)
                }
                None => Ok(None),
            },
            Advance::RangeDesc { op, key } => match c.next()? {
                Some(entry) if op.admits(order.compare(&entry.key, key)) => Ok(Some(entry)),
                Some(_) => {
                    c.prev()?;
                    Ok(None)
                }
                None => Ok(None),
            },
            Advance::BoundaryGroup { key, in_group } => {
                if *in_group {
                    return c.prev_dup();
                }
                match c.next()? {
                    None => Ok(None),
                    Some(entry) => match order.compare(&entry.key, key) {
                        Ordering::Less => Ok(Some(entry)),
                        Ordering::Equal => {
                            // re-enter the boundary group from below, at its
                            // last record
                            let landed = group_last(c)?;
                            if landed.is_some() {
                                *in_group = true;
                            }
                            Ok(landed)
                        }
                        Ordering::Greater => {
                            c.prev()?;
                            Ok(None)
                        }
                    },
                }
            }
        })
    }

    /// Seeks to the record that full forward iteration of this scan would
    /// reach last. Backs the `prev()`-before-`next()` protocol on a fresh
    /// scan.
    fn reset_to_scan_end(&mut self) -> Result<Option<Entry>> {
        let slot = &self.slot;
        let advance = &mut self.advance;
        let order = self.key_order.clone();
        slot.with(|c| match advance {
            Advance::Record | Advance::DistinctKey | Advance::RangeAsc { .. } => c.last(),
            Advance::RangeDesc { .. } => c.first(),
            Advance::WithinGroup => group_last(c),
            Advance::BoundaryGroup { key, in_group } => match c.first()? {
                None => Ok(None),
                Some(entry) => match order.compare(&entry.key, key) {
                    Ordering::Less => {
                        *in_group = false;
                        Ok(Some(entry))
                    }
                    Ordering::Equal => {
                        // the boundary group is the whole range
                        let landed = group_last(c)?;
                        if landed.is_some() {
                            *in_group = true;
                        }
                        Ok(landed)
                    }
                    Ordering::Greater => Ok(None),
                },
            },
        })
    }

    /// Steps back over a cached probe so the cursor again stands on the
    /// last consumed record.
    fn unwind_peek(&mut self) -> Result<()> {
        if let Some((direction, _)) = self.peek.take() {
            match direction {
                Direction::Forward => self.step_backward()?,
                Direction::Backward => self.step_forward()?,
            };
        }
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool> {
        if self.slot.is_closed() {
            return Ok(false);
        }
        match self.state {
            ScanState::Fresh => Ok(true),
            ScanState::DrainedForward => Ok(false),
            ScanState::On | ScanState::DrainedBackward => {
                if matches!(self.peek, Some((Direction::Forward, _))) {
                    return Ok(true);
                }
                self.unwind_peek()?;
                match self.step_forward()? {
                    Some(entry) => {
                        self.peek = Some((Direction::Forward, entry));
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    pub fn next(&mut self) -> Result<Option<T>> {
        if self.slot.is_closed() {
            return Ok(None);
        }
        match self.state {
            ScanState::Fresh => {
                let Some(start) = self.last.clone() else {
                    return Ok(None);
                };
                self.state = ScanState::On;
                Ok(Some(self.decode(&start)?))
            }
            ScanState::DrainedForward => Ok(None),
            ScanState::On | ScanState::DrainedBackward => {
                if matches!(self.peek, Some((Direction::Forward, _))) {
                    let (_, entry) = self.peek.take().unwrap();
                    self.last = Some(entry.clone());
                    self.state = ScanState::On;
                    return Ok(Some(self.decode(&entry)?));
                }
                self.unwind_peek()?;
                match self.step_forward()? {
                    Some(entry) => {
                        self.last = Some(entry.clone());
                        self.state = ScanState::On;
                        Ok(Some(self.decode(&entry)?))
                    }
                    None => {
                        self.state = ScanState::DrainedForward;
                        Ok(None)
                    }
                }
            }
        }
    }

    pub fn has_prev(&mut self) -> Result<bool> {
        if self.slot.is_closed() {
            return Ok(false);
        }
        match self.state {
            ScanState::Fresh => Ok(true),
            ScanState::DrainedBackward => Ok(false),
            ScanState::On | ScanState::DrainedForward => {
                if matches!(self.peek, Some((Direction::Backward, _))) {
                    return Ok(true);
                }
                self.unwind_peek()?;
                match self.step_backward()? {
                    Some(entry) => {
                        self.peek = Some((Direction::Backward, entry));
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    pub fn prev(&mut self) -> Result<Option<T>> {
        if self.slot.is_closed() {
            return Ok(None);
        }
        match self.state {
            ScanState::Fresh => match self.reset_to_scan_end()? {
                Some(entry) => {
                    self.last = Some(entry.clone());
                    self.state = ScanState::On;
                    Ok(Some(self.decode(&entry)?))
                }
                None => {
                    self.state = ScanState::DrainedBackward;
                    Ok(None)
                }
            },
            ScanState::DrainedBackward => Ok(None),
            ScanState::On | ScanState::DrainedForward => {
                if matches!(self.peek, Some((Direction::Backward, _))) {
                    let (_, entry) = self.peek.take().unwrap();
                    self.last = Some(entry.clone());
                    self.state = ScanState::On;
                    return Ok(Some(self.decode(&entry)?));
                }
                self.unwind_peek()?;
                match self.step_backward()? {
                    Some(entry) => {
                        self.last = Some(entry.clone());
                        self.state = ScanState::On;
                        Ok(Some(self.decode(&entry)?))
                    }
                    None => {
                        self.state = ScanState::DrainedBackward;
                        Ok(None)
                    }
                }
            }
        }
    }

    pub fn close(&mut self) {
        self.peek = None;
        self.slot.close();
    }
}

impl<T> Drop for CursorScan<T> {
    fn drop(&mut self) {
        self.slot.close();
    }
}

/// A query result: either the shared empty set or a live cursor scan.
pub enum ResultSet<T> {
    /// Valid zero-row result; both probes are always false.
    Empty,
    Scan(CursorScan<T>),
}

impl<T> ResultSet<T> {
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn is_empty_set(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn has_next(&mut self) -> Result<bool> {
        match self {
            Self::Empty => Ok(false),
            Self::Scan(scan) => scan.has_next(),
        }
    }

    pub fn next(&mut self) -> Result<Option<T>> {
        match self {
            Self::Empty => Ok(None),
            Self::Scan(scan) => scan.next(),
        }
    }

    pub fn has_prev(&mut self) -> Result<bool> {
        match self {
            Self::Empty => Ok(false),
            Self::Scan(scan) => scan.has_prev(),
        }
    }

    pub fn prev(&mut self) -> Result<Option<T>> {
        match self {
            Self::Empty => Ok(None),
            Self::Scan(scan) => scan.prev(),
        }
    }

    /// Releases the cursor. Safe to call more than once.
    pub fn close(&mut self) {
        if let Self::Scan(scan) = self {
            scan.close();
        }
    }
}
