//! # sortdex - Embedded Sorted Multimap Index
//!
//! sortdex is a persistent sorted index supporting multiple values per key,
//! duplicate-aware directional range queries, and transactionally scoped
//! bidirectional cursors. It sits on top of any ordered storage primitive
//! exposed through its store traits; an in-memory reference engine ships in
//! the box.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │      SortedIndex<K, V> (typed)      │
//! ├──────────────────┬──────────────────┤
//! │  Range search    │   IndexStats     │
//! │  (GT/GTE/LT/LTE) │ (exact/estimate) │
//! ├──────────────────┴──────────────────┤
//! │  ResultSet / cursor state machine   │
//! ├─────────────────────────────────────┤
//! │  SortedStore / StoreCursor traits   │
//! ├─────────────────────────────────────┤
//! │ MemEnv / MemStore (or your engine)  │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use sortdex::{MemEnv, SortedIndex, Txn, U64Converter, Utf8Converter};
//!
//! # fn main() -> eyre::Result<()> {
//! let env = Arc::new(MemEnv::new());
//! let index: SortedIndex<u64, String> = SortedIndex::new(
//!     "users_by_id",
//!     env,
//!     Arc::new(U64Converter),
//!     Arc::new(Utf8Converter),
//! );
//! index.open()?;
//!
//! let tx = Txn::autocommit();
//! index.add_entry(&tx, &7, &"alice".to_owned())?;
//! index.add_entry(&tx, &9, &"bob".to_owned())?;
//!
//! let mut above = index.find_gt(&tx, &7)?;
//! assert_eq!(above.next()?, Some("bob".to_owned()));
//! index.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`index`]: the typed index, range search, result sets, statistics
//! - [`store`]: store/cursor traits and the in-memory engine
//! - [`txn`]: explicit transaction context and cursor attachment
//! - [`order`]: pluggable byte comparators
//! - [`convert`]: domain ↔ byte codecs
//!
//! ## Scope
//!
//! Durability, page layout, locking and isolation all belong to the engine
//! behind the store traits. This crate defines the index semantics: the
//! multimap data model, the cursor protocol, the ordered-search algorithm,
//! and cost-aware counting.

pub mod convert;
pub mod index;
pub mod order;
pub mod store;
pub mod txn;

pub use convert::{ByteConverter, BytesConverter, ConverterRef, U64Converter, Utf8Converter};
pub use index::result::ResultSet;
pub use index::stats::{Count, IndexStats};
pub use index::{SortedIndex, STORE_NAME_PREFIX};
pub use order::{ByteOrder, LexicalOrder, OrderRef, ReverseOrder};
pub use store::mem::{MemEnv, MemStore};
pub use store::{Entry, PutStatus, SortedStore, StoreConfig, StoreCursor, StoreEnv};
pub use txn::{CursorSlot, Txn};
