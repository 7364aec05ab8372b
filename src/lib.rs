//! rowindex - the indexing core of a small row-store database.
//!
//! A disk-resident B+ tree maps `i32` keys to row identifiers ([`Rid`]s)
//! owned by an external row store. It supports point lookup, inclusive range
//! scans, insertion with node splitting and deletion with sibling borrowing
//! and merging.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           rowindex                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Tree Engine (index/btree)                   │   │
//! │  │   search · insert/split · remove/borrow/merge · range    │   │
//! │  │          NodeArena: every reachable node resident        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓ changed nodes, root pointer      │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Page Store (storage/)                       │   │
//! │  │    PageStore + Page + node codec (4KB fixed pages)       │   │
//! │  │    page 0: root pointer · page n+1: node n               │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (NodeId, Rid, Key, Error, config)
//! - [`storage`] - File I/O and page formats
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```no_run
//! use rowindex::{BPlusTree, Rid};
//!
//! let mut index = BPlusTree::open("people.idx", 4).unwrap();
//! for id in 1..=50 {
//!     index.insert(id, Rid::new(0, id as u16)).unwrap();
//! }
//!
//! assert_eq!(index.search(7), Some(Rid::new(0, 7)));
//! assert_eq!(index.range_scan(10, 12).len(), 3);
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, IndexConfig, Key, NodeId, Result, Rid};

pub use index::btree::{BPlusTree, Node, NodeKind, Range, TreeStats};
pub use storage::PageStore;
