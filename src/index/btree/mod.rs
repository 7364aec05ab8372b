//! B+ tree index.
//!
//! # Components
//! - [`BPlusTree`] - The tree handle: open, search, insert, remove, scans
//! - [`Node`] / [`NodeKind`] - Leaf and internal nodes
//! - [`NodeArena`] - Resident nodes keyed by [`NodeId`](crate::NodeId)
//! - [`Range`] - Ordered iteration along the leaf chain
//! - [`TreeStats`] - Shape summary
//!
//! Nodes refer to each other only by identifier; the arena resolves them.

mod arena;
mod iter;
mod node;
mod remove;
mod tree;
mod verify;

pub use arena::NodeArena;
pub use iter::Range;
pub use node::{Node, NodeKind};
pub use tree::BPlusTree;
pub use verify::TreeStats;
