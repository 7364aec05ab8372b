//! Index structures.
//!
//! - [`btree`] - Disk-resident B+ tree mapping keys to row identifiers

pub mod btree;
