//! Storage layer - the page store and page formats.
//!
//! This module handles persistent storage:
//! - [`PageStore`] - Low-level file I/O for the metadata page and node pages
//! - [`page`] - Page buffer and node layout

pub mod page;
mod page_store;

pub use page_store::PageStore;
