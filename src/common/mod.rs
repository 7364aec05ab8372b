//! Common types and utilities shared across the index.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`IndexConfig`]
//! - Error types
//! - Identifiers (NodeId, Rid) and the [`Key`] type

pub mod config;
pub mod error;
mod node_id;
mod rid;

pub use config::IndexConfig;
pub use error::{Error, Result};
pub use node_id::NodeId;
pub use rid::Rid;

/// Index key: a fixed-width signed integer ordered numerically.
pub type Key = i32;
