//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container
//! - [`NodeHeader`] and the node codec ([`encode_node`] / [`decode_node`])

mod node_page;
#[allow(clippy::module_inception)]
mod page;

pub use node_page::{
    decode_node, encode_node, NodeHeader, CHILD_SIZE, HEADER_SIZE, INTERNAL_CAPACITY, KEY_SIZE,
    LEAF_CAPACITY, RID_SIZE,
};
pub use page::Page;
