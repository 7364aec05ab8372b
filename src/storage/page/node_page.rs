//! Node page layout and codec.
//!
//! Every node page starts with a fixed header, followed by the key array and
//! then either the RID array (leaf) or the child array (internal).
//!
//! # Layout
//! ```text
//! Offset  Size          Field
//! ------  ----          -----
//! 0       4             node_id
//! 4       1             is_leaf (0 or 1)
//! 5       1             padding
//! 6       2             num_keys
//! 8       4             next_leaf (u32::MAX = none)
//! 12      4 × n         keys (i32)
//! ...     8 × n         leaf: RIDs {page_id: u32, slot_id: u16, padding: 2}
//! ...     4 × (n + 1)   internal: child node ids
//! ```
//! Bytes past the payload are zero and not authoritative: the header's
//! `num_keys` alone decides how much is read back.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, NodeId, Result, Rid};
use crate::index::btree::{Node, NodeKind};

use super::Page;

pub const OFFSET_NODE_ID: usize = 0;
pub const OFFSET_IS_LEAF: usize = 4;
pub const OFFSET_NUM_KEYS: usize = 6;
pub const OFFSET_NEXT_LEAF: usize = 8;

/// Size of the node header in bytes.
pub const HEADER_SIZE: usize = 12;

pub const KEY_SIZE: usize = 4;
pub const RID_SIZE: usize = 8;
pub const CHILD_SIZE: usize = 4;

/// Most keys a leaf page can hold.
pub const LEAF_CAPACITY: usize = (PAGE_SIZE - HEADER_SIZE) / (KEY_SIZE + RID_SIZE);

/// Most keys an internal page can hold (it also stores one extra child).
pub const INTERNAL_CAPACITY: usize =
    (PAGE_SIZE - HEADER_SIZE - CHILD_SIZE) / (KEY_SIZE + CHILD_SIZE);

/// Decoded node header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub node_id: NodeId,
    pub is_leaf: bool,
    pub num_keys: u16,
    pub next_leaf: Option<NodeId>,
}

impl NodeHeader {
    /// Read the header from the start of a page.
    ///
    /// # Errors
    /// Returns `Error::Corruption` if the leaf flag is neither 0 nor 1.
    pub fn read_from(page: &Page) -> Result<Self> {
        let is_leaf = match page.read_u8(OFFSET_IS_LEAF) {
            0 => false,
            1 => true,
            other => {
                return Err(Error::corruption(format!(
                    "invalid leaf flag {other:#04x}"
                )))
            }
        };

        Ok(Self {
            node_id: NodeId::new(page.read_u32(OFFSET_NODE_ID)),
            is_leaf,
            num_keys: page.read_u16(OFFSET_NUM_KEYS),
            next_leaf: NodeId::from_raw(page.read_u32(OFFSET_NEXT_LEAF)),
        })
    }

    /// Write the header to the start of a page.
    pub fn write_to(&self, page: &mut Page) {
        page.write_u32(OFFSET_NODE_ID, self.node_id.0);
        page.write_u8(OFFSET_IS_LEAF, u8::from(self.is_leaf));
        page.write_u8(OFFSET_IS_LEAF + 1, 0);
        page.write_u16(OFFSET_NUM_KEYS, self.num_keys);
        page.write_u32(OFFSET_NEXT_LEAF, NodeId::to_raw(self.next_leaf));
    }

    /// Key capacity of a page holding a node of this kind.
    pub fn capacity(&self) -> usize {
        if self.is_leaf {
            LEAF_CAPACITY
        } else {
            INTERNAL_CAPACITY
        }
    }
}

/// Serialize a node into a zero-padded page.
///
/// # Errors
/// - `Error::NodeOverflow` if the node holds more keys than a page fits
/// - `Error::Corruption` if the payload arrays are inconsistent with the keys
pub fn encode_node(node: &Node) -> Result<Page> {
    let keys = node.keys();
    let capacity = if node.is_leaf() {
        LEAF_CAPACITY
    } else {
        INTERNAL_CAPACITY
    };
    if keys.len() > capacity {
        return Err(Error::NodeOverflow {
            node: node.id(),
            keys: keys.len(),
            capacity,
        });
    }

    let mut page = Page::new();
    let header = NodeHeader {
        node_id: node.id(),
        is_leaf: node.is_leaf(),
        // Bounded by capacity above.
        num_keys: keys.len() as u16,
        next_leaf: node.next_leaf(),
    };
    header.write_to(&mut page);

    let mut offset = HEADER_SIZE;
    for &key in keys {
        page.write_i32(offset, key);
        offset += KEY_SIZE;
    }

    match node.kind() {
        NodeKind::Leaf { rids, .. } => {
            if rids.len() != keys.len() {
                return Err(Error::corruption(format!(
                    "{} has {} keys but {} rids",
                    node.id(),
                    keys.len(),
                    rids.len()
                )));
            }
            for rid in rids {
                page.write_u32(offset, rid.page_id);
                page.write_u16(offset + 4, rid.slot_id);
                offset += RID_SIZE;
            }
        }
        NodeKind::Internal { children } => {
            if children.len() != keys.len() + 1 {
                return Err(Error::corruption(format!(
                    "{} has {} keys but {} children",
                    node.id(),
                    keys.len(),
                    children.len()
                )));
            }
            for child in children {
                page.write_u32(offset, child.0);
                offset += CHILD_SIZE;
            }
        }
    }

    Ok(page)
}

/// Deserialize the node stored in `page`, which was read for `expected`.
///
/// # Errors
/// Returns `Error::Corruption` if the header is invalid, names a different
/// node, or declares more keys than the page can hold.
pub fn decode_node(expected: NodeId, page: &Page) -> Result<Node> {
    let header = NodeHeader::read_from(page)?;
    if header.node_id != expected {
        return Err(Error::corruption(format!(
            "page for {} holds header of {}",
            expected, header.node_id
        )));
    }

    let num_keys = header.num_keys as usize;
    if num_keys > header.capacity() {
        return Err(Error::corruption(format!(
            "{} declares {} keys, page fits {}",
            expected,
            num_keys,
            header.capacity()
        )));
    }

    let mut offset = HEADER_SIZE;
    let keys: Vec<_> = (0..num_keys)
        .map(|i| page.read_i32(offset + i * KEY_SIZE))
        .collect();
    offset += num_keys * KEY_SIZE;

    let node = if header.is_leaf {
        let rids = (0..num_keys)
            .map(|i| {
                let at = offset + i * RID_SIZE;
                Rid::new(page.read_u32(at), page.read_u16(at + 4))
            })
            .collect();
        Node::leaf(expected, keys, rids, header.next_leaf)
    } else {
        let children = (0..=num_keys)
            .map(|i| NodeId::new(page.read_u32(offset + i * CHILD_SIZE)))
            .collect();
        Node::internal(expected, keys, children)
    };

    Ok(node)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_leaf() -> Node {
        Node::leaf(
            NodeId::new(3),
            vec![10, 20, -5],
            vec![Rid::new(1, 2), Rid::new(3, 4), Rid::new(5, 6)],
            Some(NodeId::new(9)),
        )
    }

    #[test]
    fn test_header_byte_layout() {
        let page = encode_node(&sample_leaf()).unwrap();
        let bytes = page.as_slice();

        assert_eq!(&bytes[0..4], &[3, 0, 0, 0]); // node_id
        assert_eq!(bytes[4], 1); // is_leaf
        assert_eq!(bytes[5], 0); // padding
        assert_eq!(&bytes[6..8], &[3, 0]); // num_keys
        assert_eq!(&bytes[8..12], &[9, 0, 0, 0]); // next_leaf
        assert_eq!(&bytes[12..16], &[10, 0, 0, 0]); // keys[0]
        assert_eq!(&bytes[20..24], &[0xFB, 0xFF, 0xFF, 0xFF]); // keys[2] = -5

        // First RID follows the keys.
        assert_eq!(&bytes[24..30], &[1, 0, 0, 0, 2, 0]);
        // Tail is zero.
        assert!(bytes[24 + 3 * RID_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_last_leaf_writes_sentinel() {
        let leaf = Node::leaf(NodeId::new(0), vec![], vec![], None);
        let page = encode_node(&leaf).unwrap();
        assert_eq!(page.read_u32(OFFSET_NEXT_LEAF), u32::MAX);
    }

    #[test]
    fn test_leaf_decode() {
        let leaf = sample_leaf();
        let page = encode_node(&leaf).unwrap();
        assert_eq!(decode_node(NodeId::new(3), &page).unwrap(), leaf);
    }

    #[test]
    fn test_internal_layout_and_decode() {
        let node = Node::internal(
            NodeId::new(7),
            vec![5, 9],
            vec![NodeId::new(1), NodeId::new(2), NodeId::new(4)],
        );
        let page = encode_node(&node).unwrap();

        assert_eq!(page.read_u8(OFFSET_IS_LEAF), 0);
        assert_eq!(page.read_u32(OFFSET_NEXT_LEAF), u32::MAX);
        let children_at = HEADER_SIZE + 2 * KEY_SIZE;
        assert_eq!(page.read_u32(children_at), 1);
        assert_eq!(page.read_u32(children_at + 8), 4);

        assert_eq!(decode_node(NodeId::new(7), &page).unwrap(), node);
    }

    #[test]
    fn test_decode_rejects_mismatched_id() {
        let page = encode_node(&sample_leaf()).unwrap();
        assert!(matches!(
            decode_node(NodeId::new(4), &page),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_flag() {
        let mut page = encode_node(&sample_leaf()).unwrap();
        page.write_u8(OFFSET_IS_LEAF, 7);
        assert!(matches!(
            decode_node(NodeId::new(3), &page),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_key_count() {
        let mut page = encode_node(&sample_leaf()).unwrap();
        page.write_u16(OFFSET_NUM_KEYS, (LEAF_CAPACITY + 1) as u16);
        assert!(matches!(
            decode_node(NodeId::new(3), &page),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_encode_rejects_overflow() {
        let n = LEAF_CAPACITY + 1;
        let keys: Vec<_> = (0..n as i32).collect();
        let rids = vec![Rid::default(); n];
        let leaf = Node::leaf(NodeId::new(1), keys, rids, None);

        match encode_node(&leaf) {
            Err(Error::NodeOverflow { keys, capacity, .. }) => {
                assert_eq!(keys, n);
                assert_eq!(capacity, LEAF_CAPACITY);
            }
            other => panic!("expected NodeOverflow, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_full_pages_fit() {
        let keys: Vec<_> = (0..LEAF_CAPACITY as i32).collect();
        let rids = vec![Rid::new(u32::MAX, u16::MAX); LEAF_CAPACITY];
        let leaf = Node::leaf(NodeId::new(1), keys, rids, None);
        let page = encode_node(&leaf).unwrap();
        assert_eq!(decode_node(NodeId::new(1), &page).unwrap(), leaf);

        let keys: Vec<_> = (0..INTERNAL_CAPACITY as i32).collect();
        let children = (0..=INTERNAL_CAPACITY as u32).map(NodeId::new).collect();
        let node = Node::internal(NodeId::new(2), keys, children);
        let page = encode_node(&node).unwrap();
        assert_eq!(decode_node(NodeId::new(2), &page).unwrap(), node);
    }
}
