//! Node identifier type.

use std::fmt;

/// Identifies a tree node, and through it the page holding the node.
///
/// Identifiers are handed out once by the page store and never reused:
/// node `n` always lives in page `n + 1`, because page 0 holds the
/// metadata (the root pointer).
///
/// # Example
/// ```
/// use rowindex::NodeId;
///
/// let node_id = NodeId::new(7);
/// assert!(node_id.is_valid());
/// assert_eq!(node_id.page_index(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Invalid/sentinel node ID.
    ///
    /// Stored on disk as "no root yet" and "no next leaf".
    pub const INVALID: NodeId = NodeId(u32::MAX);

    /// Create a new NodeId.
    #[inline]
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Check if this node ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Index of the page holding this node.
    #[inline]
    pub fn page_index(&self) -> u64 {
        self.0 as u64 + 1
    }

    /// Decode an on-disk identifier, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        let id = NodeId(raw);
        id.is_valid().then_some(id)
    }

    /// Encode an optional identifier, mapping `None` to the sentinel.
    #[inline]
    pub fn to_raw(id: Option<NodeId>) -> u32 {
        id.unwrap_or(Self::INVALID).0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Node(INVALID)")
        } else {
            write!(f, "Node({})", self.0)
        }
    }
}
