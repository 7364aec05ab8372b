//! B+ tree node and the per-node primitives used by the tree algorithms.
//!
//! A node only ever references other nodes by [`NodeId`]. The tree engine
//! resolves identifiers through its arena, so splitting, borrowing and
//! merging here never touch more than the nodes passed in.

use crate::common::{Error, IndexConfig, Key, NodeId, Result, Rid};

/// Payload that distinguishes leaves from internal nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// `rids[i]` belongs to `keys[i]`; `next` links the leaf chain.
    Leaf {
        rids: Vec<Rid>,
        next: Option<NodeId>,
    },
    /// `children.len() == keys.len() + 1`.
    Internal { children: Vec<NodeId> },
}

/// A tree node as held in memory and stored in one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    keys: Vec<Key>,
    kind: NodeKind,
}

impl Node {
    /// Build a leaf node.
    pub fn leaf(id: NodeId, keys: Vec<Key>, rids: Vec<Rid>, next: Option<NodeId>) -> Self {
        Self {
            id,
            keys,
            kind: NodeKind::Leaf { rids, next },
        }
    }

    /// Build an empty leaf with no successor.
    pub fn empty_leaf(id: NodeId) -> Self {
        Self::leaf(id, Vec::new(), Vec::new(), None)
    }

    /// Build an internal node.
    pub fn internal(id: NodeId, keys: Vec<Key>, children: Vec<NodeId>) -> Self {
        Self {
            id,
            keys,
            kind: NodeKind::Internal { children },
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// RIDs of a leaf; empty for internal nodes.
    pub fn rids(&self) -> &[Rid] {
        match &self.kind {
            NodeKind::Leaf { rids, .. } => rids,
            NodeKind::Internal { .. } => &[],
        }
    }

    /// Children of an internal node; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Internal { children } => children,
        }
    }

    /// Next leaf in key order; always `None` for internal nodes.
    pub fn next_leaf(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Leaf { next, .. } => *next,
            NodeKind::Internal { .. } => None,
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Index of the child to follow for `key`.
    ///
    /// A key equal to a separator routes to the separator's right child.
    #[inline]
    pub fn child_index(&self, key: Key) -> usize {
        self.keys.partition_point(|&sep| sep <= key)
    }

    /// Position of the first key not less than `key`.
    #[inline]
    pub fn lower_bound(&self, key: Key) -> usize {
        self.keys.partition_point(|&k| k < key)
    }

    /// RID stored for `key` in this leaf.
    pub fn find(&self, key: Key) -> Option<Rid> {
        let pos = self.lower_bound(key);
        match self.keys.get(pos) {
            Some(&k) if k == key => self.rids().get(pos).copied(),
            _ => None,
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert a key/RID pair at its lower-bound position.
    ///
    /// An equal key already present is shifted right, not replaced.
    pub fn insert_entry(&mut self, key: Key, rid: Rid) -> Result<()> {
        let pos = self.lower_bound(key);
        let NodeKind::Leaf { rids, .. } = &mut self.kind else {
            return Err(not_a("leaf", self.id));
        };
        self.keys.insert(pos, key);
        rids.insert(pos, rid);
        Ok(())
    }

    /// Insert a separator after child `child_idx`, with `right` as the child
    /// following it.
    ///
    /// `child_idx` is the child that was split, so the separator lands
    /// exactly between the two halves even when keys repeat.
    pub fn insert_child(&mut self, child_idx: usize, separator: Key, right: NodeId) -> Result<()> {
        let NodeKind::Internal { children } = &mut self.kind else {
            return Err(not_a("internal node", self.id));
        };
        if child_idx >= children.len() {
            return Err(Error::corruption(format!(
                "{} has no child at position {child_idx}",
                self.id
            )));
        }
        self.keys.insert(child_idx, separator);
        children.insert(child_idx + 1, right);
        Ok(())
    }

    /// Split an overflowing node, moving its upper part into a new node.
    ///
    /// Returns the separator to insert into the parent together with the new
    /// right sibling.
    ///
    /// - Leaf: keys from `config.leaf_split_index()` on move right; the
    ///   separator is a copy of the new leaf's first key and the new leaf is
    ///   linked into the chain right after `self`.
    /// - Internal: the key at `config.internal_split_index()` moves up and
    ///   is kept by neither half.
    pub fn split(&mut self, config: &IndexConfig, right_id: NodeId) -> (Key, Node) {
        match &mut self.kind {
            NodeKind::Leaf { rids, next } => {
                let at = config.leaf_split_index();
                let right_keys = self.keys.split_off(at);
                let right_rids = rids.split_off(at);
                let right = Node::leaf(right_id, right_keys, right_rids, next.take());
                *next = Some(right_id);
                (right.keys[0], right)
            }
            NodeKind::Internal { children } => {
                let at = config.internal_split_index();
                let right_keys = self.keys.split_off(at + 1);
                let right_children = children.split_off(at + 1);
                let separator = self.keys[at];
                self.keys.truncate(at);
                (separator, Node::internal(right_id, right_keys, right_children))
            }
        }
    }

    // ========================================================================
    // Rebalancing
    //
    // `self` is always the underflowing node. The separator passed in is the
    // parent key between the two siblings; the returned key replaces it.
    // ========================================================================

    /// Move the last entry (or child) of `left` to the front of `self`.
    pub fn borrow_from_left(&mut self, left: &mut Node, separator: Key) -> Result<Key> {
        match (&mut self.kind, &mut left.kind) {
            (NodeKind::Leaf { rids, .. }, NodeKind::Leaf { rids: left_rids, .. }) => {
                let (key, rid) = left
                    .keys
                    .pop()
                    .zip(left_rids.pop())
                    .ok_or_else(|| empty_sibling(left.id))?;
                self.keys.insert(0, key);
                rids.insert(0, rid);
                Ok(key)
            }
            (
                NodeKind::Internal { children },
                NodeKind::Internal {
                    children: left_children,
                },
            ) => {
                let (key, child) = left
                    .keys
                    .pop()
                    .zip(left_children.pop())
                    .ok_or_else(|| empty_sibling(left.id))?;
                self.keys.insert(0, separator);
                children.insert(0, child);
                Ok(key)
            }
            _ => Err(mixed_siblings(self.id, left.id)),
        }
    }

    /// Move the first entry (or child) of `right` to the end of `self`.
    pub fn borrow_from_right(&mut self, right: &mut Node, separator: Key) -> Result<Key> {
        if right.keys.is_empty() {
            return Err(empty_sibling(right.id));
        }
        match (&mut self.kind, &mut right.kind) {
            (NodeKind::Leaf { rids, .. }, NodeKind::Leaf { rids: right_rids, .. }) => {
                self.keys.push(right.keys.remove(0));
                rids.push(right_rids.remove(0));
                right
                    .keys
                    .first()
                    .copied()
                    .ok_or_else(|| empty_sibling(right.id))
            }
            (
                NodeKind::Internal { children },
                NodeKind::Internal {
                    children: right_children,
                },
            ) => {
                self.keys.push(separator);
                children.push(right_children.remove(0));
                Ok(right.keys.remove(0))
            }
            _ => Err(mixed_siblings(self.id, right.id)),
        }
    }

    /// Append every entry of `right` (its right sibling) to `self`.
    ///
    /// Internal nodes pull the parent separator down between the two halves;
    /// leaves take over `right`'s place in the leaf chain.
    pub fn absorb(&mut self, right: Node, separator: Key) -> Result<()> {
        let right_id = right.id;
        match (&mut self.kind, right.kind) {
            (
                NodeKind::Leaf { rids, next },
                NodeKind::Leaf {
                    rids: right_rids,
                    next: right_next,
                },
            ) => {
                self.keys.extend(right.keys);
                rids.extend(right_rids);
                *next = right_next;
                Ok(())
            }
            (
                NodeKind::Internal { children },
                NodeKind::Internal {
                    children: right_children,
                },
            ) => {
                self.keys.push(separator);
                self.keys.extend(right.keys);
                children.extend(right_children);
                Ok(())
            }
            _ => Err(mixed_siblings(self.id, right_id)),
        }
    }

    /// Remove the entry at `pos` from a leaf.
    pub fn remove_entry(&mut self, pos: usize) -> Result<(Key, Rid)> {
        let NodeKind::Leaf { rids, .. } = &mut self.kind else {
            return Err(not_a("leaf", self.id));
        };
        if pos >= self.keys.len() {
            return Err(Error::corruption(format!(
                "{} has no entry at position {pos}",
                self.id
            )));
        }
        Ok((self.keys.remove(pos), rids.remove(pos)))
    }

    /// Remove separator `sep_idx` and the child to its right.
    pub fn remove_separator(&mut self, sep_idx: usize) -> Result<(Key, NodeId)> {
        let NodeKind::Internal { children } = &mut self.kind else {
            return Err(not_a("internal node", self.id));
        };
        if sep_idx >= self.keys.len() {
            return Err(Error::corruption(format!(
                "{} has no separator at position {sep_idx}",
                self.id
            )));
        }
        Ok((self.keys.remove(sep_idx), children.remove(sep_idx + 1)))
    }

    /// Overwrite separator `sep_idx`.
    pub fn set_separator(&mut self, sep_idx: usize, key: Key) -> Result<()> {
        match self.keys.get_mut(sep_idx) {
            Some(slot) => {
                *slot = key;
                Ok(())
            }
            None => Err(Error::corruption(format!(
                "{} has no separator at position {sep_idx}",
                self.id
            ))),
        }
    }
}

fn not_a(what: &str, id: NodeId) -> Error {
    Error::corruption(format!("{id} is not a {what}"))
}

fn empty_sibling(id: NodeId) -> Error {
    Error::corruption(format!("cannot borrow from empty {id}"))
}

fn mixed_siblings(a: NodeId, b: NodeId) -> Error {
    Error::corruption(format!("siblings {a} and {b} are not on the same level"))
}
