//! Deletion and rebalancing.
//!
//! After an entry is erased, an underflowing node first tries to borrow
//! from its left sibling, then from its right sibling, and otherwise merges,
//! preferring the left sibling. A merge takes a separator out of the parent,
//! so the parent is examined next; the loop ends at the first level that
//! stays within bounds, or at the root, which collapses into its only child
//! once it runs out of keys.

use tracing::debug;

use crate::common::{Error, Key, NodeId, Result};

use super::tree::PathEntry;
use super::{BPlusTree, Node};

impl BPlusTree {
    /// Remove `key` and its RID.
    ///
    /// Returns `false`, without touching the tree, if the key is absent.
    ///
    /// Removal allocates nothing, so the only failures are page writes. The
    /// in-memory tree is changed before each write, so after an error it may
    /// be ahead of the file; reopen the index to return to the stored state.
    pub fn remove(&mut self, key: Key) -> Result<bool> {
        let (leaf_id, path) = self.descend(key);

        let leaf = &mut self.nodes[leaf_id];
        let pos = leaf.lower_bound(key);
        if leaf.keys().get(pos) != Some(&key) {
            return Ok(false);
        }
        leaf.remove_entry(pos)?;
        self.persist(leaf_id)?;

        self.rebalance(leaf_id, path)?;
        Ok(true)
    }

    fn rebalance(&mut self, mut node_id: NodeId, mut path: Vec<PathEntry>) -> Result<()> {
        let min = self.config.min_keys();

        while let Some(PathEntry {
            node: parent_id,
            child_idx,
        }) = path.pop()
        {
            if self.nodes[node_id].len() >= min {
                return Ok(());
            }

            let siblings = self.nodes[parent_id].children();
            let left = child_idx.checked_sub(1).map(|i| siblings[i]);
            let right = siblings.get(child_idx + 1).copied();

            if let Some(left_id) = left.filter(|&id| self.nodes[id].len() > min) {
                return self.borrow_from_left(left_id, node_id, parent_id, child_idx - 1);
            }
            if let Some(right_id) = right.filter(|&id| self.nodes[id].len() > min) {
                return self.borrow_from_right(node_id, right_id, parent_id, child_idx);
            }

            match (left, right) {
                (Some(left_id), _) => self.merge(left_id, node_id, parent_id, child_idx - 1)?,
                (None, Some(right_id)) => self.merge(node_id, right_id, parent_id, child_idx)?,
                (None, None) => {
                    return Err(Error::corruption(format!(
                        "{parent_id} has a single child"
                    )))
                }
            }
            node_id = parent_id;
        }

        // The path is exhausted: `node_id` is the root.
        self.collapse_root()
    }

    fn borrow_from_left(
        &mut self,
        left_id: NodeId,
        node_id: NodeId,
        parent_id: NodeId,
        sep_idx: usize,
    ) -> Result<()> {
        let separator = self.separator(parent_id, sep_idx)?;

        let mut left = self.take(left_id)?;
        let borrowed = self.nodes[node_id].borrow_from_left(&mut left, separator);
        self.nodes.insert(left);
        let new_separator = borrowed?;

        self.nodes[parent_id].set_separator(sep_idx, new_separator)?;
        debug!(node = %node_id, from = %left_id, new_separator, "borrowed from left sibling");

        self.persist(left_id)?;
        self.persist(node_id)?;
        self.persist(parent_id)
    }

    fn borrow_from_right(
        &mut self,
        node_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        sep_idx: usize,
    ) -> Result<()> {
        let separator = self.separator(parent_id, sep_idx)?;

        let mut right = self.take(right_id)?;
        let borrowed = self.nodes[node_id].borrow_from_right(&mut right, separator);
        self.nodes.insert(right);
        let new_separator = borrowed?;

        self.nodes[parent_id].set_separator(sep_idx, new_separator)?;
        debug!(node = %node_id, from = %right_id, new_separator, "borrowed from right sibling");

        self.persist(right_id)?;
        self.persist(node_id)?;
        self.persist(parent_id)
    }

    /// Fold `right_id` into its left sibling `left_id` and drop it from the
    /// parent. The absorbed node's page is left orphaned.
    fn merge(
        &mut self,
        left_id: NodeId,
        right_id: NodeId,
        parent_id: NodeId,
        sep_idx: usize,
    ) -> Result<()> {
        let (separator, removed) = self.nodes[parent_id].remove_separator(sep_idx)?;
        if removed != right_id {
            return Err(Error::corruption(format!(
                "{parent_id} separator {sep_idx} does not precede {right_id}"
            )));
        }

        let right = self.take(right_id)?;
        self.nodes[left_id].absorb(right, separator)?;
        debug!(into = %left_id, absorbed = %right_id, "merged siblings");

        self.persist(left_id)?;
        self.persist(parent_id)
    }

    /// Replace an internal root that has no keys left by its only child.
    fn collapse_root(&mut self) -> Result<()> {
        let root = &self.nodes[self.root];
        if root.is_leaf() || !root.is_empty() {
            return Ok(());
        }

        let child = root
            .children()
            .first()
            .copied()
            .ok_or_else(|| Error::corruption(format!("{} has no children", self.root)))?;

        let old_root = self.root;
        self.nodes.remove(old_root);
        self.set_root(child)
    }

    fn separator(&self, parent_id: NodeId, sep_idx: usize) -> Result<Key> {
        self.nodes[parent_id]
            .keys()
            .get(sep_idx)
            .copied()
            .ok_or_else(|| {
                Error::corruption(format!("{parent_id} has no separator at {sep_idx}"))
            })
    }

    fn take(&mut self, id: NodeId) -> Result<Node> {
        self.nodes
            .remove(id)
            .ok_or_else(|| Error::corruption(format!("{id} is not resident")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Rid;
    use tempfile::tempdir;

    fn rid(key: Key) -> Rid {
        Rid::new(0, key as u16)
    }

    fn tree_with(order: usize, keys: &[Key]) -> (BPlusTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("t.idx"), order).unwrap();
        for &key in keys {
            tree.insert(key, rid(key)).unwrap();
        }
        (tree, dir)
    }

    fn leaf_keys(tree: &BPlusTree) -> Vec<Vec<Key>> {
        let mut out = Vec::new();
        let mut cursor = Some(tree.first_leaf());
        while let Some(id) = cursor {
            let node = tree.node(id).unwrap();
            out.push(node.keys().to_vec());
            cursor = node.next_leaf();
        }
        out
    }

    fn root_keys(tree: &BPlusTree) -> Vec<Key> {
        tree.node(tree.root_id()).unwrap().keys().to_vec()
    }

    #[test]
    fn test_remove_missing_key() {
        let (mut tree, _dir) = tree_with(3, &[1, 2, 3]);
        assert!(!tree.remove(9).unwrap());
        assert_eq!(leaf_keys(&tree), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_root_leaf_may_empty() {
        let (mut tree, _dir) = tree_with(3, &[1]);
        assert!(tree.remove(1).unwrap());
        assert!(tree.node(tree.root_id()).unwrap().is_leaf());
        assert_eq!(leaf_keys(&tree), vec![Vec::<Key>::new()]);
    }

    #[test]
    fn test_borrow_from_left_leaf() {
        // [0,1,2] | [3,4] under root [3]
        let (mut tree, _dir) = tree_with(3, &[1, 2, 3, 4, 0]);
        tree.remove(3).unwrap();
        tree.remove(4).unwrap();

        assert_eq!(leaf_keys(&tree), vec![vec![0, 1], vec![2]]);
        assert_eq!(root_keys(&tree), vec![2]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_borrow_from_right_leaf() {
        // [1,2] | [3,4,5] under root [3]
        let (mut tree, _dir) = tree_with(3, &[1, 2, 3, 4, 5]);
        tree.remove(1).unwrap();
        tree.remove(2).unwrap();

        assert_eq!(leaf_keys(&tree), vec![vec![3], vec![4, 5]]);
        assert_eq!(root_keys(&tree), vec![4]);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_left_collapses_root() {
        // [1,2] | [3,4] under root [3]
        let (mut tree, _dir) = tree_with(3, &[1, 2, 3, 4]);
        let left_leaf = tree.first_leaf();
        tree.remove(1).unwrap();
        tree.remove(4).unwrap();
        tree.remove(3).unwrap();

        assert_eq!(tree.root_id(), left_leaf);
        assert_eq!(tree.height(), 1);
        assert_eq!(leaf_keys(&tree), vec![vec![2]]);
        assert_eq!(tree.store.read_root_id().unwrap(), Some(left_leaf));
    }

    #[test]
    fn test_merge_right_when_no_left_sibling() {
        // [1,2] | [3,4] under root [3]
        let (mut tree, _dir) = tree_with(3, &[1, 2, 3, 4]);
        let left_leaf = tree.first_leaf();
        tree.remove(4).unwrap();
        tree.remove(1).unwrap();
        tree.remove(2).unwrap();

        // The leftmost leaf survives and absorbs its right sibling.
        assert_eq!(tree.root_id(), left_leaf);
        assert_eq!(leaf_keys(&tree), vec![vec![3]]);
        assert_eq!(tree.node(left_leaf).unwrap().next_leaf(), None);
    }

    #[test]
    fn test_internal_underflow_propagates() {
        let keys: Vec<Key> = (1..=30).collect();
        let (mut tree, _dir) = tree_with(3, &keys);
        let tall = tree.height();
        assert!(tall >= 3);

        for key in (1..=30).rev() {
            assert!(tree.remove(key).unwrap());
            tree.check_invariants().unwrap();
            for remaining in 1..key {
                assert_eq!(tree.search(remaining), Some(rid(remaining)));
            }
        }

        assert_eq!(tree.height(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_merge_orphans_pages() {
        let (mut tree, _dir) = tree_with(3, &[1, 2, 3, 4]);
        let allocated = tree.store.node_count();
        tree.remove(1).unwrap();
        tree.remove(4).unwrap();
        tree.remove(3).unwrap();

        // Merged and collapsed nodes keep their pages.
        assert_eq!(tree.store.node_count(), allocated);
        assert_eq!(tree.nodes.len(), 1);
    }
}
