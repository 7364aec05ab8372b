//! Ordered iteration over the leaf chain.

use std::iter::FusedIterator;

use crate::common::{Key, NodeId, Rid};

use super::{BPlusTree, NodeArena};

/// Iterator over the entries with keys in `[low, high]`, in key order.
///
/// Created by [`BPlusTree::range`] and [`BPlusTree::iter`]. It descends the
/// tree once to find the starting leaf and then follows the leaf chain.
pub struct Range<'a> {
    nodes: &'a NodeArena,
    leaf: Option<NodeId>,
    pos: usize,
    high: Key,
}

impl Iterator for Range<'_> {
    type Item = (Key, Rid);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = &self.nodes[self.leaf?];
            if let Some(&key) = node.keys().get(self.pos) {
                if key > self.high {
                    self.leaf = None;
                    return None;
                }
                let rid = node.rids()[self.pos];
                self.pos += 1;
                return Some((key, rid));
            }
            self.leaf = node.next_leaf();
            self.pos = 0;
        }
    }
}

impl FusedIterator for Range<'_> {}

impl BPlusTree {
    /// Iterate over the entries with keys in `[low, high]` (both inclusive).
    ///
    /// Yields nothing if `low > high`.
    pub fn range(&self, low: Key, high: Key) -> Range<'_> {
        let leaf = self.leaf_for(low);
        Range {
            nodes: &self.nodes,
            leaf: (low <= high).then_some(leaf),
            pos: self.nodes[leaf].lower_bound(low),
            high,
        }
    }

    /// RIDs of every key in `[low, high]`, ordered by key.
    pub fn range_scan(&self, low: Key, high: Key) -> Vec<Rid> {
        self.range(low, high).map(|(_, rid)| rid).collect()
    }

    /// Iterate over every entry in key order.
    pub fn iter(&self) -> Range<'_> {
        Range {
            nodes: &self.nodes,
            leaf: Some(self.first_leaf()),
            pos: 0,
            high: Key::MAX,
        }
    }

    /// Number of entries, counted along the leaf chain.
    pub fn len(&self) -> usize {
        self.leaves().map(|id| self.nodes[id].len()).sum()
    }

    /// Whether the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root].is_leaf() && self.nodes[self.root].is_empty()
    }

    /// Leaf ids in chain order, starting at the leftmost leaf.
    pub(super) fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(self.first_leaf()), |&id| self.nodes[id].next_leaf())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn tree_with(order: usize, keys: &[Key]) -> (BPlusTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("t.idx"), order).unwrap();
        for &key in keys {
            tree.insert(key, Rid::new(1, key as u16)).unwrap();
        }
        (tree, dir)
    }

    #[test]
    fn test_range_spans_leaves() {
        let keys: Vec<Key> = (0..40).map(|k| k * 2).collect();
        let (tree, _dir) = tree_with(3, &keys);

        let got: Vec<Key> = tree.range(9, 31).map(|(k, _)| k).collect();
        assert_eq!(got, vec![10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30]);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let (tree, _dir) = tree_with(4, &[1, 2, 3, 4, 5]);
        assert_eq!(
            tree.range_scan(2, 4),
            vec![Rid::new(1, 2), Rid::new(1, 3), Rid::new(1, 4)]
        );
    }

    #[test]
    fn test_empty_ranges() {
        let (tree, _dir) = tree_with(3, &[10, 20, 30]);
        assert!(tree.range_scan(11, 19).is_empty());
        assert!(tree.range_scan(31, 100).is_empty());
        assert!(tree.range_scan(20, 10).is_empty());
    }

    #[test]
    fn test_range_low_past_leaf_end() {
        // [1,2] | [4,5]: low = 3 lands in the left leaf past its last key.
        let (tree, _dir) = tree_with(3, &[1, 2, 4, 5]);
        let got: Vec<Key> = tree.range(3, 4).map(|(k, _)| k).collect();
        assert_eq!(got, vec![4]);
    }

    #[test]
    fn test_extreme_bounds() {
        let (tree, _dir) = tree_with(3, &[Key::MIN, -1, 0, Key::MAX]);
        let got: Vec<Key> = tree.range(Key::MIN, Key::MAX).map(|(k, _)| k).collect();
        assert_eq!(got, vec![Key::MIN, -1, 0, Key::MAX]);
    }

    #[test]
    fn test_iter_and_len() {
        let (tree, _dir) = tree_with(3, &[5, 3, 9, 1, 7]);
        let keys: Vec<Key> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 3, 5, 7, 9]);
        assert_eq!(tree.len(), 5);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_range_is_restartable() {
        let (tree, _dir) = tree_with(3, &[1, 2, 3, 4, 5, 6]);
        let first = tree.range_scan(2, 5);
        let second = tree.range_scan(2, 5);
        assert_eq!(first, second);
    }
}
