//! Structural checks over the resident tree, and summary statistics.

use std::collections::HashSet;

use crate::common::{Error, Key, NodeId, Result};

use super::{BPlusTree, NodeKind};

/// Shape of a tree at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    /// Levels from the root down to the leaves.
    pub height: usize,
    /// Resident nodes, leaves included.
    pub nodes: usize,
    pub leaves: usize,
    /// Key/RID entries stored in leaves.
    pub entries: usize,
}

/// A node awaiting inspection, with the key range its parent assigns it.
struct Pending {
    id: NodeId,
    depth: usize,
    low: Option<Key>,
    high: Option<Key>,
}

impl BPlusTree {
    /// Check the structural invariants of the tree.
    ///
    /// Verified for every node reachable from the root:
    /// - keys are in ascending order and within the range the parent assigns
    ///   (`[separator before, separator after)`)
    /// - key count is at most the order, and at least the minimum for
    ///   non-root nodes
    /// - internal nodes have one more child than keys; leaves one RID per key
    /// - all leaves sit at the same depth
    /// - the leaf chain visits exactly the leaves, left to right, and ends
    ///
    /// Keys inserted more than once can straddle a split and are reported
    /// as out of range.
    ///
    /// # Errors
    /// Returns `Error::Corruption` describing the first violation found.
    pub fn check_invariants(&self) -> Result<()> {
        let order = self.config.order();
        let min = self.config.min_keys();

        let mut seen = HashSet::new();
        let mut leaves = Vec::new();
        let mut leaf_depth = None;

        let mut stack = vec![Pending {
            id: self.root,
            depth: 0,
            low: None,
            high: None,
        }];

        while let Some(Pending {
            id,
            depth,
            low,
            high,
        }) = stack.pop()
        {
            if !seen.insert(id) {
                return Err(violation(id, "is reachable more than once"));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| violation(id, "is referenced but not resident"))?;
            let keys = node.keys();

            if keys.windows(2).any(|pair| pair[0] > pair[1]) {
                return Err(violation(id, "has keys out of order"));
            }
            if keys.len() > order {
                return Err(violation(id, format!("holds {} keys, over order", keys.len())));
            }
            if id != self.root && keys.len() < min {
                return Err(violation(id, format!("holds {} keys, under minimum", keys.len())));
            }
            let below = low.is_some_and(|low| keys.first().is_some_and(|&k| k < low));
            let above = high.is_some_and(|high| keys.last().is_some_and(|&k| k >= high));
            if below || above {
                return Err(violation(id, "has keys outside its parent's range"));
            }

            match node.kind() {
                NodeKind::Leaf { rids, .. } => {
                    if rids.len() != keys.len() {
                        return Err(violation(id, "has a RID count unequal to its key count"));
                    }
                    if *leaf_depth.get_or_insert(depth) != depth {
                        return Err(violation(id, "is a leaf at a different depth"));
                    }
                    leaves.push(id);
                }
                NodeKind::Internal { children } => {
                    if children.len() != keys.len() + 1 {
                        return Err(violation(id, "has a child count not one above its key count"));
                    }
                    // Pushed right to left so leaves are reached in key order.
                    for (i, &child) in children.iter().enumerate().rev() {
                        stack.push(Pending {
                            id: child,
                            depth: depth + 1,
                            low: if i == 0 { low } else { Some(keys[i - 1]) },
                            high: keys.get(i).copied().or(high),
                        });
                    }
                }
            }
        }

        let mut chain = Vec::with_capacity(leaves.len());
        let mut cursor = leaves.first().copied();
        while let Some(id) = cursor {
            if chain.len() == leaves.len() {
                return Err(violation(id, "extends the leaf chain past the last leaf"));
            }
            chain.push(id);
            cursor = self
                .nodes
                .get(id)
                .ok_or_else(|| violation(id, "is chained but not resident"))?
                .next_leaf();
        }
        if chain != leaves {
            return Err(Error::corruption("leaf chain does not follow key order"));
        }

        Ok(())
    }

    /// Summarize the shape of the tree.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            height: self.height(),
            ..TreeStats::default()
        };

        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            stats.nodes += 1;
            if node.is_leaf() {
                stats.leaves += 1;
                stats.entries += node.len();
            }
            stack.extend_from_slice(node.children());
        }
        stats
    }
}

fn violation(id: NodeId, what: impl std::fmt::Display) -> Error {
    Error::corruption(format!("{id} {what}"))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::common::Rid;
    use crate::index::btree::Node;

    fn tree_with(order: usize, keys: impl IntoIterator<Item = Key>) -> (BPlusTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("t.idx"), order).unwrap();
        for key in keys {
            tree.insert(key, Rid::new(0, key as u16)).unwrap();
        }
        (tree, dir)
    }

    #[test]
    fn test_valid_trees_pass() {
        for order in 2..=6 {
            let (tree, _dir) = tree_with(order, (0..100).map(|k| (k * 37) % 101));
            tree.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_stats() {
        let (tree, _dir) = tree_with(3, [1, 2, 4, 5]);
        assert_eq!(
            tree.stats(),
            TreeStats {
                height: 2,
                nodes: 3,
                leaves: 2,
                entries: 4,
            }
        );
    }

    #[test]
    fn test_detects_broken_leaf_chain() {
        let (mut tree, _dir) = tree_with(3, [1, 2, 4, 5]);
        let first = tree.first_leaf();
        let node = tree.nodes.remove(first).unwrap();
        tree.nodes
            .insert(Node::leaf(first, node.keys().to_vec(), node.rids().to_vec(), None));

        assert!(matches!(tree.check_invariants(), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_detects_out_of_range_key() {
        let (mut tree, _dir) = tree_with(3, [1, 2, 4, 5]);
        let first = tree.first_leaf();
        let node = tree.nodes.remove(first).unwrap();
        tree.nodes.insert(Node::leaf(
            first,
            vec![1, 9],
            node.rids().to_vec(),
            node.next_leaf(),
        ));

        assert!(matches!(tree.check_invariants(), Err(Error::Corruption(_))));
    }

    #[test]
    fn test_detects_underflow() {
        let (mut tree, _dir) = tree_with(4, 1..=5);
        let first = tree.first_leaf();
        let node = tree.nodes.remove(first).unwrap();
        tree.nodes.insert(Node::leaf(
            first,
            vec![1],
            vec![Rid::new(0, 1)],
            node.next_leaf(),
        ));

        assert!(matches!(tree.check_invariants(), Err(Error::Corruption(_))));
    }
}
