//! The tree handle: open, search and insert.
//!
//! Deletion with rebalancing lives in [`super::remove`], iteration in
//! [`super::iter`] and the structural checker in [`super::verify`].

use std::path::Path;

use tracing::{debug, info};

use crate::common::{Error, IndexConfig, Key, NodeId, Result, Rid};
use crate::storage::PageStore;

use super::{Node, NodeArena};

/// A disk-resident B+ tree mapping [`Key`]s to [`Rid`]s.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────┐
/// │                  BPlusTree                   │
/// │  ┌────────────┐   ┌───────────────────────┐  │
/// │  │ root:      │──▶│ nodes: NodeArena      │  │
/// │  │ NodeId     │   │ NodeId → Node         │  │
/// │  └────────────┘   └───────────────────────┘  │
/// │          every changed node │ written back   │
/// │                             ▼                │
/// │                ┌───────────────────────┐     │
/// │                │ store: PageStore      │     │
/// │                └───────────────────────┘     │
/// └──────────────────────────────────────────────┘
/// ```
///
/// Opening loads every node reachable from the root; afterwards all reads
/// are served from memory. Each mutating call writes every node it changed
/// (and the root pointer, if the root changed) before returning.
///
/// # Example
/// ```no_run
/// use rowindex::{BPlusTree, Rid};
///
/// let mut tree = BPlusTree::open("table.idx", 4).unwrap();
/// tree.insert(42, Rid::new(0, 7)).unwrap();
/// assert_eq!(tree.search(42), Some(Rid::new(0, 7)));
/// assert!(tree.remove(42).unwrap());
/// ```
pub struct BPlusTree {
    pub(super) config: IndexConfig,
    pub(super) store: PageStore,
    pub(super) nodes: NodeArena,
    pub(super) root: NodeId,
}

/// One internal node on the root-to-leaf path, with the child taken.
#[derive(Debug, Clone, Copy)]
pub(super) struct PathEntry {
    pub node: NodeId,
    pub child_idx: usize,
}

impl BPlusTree {
    /// Open (or create) the index stored at `path` with the given order.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` before the file is touched if the order does
    ///   not fit the page size
    /// - I/O and corruption errors from loading the tree
    pub fn open<P: AsRef<Path>>(path: P, order: usize) -> Result<Self> {
        Self::open_with_config(path, IndexConfig::new(order)?)
    }

    /// Open (or create) the index stored at `path`.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: IndexConfig) -> Result<Self> {
        config.validate()?;

        let mut store = PageStore::open(path)?;
        let mut nodes = NodeArena::new();

        let root = match store.read_root_id()? {
            Some(root) => {
                load_reachable(&mut store, &mut nodes, root, &config)?;
                root
            }
            None => {
                let root = store.allocate_node()?;
                let leaf = Node::empty_leaf(root);
                store.write_node(&leaf)?;
                store.write_root_id(root)?;
                nodes.insert(leaf);
                root
            }
        };

        info!(
            %root,
            nodes = nodes.len(),
            order = config.order(),
            "opened index"
        );

        Ok(Self {
            config,
            store,
            nodes,
            root,
        })
    }

    // ========================================================================
    // Public API: accessors
    // ========================================================================

    /// Identifier of the current root node.
    #[inline]
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Maximum keys per node.
    #[inline]
    pub fn order(&self) -> usize {
        self.config.order()
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Look up a resident node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Number of levels, counting the root and the leaves.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut id = self.root;
        while let Some(&child) = self.nodes[id].children().first() {
            height += 1;
            id = child;
        }
        height
    }

    // ========================================================================
    // Public API: search and insert
    // ========================================================================

    /// Find the RID stored for `key`.
    ///
    /// Returns `None` if the key is absent.
    pub fn search(&self, key: Key) -> Option<Rid> {
        self.nodes[self.leaf_for(key)].find(key)
    }

    /// Insert a key/RID pair, splitting nodes as needed.
    ///
    /// The pair goes to the first position whose key is not less than `key`,
    /// so inserting a key that is already present adds a second entry in
    /// front of the existing one instead of replacing it.
    ///
    /// Pages for every node the insert will split are allocated before the
    /// in-memory tree is changed.
    pub fn insert(&mut self, key: Key, rid: Rid) -> Result<()> {
        let (leaf_id, mut path) = self.descend(key);
        let mut reserved = self.reserve_split_pages(leaf_id, &path)?.into_iter();

        self.nodes[leaf_id].insert_entry(key, rid)?;

        // Carry each split's separator upward until a level absorbs it.
        let mut node_id = leaf_id;
        while self.nodes[node_id].len() > self.config.order() {
            let right_id = reserved.next().ok_or_else(reservation_exhausted)?;
            let (separator, right) = self.nodes[node_id].split(&self.config, right_id);
            debug!(node = %node_id, right = %right_id, separator, "split node");

            self.store.write_node(&right)?;
            self.nodes.insert(right);
            self.persist(node_id)?;

            match path.pop() {
                Some(PathEntry { node, child_idx }) => {
                    self.nodes[node].insert_child(child_idx, separator, right_id)?;
                    node_id = node;
                }
                None => {
                    let root_id = reserved.next().ok_or_else(reservation_exhausted)?;
                    let root = Node::internal(root_id, vec![separator], vec![node_id, right_id]);
                    self.store.write_node(&root)?;
                    self.nodes.insert(root);
                    return self.set_root(root_id);
                }
            }
        }

        self.persist(node_id)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Leaf whose range covers `key`.
    pub(super) fn leaf_for(&self, key: Key) -> NodeId {
        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            if node.is_leaf() {
                return id;
            }
            id = node.children()[node.child_index(key)];
        }
    }

    /// Leaf whose range covers `key`, with the internal nodes passed on the way.
    pub(super) fn descend(&self, key: Key) -> (NodeId, Vec<PathEntry>) {
        let mut path = Vec::new();
        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            if node.is_leaf() {
                return (id, path);
            }
            let child_idx = node.child_index(key);
            path.push(PathEntry { node: id, child_idx });
            id = node.children()[child_idx];
        }
    }

    /// Leftmost leaf, where the leaf chain starts.
    pub(super) fn first_leaf(&self) -> NodeId {
        let mut id = self.root;
        while let Some(&child) = self.nodes[id].children().first() {
            id = child;
        }
        id
    }

    /// Allocate one page per node that inserting into `leaf_id` will split,
    /// plus one for a new root if the splits reach the root.
    fn reserve_split_pages(&mut self, leaf_id: NodeId, path: &[PathEntry]) -> Result<Vec<NodeId>> {
        let order = self.config.order();
        if self.nodes[leaf_id].len() < order {
            return Ok(Vec::new());
        }

        let full_ancestors = path
            .iter()
            .rev()
            .take_while(|entry| self.nodes[entry.node].len() >= order)
            .count();
        let mut needed = 1 + full_ancestors;
        if full_ancestors == path.len() {
            needed += 1;
        }

        (0..needed).map(|_| self.store.allocate_node()).collect()
    }

    /// Write a resident node back to its page.
    pub(super) fn persist(&mut self, id: NodeId) -> Result<()> {
        self.store.write_node(&self.nodes[id])
    }

    /// Make `id` the root and persist the root pointer.
    pub(super) fn set_root(&mut self, id: NodeId) -> Result<()> {
        debug!(old = %self.root, new = %id, "root changed");
        self.root = id;
        self.store.write_root_id(id)
    }
}

/// Read every node reachable from `root` into the arena.
///
/// The nodes must form a tree: each node is some parent's child at most
/// once, all leaves sit at the same depth, and the leaf chain links the
/// leaves left to right and ends at the last one. Anything else is
/// reported as corruption instead of being loaded.
fn load_reachable(
    store: &mut PageStore,
    nodes: &mut NodeArena,
    root: NodeId,
    config: &IndexConfig,
) -> Result<()> {
    let mut leaves = Vec::new();
    let mut leaf_depth = None;

    let mut pending = vec![(root, 0usize)];
    while let Some((id, depth)) = pending.pop() {
        if nodes.contains(id) {
            return Err(Error::corruption(format!(
                "{id} is the child of more than one parent"
            )));
        }

        let node = store.read_node(id)?;
        if node.len() > config.order() {
            return Err(Error::corruption(format!(
                "{} holds {} keys, more than order {}",
                id,
                node.len(),
                config.order()
            )));
        }

        if node.is_leaf() {
            if *leaf_depth.get_or_insert(depth) != depth {
                return Err(Error::corruption(format!(
                    "leaf {id} is not at the depth of the other leaves"
                )));
            }
            leaves.push(id);
        } else {
            // Right to left, so leaves are reached in key order.
            pending.extend(node.children().iter().rev().map(|&child| (child, depth + 1)));
        }
        nodes.insert(node);
    }

    for (i, &id) in leaves.iter().enumerate() {
        let expected = leaves.get(i + 1).copied();
        let next = nodes[id].next_leaf();
        if next != expected {
            return Err(Error::corruption(format!(
                "leaf {id} links to {next:?} instead of {expected:?}"
            )));
        }
    }
    Ok(())
}

fn reservation_exhausted() -> Error {
    Error::corruption("insert split more nodes than it reserved pages for")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rid(key: Key) -> Rid {
        Rid::new(0, key as u16)
    }

    #[test]
    fn test_open_creates_empty_root_leaf() {
        let dir = tempdir().unwrap();
        let tree = BPlusTree::open(dir.path().join("t.idx"), 3).unwrap();

        assert_eq!(tree.root_id(), NodeId::new(0));
        assert_eq!(tree.height(), 1);
        assert!(tree.node(tree.root_id()).unwrap().is_leaf());
        assert_eq!(tree.search(1), None);
    }

    #[test]
    fn test_invalid_order_touches_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.idx");

        assert!(matches!(
            BPlusTree::open(&path, 0),
            Err(Error::InvalidOrder { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_root_split_builds_new_root() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("t.idx"), 3).unwrap();

        for key in [1, 2, 4, 5] {
            tree.insert(key, rid(key)).unwrap();
        }

        let root = tree.node(tree.root_id()).unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.keys(), &[4]);

        let left = tree.node(root.children()[0]).unwrap();
        let right = tree.node(root.children()[1]).unwrap();
        assert_eq!(left.keys(), &[1, 2]);
        assert_eq!(right.keys(), &[4, 5]);
        assert_eq!(left.next_leaf(), Some(right.id()));
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn test_reservation_is_exact() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("t.idx"), 3).unwrap();

        // Root leaf split: new leaf plus new root.
        for key in 1..=4 {
            tree.insert(key, rid(key)).unwrap();
        }
        assert_eq!(tree.store.node_count(), 3);

        // No split, no allocation.
        tree.insert(0, rid(0)).unwrap();
        assert_eq!(tree.store.node_count(), 3);

        // Every allocated page is resident: nothing leaked by the reservation.
        for key in 5..=40 {
            tree.insert(key, rid(key)).unwrap();
        }
        assert_eq!(tree.store.node_count() as usize, tree.nodes.len());
    }

    #[test]
    fn test_duplicate_insert_is_not_an_overwrite() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("t.idx"), 4).unwrap();

        tree.insert(7, Rid::new(1, 1)).unwrap();
        tree.insert(7, Rid::new(2, 2)).unwrap();

        assert_eq!(tree.search(7), Some(Rid::new(2, 2)));
        assert_eq!(tree.range_scan(7, 7), vec![Rid::new(2, 2), Rid::new(1, 1)]);
    }
}
