//! Resident node storage keyed by [`NodeId`].

use std::ops::{Index, IndexMut};

use crate::common::NodeId;

use super::Node;

/// Every node reachable from the root, indexed by identifier.
///
/// Node ids are handed out sequentially by the page store, so a dense
/// vector of slots is enough. Slots of nodes dropped by merges are emptied.
///
/// # Panics
/// Indexing with an id that is not resident panics. The tree only indexes
/// with ids taken from resident nodes, and loading checks that every
/// referenced node exists.
#[derive(Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    resident: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node, replacing any node with the same id.
    pub fn insert(&mut self, node: Node) {
        let slot = node.id().0 as usize;
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].replace(node).is_none() {
            self.resident += 1;
        }
    }

    /// Take a node out of the arena.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.0 as usize)?.take();
        if node.is_some() {
            self.resident -= 1;
        }
        node
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of resident nodes.
    pub fn len(&self) -> usize {
        self.resident
    }

    pub fn is_empty(&self) -> bool {
        self.resident == 0
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("{id} is not resident"),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots.get_mut(id.0 as usize) {
            Some(Some(node)) => node,
            _ => panic!("{id} is not resident"),
        }
    }
}
