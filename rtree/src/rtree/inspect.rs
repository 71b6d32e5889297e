use common::shapes::{Cuboid, Volume};
use fxhash::FxHashSet;

use super::*;
use crate::error::{RTreeError, RTreeResult};

/// Arena position of a node as of one tree generation. Any mutation or
/// `prepare` moves the tree to a new generation and invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub index: NodeIndex,
    pub generation: u64,
}

/// Read only view of one node.
#[derive(Debug)]
pub struct NodeView<'a, V, const N: usize> {
    node: &'a Node<V, N>,
    handle: NodeHandle,
}

impl<'a, V: LeafValue, const N: usize> NodeView<'a, V, N> {
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.node.parent.map(|index| NodeHandle {
            index,
            generation: self.handle.generation,
        })
    }

    pub fn leaf_count(&self) -> usize {
        self.node.leaf_count()
    }

    pub fn child_count(&self) -> usize {
        self.node.child_count()
    }

    pub fn unused_capacity(&self) -> usize {
        self.node.unused_capacity()
    }

    pub fn boundary(&self) -> Option<Cuboid> {
        self.node.boundary()
    }

    pub fn cuboid(&self, slot: usize) -> Option<Cuboid> {
        (slot < N && !self.node.cuboids.is_null(slot)).then(|| self.node.cuboid(slot))
    }

    pub fn leaves(&self) -> Vec<(Cuboid, V)> {
        self.node.leaves().collect()
    }

    pub fn children(&self) -> Vec<(Cuboid, NodeHandle)> {
        self.node
            .branches()
            .map(|(cuboid, index)| {
                (
                    cuboid,
                    NodeHandle {
                        index,
                        generation: self.handle.generation,
                    },
                )
            })
            .collect()
    }
}

impl<V: LeafValue, P: MergePolicy, const N: usize> RTree<V, P, N> {
    pub fn root(&self) -> NodeHandle {
        NodeHandle {
            index: NodeIndex::ROOT,
            generation: self.generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn node_at(&self, handle: NodeHandle) -> RTreeResult<NodeView<'_, V, N>> {
        let stale = handle.generation != self.generation
            || handle.index.get() >= self.nodes.len()
            || self.empty_slots.contains(&handle.index);
        if stale {
            return Err(RTreeError::StaleIndex {
                index: handle.index.0,
                generation: handle.generation,
                current: self.generation,
            });
        }
        Ok(NodeView {
            node: self.node(handle.index),
            handle,
        })
    }

    /// Live nodes, tombstones excluded.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.empty_slots.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.live_nodes().map(|node| node.leaf_count()).sum()
    }

    pub fn total_leaf_volume(&self) -> Volume {
        self.live_nodes().map(|node| node.leaf_volume()).sum()
    }

    pub fn total_node_volume(&self) -> Volume {
        self.live_nodes().map(|node| node.node_volume()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }

    /// Every stored leaf, in arena order.
    pub fn leaves(&self) -> Vec<(Cuboid, V)> {
        self.live_nodes().flat_map(|node| node.leaves()).collect()
    }

    fn live_nodes(&self) -> impl Iterator<Item = &Node<V, N>> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.empty_slots.contains(&NodeIndex::from_usize(*index)))
            .map(|(_, node)| node)
    }

    /// Panics if the arena is inconsistent: unreachable or doubly linked
    /// nodes, parent links out of sync, branch boundaries that do not hold
    /// their subtree, or overlapping leaves.
    pub fn assert_invariants(&self) {
        assert!(self.node(NodeIndex::ROOT).parent.is_none(), "root has a parent");
        assert!(!self.empty_slots.contains(&NodeIndex::ROOT), "root is tombstoned");
        let mut reached = FxHashSet::default();
        let mut leaves: Vec<Cuboid> = Vec::new();
        let mut stack = vec![(NodeIndex::ROOT, None::<Cuboid>)];
        while let Some((index, bound)) = stack.pop() {
            assert!(reached.insert(index), "node {:?} reached twice", index);
            assert!(!self.empty_slots.contains(&index), "tombstone {:?} is reachable", index);
            let node = self.node(index);
            assert!(node.leaf_end <= node.child_begin && node.child_begin <= N);
            for slot in node.leaf_end..node.child_begin {
                assert!(node.cuboids.is_null(slot), "free slot {} of {:?} is not null", slot, index);
            }
            for (cuboid, _) in node.leaves() {
                if let Some(bound) = bound {
                    assert!(bound.contains(&cuboid), "leaf {:?} escapes {:?}", cuboid, bound);
                }
                leaves.push(cuboid);
            }
            for (cuboid, child) in node.branches() {
                if let Some(bound) = bound {
                    assert!(bound.contains(&cuboid), "branch {:?} escapes {:?}", cuboid, bound);
                }
                assert_eq!(self.node(child).parent, Some(index), "parent link of {:?}", child);
                stack.push((child, Some(cuboid)));
            }
        }
        assert_eq!(reached.len(), self.node_count(), "unreachable live nodes");
        for (i, a) in leaves.iter().enumerate() {
            for b in &leaves[i + 1..] {
                assert!(!a.intersects(b), "leaves {:?} and {:?} overlap", a, b);
            }
        }
    }
}
