use common::shapes::{Cuboid, Point3D};
use fxhash::FxHashSet;
use log::trace;
use smallvec::SmallVec;
use std::marker::PhantomData;

use super::shape::validate_cuboid;
use super::split::find_pair_with_least_waste;
use super::*;
use crate::error::RTreeResult;

impl<V: LeafValue, P: MergePolicy, const N: usize> RTree<V, P, N> {
    pub fn new_with_config(config: Config) -> Self {
        Self {
            nodes: vec![Node::new(None)],
            empty_slots: FxHashSet::default(),
            to_comb: FxHashSet::default(),
            config: config.normalized(),
            generation: 0,
            policy: PhantomData,
        }
    }

    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stores `cuboid` with `value`, replacing whatever occupied any part of it.
    pub fn insert(&mut self, cuboid: Cuboid, value: V) -> RTreeResult<()> {
        validate_cuboid(&cuboid)?;
        self.cut(&cuboid, None);
        self.add_to_node_recursive(NodeIndex::ROOT, cuboid, value);
        self.generation += 1;
        Ok(())
    }

    pub fn insert_point(&mut self, point: Point3D, value: V) -> RTreeResult<()> {
        self.insert(Cuboid::from_point(point), value)
    }

    /// Empties the tree, keeping the configuration.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new(None));
        self.empty_slots.clear();
        self.to_comb.clear();
        self.generation += 1;
    }

    #[inline(always)]
    pub(crate) fn node(&self, index: NodeIndex) -> &Node<V, N> {
        &self.nodes[index.get()]
    }

    #[inline(always)]
    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut Node<V, N> {
        &mut self.nodes[index.get()]
    }

    pub(crate) fn mark_dirty(&mut self, index: NodeIndex) {
        self.to_comb.insert(index);
    }

    fn create_node(&mut self, parent: NodeIndex) -> NodeIndex {
        let index = NodeIndex::from_usize(self.nodes.len());
        self.nodes.push(Node::new(Some(parent)));
        index
    }

    /// Inserts a cuboid that overlaps nothing outside what it fully covers.
    pub(crate) fn add_to_node_recursive(&mut self, mut index: NodeIndex, mut cuboid: Cuboid, mut value: V) {
        loop {
            self.mark_dirty(index);
            self.clear_all_contained(index, &cuboid, None);
            let node = self.node(index);
            if !node.is_full() {
                self.node_mut(index).insert_leaf(&cuboid, value);
                return;
            }

            let mut candidates: SmallVec<[Cuboid; 64]> = (0..N).map(|slot| node.cuboid(slot)).collect();
            candidates.push(cuboid);
            let best = match find_pair_with_least_waste(&candidates) {
                Some(best) => best,
                None => unreachable!("a full node always yields a split pair"),
            };
            let (first, second) = (best.first, best.second);
            let first_is_leaf = node.is_leaf_slot(first);
            let second_is_leaf = second == N || node.is_leaf_slot(second);
            trace!(
                "split node {:?}: slots {} and {} (waste {}, leaves {}/{})",
                index,
                first,
                second,
                best.waste,
                first_is_leaf,
                second_is_leaf
            );

            match (first_is_leaf, second_is_leaf) {
                (true, true) => {
                    let first_value = node.leaf_value(first);
                    let second_value = if second == N { value } else { node.leaf_value(second) };
                    let exact = best.is_exact()
                        && first_value == second_value
                        && P::can_merge(&best.merged);
                    if exact {
                        let node = self.node_mut(index);
                        node.update_leaf(first, &best.merged, first_value);
                        if second != N {
                            node.update_leaf(second, &cuboid, value);
                        }
                        return;
                    }
                    let first_cuboid = candidates[first];
                    let second_cuboid = candidates[second];
                    let child = self.create_node(index);
                    let child_node = self.node_mut(child);
                    child_node.insert_leaf(&first_cuboid, first_value);
                    child_node.insert_leaf(&second_cuboid, second_value);
                    let node = self.node_mut(index);
                    if second != N {
                        node.update_leaf(second, &cuboid, value);
                    }
                    node.erase_leaf(first);
                    node.insert_branch(&best.merged, child);
                    self.mark_dirty(child);
                    return;
                }
                (true, false) | (false, true) => {
                    let (leaf_slot, branch_slot) = if first_is_leaf {
                        (first, second)
                    } else {
                        (second, first)
                    };
                    let child = node.child(branch_slot);
                    let node = self.node_mut(index);
                    node.update_branch_boundary(branch_slot, &best.merged);
                    if leaf_slot != N {
                        let displaced = (node.cuboid(leaf_slot), node.leaf_value(leaf_slot));
                        node.update_leaf(leaf_slot, &cuboid, value);
                        (cuboid, value) = displaced;
                    }
                    index = child;
                }
                (false, false) => {
                    let destination = node.child(first);
                    let source = node.child(second);
                    self.merge(destination, source);
                    let node = self.node_mut(index);
                    node.update_branch_boundary(first, &best.merged);
                    node.erase_branch(second);
                    node.insert_leaf(&cuboid, value);
                    self.destroy_with_children(source);
                    return;
                }
            }
        }
    }

    /// Moves every leaf under `source` into the subtree rooted at
    /// `destination`. `source` itself is left for the caller to destroy.
    pub(crate) fn merge(&mut self, destination: NodeIndex, source: NodeIndex) {
        for (cuboid, value) in self.gather_leaves_recursive(source) {
            self.add_to_node_recursive(destination, cuboid, value);
        }
    }

    pub(crate) fn gather_leaves_recursive(&self, index: NodeIndex) -> Vec<(Cuboid, V)> {
        let mut output = Vec::new();
        let mut stack = NodeStack::new();
        stack.push(index);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            output.extend(node.leaves());
            stack.extend(node.branches().map(|(_, child)| child));
        }
        output
    }

    /// Tombstones `index` and its whole subtree.
    pub(crate) fn destroy_with_children(&mut self, index: NodeIndex) {
        debug_assert!(index != NodeIndex::ROOT);
        let mut stack = NodeStack::new();
        stack.push(index);
        while let Some(index) = stack.pop() {
            let node = self.node_mut(index);
            stack.extend(node.branches().map(|(_, child)| child));
            node.clear();
            node.parent = None;
            self.empty_slots.insert(index);
            self.to_comb.remove(&index);
        }
    }

    /// Drops every entry under `index` that lies entirely inside `cuboid`,
    /// whole subtrees included. With `filter` only leaves carrying that value
    /// are dropped and branches are searched rather than destroyed.
    pub(crate) fn clear_all_contained(&mut self, index: NodeIndex, cuboid: &Cuboid, filter: Option<V>) {
        let mut stack = NodeStack::new();
        stack.push(index);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            let intersecting = node.cuboids.intersecting_cuboid(cuboid);
            if intersecting.is_empty() {
                continue;
            }
            let contained = node.cuboids.contained_by(cuboid);
            let (to_erase, to_search) = match filter {
                None => (
                    contained,
                    intersecting & !contained & node.branch_mask(),
                ),
                Some(value) => (
                    contained & node.leaves_with_value(value),
                    intersecting & node.branch_mask(),
                ),
            };
            stack.extend(to_search.iter().map(|slot| node.child(slot)));
            if to_erase.is_empty() {
                continue;
            }
            let destroyed: SmallVec<[NodeIndex; 16]> = (to_erase & node.branch_mask())
                .iter()
                .map(|slot| node.child(slot))
                .collect();
            self.node_mut(index).erase_by_mask(to_erase);
            for child in destroyed {
                self.destroy_with_children(child);
            }
            self.mark_dirty(index);
        }
    }
}
