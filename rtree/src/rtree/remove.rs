use common::shapes::{Cuboid, Point3D};
use smallvec::SmallVec;

use super::shape::validate_cuboid;
use super::*;
use crate::error::RTreeResult;

impl<V: LeafValue, P: MergePolicy, const N: usize> RTree<V, P, N> {
    /// Clears every cell of `cuboid`. Leaves that stick out are cut down to
    /// the pieces outside it.
    pub fn remove(&mut self, cuboid: Cuboid) -> RTreeResult<()> {
        validate_cuboid(&cuboid)?;
        self.cut(&cuboid, None);
        self.generation += 1;
        Ok(())
    }

    pub fn remove_point(&mut self, point: Point3D) -> RTreeResult<()> {
        self.remove(Cuboid::from_point(point))
    }

    /// Like [`RTree::remove`] but only cells holding `value` are cleared.
    pub fn remove_value(&mut self, cuboid: Cuboid, value: V) -> RTreeResult<()> {
        validate_cuboid(&cuboid)?;
        self.cut(&cuboid, Some(value));
        self.generation += 1;
        Ok(())
    }

    pub(crate) fn cut(&mut self, cuboid: &Cuboid, filter: Option<V>) {
        self.clear_all_contained(NodeIndex::ROOT, cuboid, filter);

        let mut open = NodeStack::new();
        open.push(NodeIndex::ROOT);
        // Discovery order puts every node after its parent.
        let mut touched: Vec<NodeIndex> = Vec::new();
        while let Some(index) = open.pop() {
            touched.push(index);
            self.remove_from_node(index, cuboid, filter, &mut open);
        }

        for &index in touched.iter().rev() {
            if index == NodeIndex::ROOT || self.empty_slots.contains(&index) {
                continue;
            }
            let node = self.node(index);
            let parent = match node.parent {
                Some(parent) => parent,
                None => panic!("non-root node {:?} has no parent", index),
            };
            if node.is_empty() {
                let parent_node = self.node_mut(parent);
                let slot = parent_node.offset_for(index);
                parent_node.erase_branch(slot);
                self.mark_dirty(parent);
                self.empty_slots.insert(index);
                self.to_comb.remove(&index);
                self.node_mut(index).parent = None;
            } else if let Some(boundary) = node.boundary() {
                let parent_node = self.node_mut(parent);
                let slot = parent_node.offset_for(index);
                parent_node.update_branch_boundary(slot, &boundary);
            }
        }
    }

    /// Cuts the leaves of `index` that meet `cuboid` and queues the
    /// branches that do.
    fn remove_from_node(
        &mut self,
        index: NodeIndex,
        cuboid: &Cuboid,
        filter: Option<V>,
        open: &mut NodeStack,
    ) {
        let node = self.node(index);
        let mut hits = node.cuboids.intersecting_cuboid(cuboid) & node.leaf_mask();
        if let Some(value) = filter {
            hits &= node.leaves_with_value(value);
        }
        if hits.any() {
            let mut fragments: SmallVec<[(Cuboid, V); 16]> = SmallVec::new();
            for slot in hits.iter() {
                let value = node.leaf_value(slot);
                fragments.extend(node.cuboid(slot).split_by(cuboid).into_iter().map(|piece| (piece, value)));
            }
            self.node_mut(index).erase_by_mask(hits);
            for (piece, value) in fragments {
                self.add_to_node_recursive(index, piece, value);
            }
        }
        let node = self.node(index);
        let branches = node.cuboids.intersecting_cuboid(cuboid) & node.branch_mask();
        open.extend(branches.iter().map(|slot| node.child(slot)));
        self.mark_dirty(index);
    }
}
