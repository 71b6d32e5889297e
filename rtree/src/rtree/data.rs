use common::shapes::Cuboid;

use super::shape::validate_cuboid;
use super::*;
use crate::error::RTreeResult;

impl<V: LeafValue, P: MergePolicy, const N: usize> RTree<V, P, N> {
    /// Rewrites `old` to `new` for every cell of `region` holding `old`.
    /// Leaves partly outside `region` keep `old` on the outside part.
    pub fn update(&mut self, region: Cuboid, old: V, new: V) -> RTreeResult<()> {
        validate_cuboid(&region)?;
        if old == new {
            return Ok(());
        }
        let mut parts = Vec::new();
        self.walk_leaves(&region, |cuboid, value| {
            if value == old {
                if let Some(part) = cuboid.intersection(&region) {
                    parts.push(part);
                }
            }
        });
        if parts.is_empty() {
            return Ok(());
        }
        self.cut(&region, Some(old));
        for part in parts {
            self.add_to_node_recursive(NodeIndex::ROOT, part, new);
        }
        self.generation += 1;
        Ok(())
    }

    /// Every leaf meeting `cuboid`, ignoring the merge policy's hit rules.
    fn walk_leaves<F: FnMut(Cuboid, V)>(&self, cuboid: &Cuboid, mut visit: F) {
        let mut stack = NodeStack::new();
        stack.push(NodeIndex::ROOT);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            let intersecting = node.cuboids.intersecting_cuboid(cuboid);
            for slot in (intersecting & node.leaf_mask()).iter() {
                visit(node.cuboid(slot), node.leaf_value(slot));
            }
            stack.extend((intersecting & node.branch_mask()).iter().map(|slot| node.child(slot)));
        }
    }
}
