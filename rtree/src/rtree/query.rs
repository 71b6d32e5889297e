use common::shapes::{Cuboid, CuboidSet, Point3D};
use fxhash::FxHashSet;
use smallvec::SmallVec;

use super::*;
use crate::error::RTreeResult;

/// Per node shape candidates for batch queries.
type Candidates = SmallVec<[u32; 16]>;

impl<V: LeafValue, P: MergePolicy, const N: usize> RTree<V, P, N> {
    /// Depth first walk over every node whose boundary meets `shape`.
    /// `visit` gets each node and its leaf hits and returns false to stop.
    fn walk<S, F>(&self, shape: &S, mut visit: F)
    where
        S: QueryShape + ?Sized,
        F: FnMut(&Node<V, N>, SlotMask) -> bool,
    {
        let mut stack = NodeStack::new();
        stack.push(NodeIndex::ROOT);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            let intersecting = shape.intersecting(&node.cuboids);
            if intersecting.is_empty() {
                continue;
            }
            let leaf_hits = intersecting & node.leaf_mask();
            let leaf_hits = if leaf_hits.any() {
                P::leaf_hits(shape, &node.cuboids, leaf_hits)
            } else {
                leaf_hits
            };
            if !visit(node, leaf_hits) {
                return;
            }
            let branch_hits = intersecting & node.branch_mask();
            stack.extend(branch_hits.iter().map(|slot| node.child(slot)));
        }
    }

    /// Whether any stored cell meets `shape`.
    pub fn query<S: QueryShape + ?Sized>(&self, shape: &S) -> RTreeResult<bool> {
        shape.validate()?;
        let mut found = false;
        self.walk(shape, |_, hits| {
            found = hits.any();
            !found
        });
        Ok(found)
    }

    pub fn query_point(&self, x: i32, y: i32, z: i32) -> RTreeResult<bool> {
        self.query(&Point3D::new(x, y, z))
    }

    /// First leaf met in traversal order.
    pub fn query_get_leaf<S: QueryShape + ?Sized>(&self, shape: &S) -> RTreeResult<Option<Cuboid>> {
        Ok(self.query_get_leaf_with_value(shape)?.map(|(cuboid, _)| cuboid))
    }

    pub fn query_get_leaf_with_value<S: QueryShape + ?Sized>(
        &self,
        shape: &S,
    ) -> RTreeResult<Option<(Cuboid, V)>> {
        shape.validate()?;
        let mut output = None;
        self.walk(shape, |node, hits| {
            output = hits
                .first()
                .map(|slot| (node.cuboid(slot), node.leaf_value(slot)));
            output.is_none()
        });
        Ok(output)
    }

    pub fn query_get_one<S: QueryShape + ?Sized>(&self, shape: &S) -> RTreeResult<Option<V>> {
        Ok(self.query_get_leaf_with_value(shape)?.map(|(_, value)| value))
    }

    /// A grid point inside both `shape` and some leaf.
    pub fn query_get_point<S: QueryShape + ?Sized>(&self, shape: &S) -> RTreeResult<Option<Point3D>> {
        shape.validate()?;
        let mut output = None;
        self.walk(shape, |node, hits| {
            output = hits
                .iter()
                .find_map(|slot| shape.intersection_point(&node.cuboid(slot)));
            output.is_none()
        });
        Ok(output)
    }

    pub fn query_get_leaves<S: QueryShape + ?Sized>(&self, shape: &S) -> RTreeResult<CuboidSet> {
        shape.validate()?;
        let mut output = CuboidSet::new();
        self.walk(shape, |node, hits| {
            for slot in hits.iter() {
                output.add(node.cuboid(slot));
            }
            true
        });
        Ok(output)
    }

    /// Distinct values of every leaf meeting `shape`, in traversal order.
    pub fn query_get_all<S: QueryShape + ?Sized>(&self, shape: &S) -> RTreeResult<Vec<V>> {
        shape.validate()?;
        let mut seen = FxHashSet::default();
        let mut output = Vec::new();
        self.walk(shape, |node, hits| {
            for slot in hits.iter() {
                let value = node.leaf_value(slot);
                if seen.insert(value) {
                    output.push(value);
                }
            }
            true
        });
        Ok(output)
    }

    pub fn query_get_all_with_cuboids<S: QueryShape + ?Sized>(
        &self,
        shape: &S,
    ) -> RTreeResult<Vec<(Cuboid, V)>> {
        shape.validate()?;
        let mut output = Vec::new();
        self.walk(shape, |node, hits| {
            output.extend(hits.iter().map(|slot| (node.cuboid(slot), node.leaf_value(slot))));
            true
        });
        Ok(output)
    }

    /// Stored cells inside `cuboid`, as leaves clipped to it.
    pub fn query_get_intersection(&self, cuboid: &Cuboid) -> RTreeResult<CuboidSet> {
        Ok(self
            .query_get_leaves(cuboid)?
            .iter()
            .filter_map(|leaf| leaf.intersection(cuboid))
            .collect())
    }

    /// For every shape, whether it meets any stored cell. One traversal
    /// serves all shapes: each node carries the indices of the shapes still
    /// unresolved in its subtree.
    pub fn batch_query<S: QueryShape>(&self, shapes: &[S]) -> RTreeResult<Vec<bool>> {
        for shape in shapes {
            shape.validate()?;
        }
        let mut output = vec![false; shapes.len()];
        self.batch_walk(shapes, &mut output, false);
        Ok(output)
    }

    /// Whether any of `shapes` meets a stored cell.
    pub fn batch_query_any<S: QueryShape>(&self, shapes: &[S]) -> RTreeResult<bool> {
        for shape in shapes {
            shape.validate()?;
        }
        let mut output = vec![false; shapes.len()];
        Ok(self.batch_walk(shapes, &mut output, true))
    }

    fn batch_walk<S: QueryShape>(&self, shapes: &[S], output: &mut [bool], stop_at_first: bool) -> bool {
        if shapes.is_empty() {
            return false;
        }
        let mut open: Vec<(NodeIndex, Candidates)> = vec![(NodeIndex::ROOT, (0..shapes.len() as u32).collect())];
        while let Some((index, candidates)) = open.pop() {
            let node = self.node(index);
            let mut children: SmallVec<[(NodeIndex, Candidates); 8]> = SmallVec::new();
            for shape_index in candidates {
                if output[shape_index as usize] {
                    continue;
                }
                let shape = &shapes[shape_index as usize];
                let intersecting = shape.intersecting(&node.cuboids);
                if intersecting.is_empty() {
                    continue;
                }
                let leaf_hits = intersecting & node.leaf_mask();
                if leaf_hits.any() && P::leaf_hits(shape, &node.cuboids, leaf_hits).any() {
                    output[shape_index as usize] = true;
                    if stop_at_first {
                        return true;
                    }
                    continue;
                }
                for slot in (intersecting & node.branch_mask()).iter() {
                    let child = node.child(slot);
                    match children.iter_mut().find(|(index, _)| *index == child) {
                        Some((_, list)) => list.push(shape_index),
                        None => {
                            let mut list = Candidates::new();
                            list.push(shape_index);
                            children.push((child, list));
                        }
                    }
                }
            }
            open.extend(children);
        }
        output.iter().any(|&hit| hit)
    }
}
