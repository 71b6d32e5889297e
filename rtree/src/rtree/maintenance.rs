use common::shapes::Cuboid;
use log::{debug, info};
use std::time::Instant;

use super::*;

impl<V: LeafValue, P: MergePolicy, const N: usize> RTree<V, P, N> {
    /// True when mutations have left work for [`RTree::prepare`].
    pub fn can_prepare(&self) -> bool {
        !self.to_comb.is_empty() || !self.empty_slots.is_empty()
    }

    /// Merges leaves and folds small nodes into their parents, compacts the
    /// arena and reorders it along a Hilbert curve. Does nothing when no
    /// mutation happened since the last call.
    pub fn prepare(&mut self) {
        let summary = self.config.profile_summary;
        let prepare_start = summary.then(Instant::now);

        let combed = !self.to_comb.is_empty();
        if combed {
            let start = summary.then(Instant::now);
            self.comb();
            if let Some(start) = start {
                info!("prepare: comb: {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
            }
        }

        let defragmented = !self.empty_slots.is_empty();
        if defragmented {
            let start = summary.then(Instant::now);
            self.defragment();
            if let Some(start) = start {
                info!("prepare: defragment: {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
            }
        }

        if (combed || defragmented) && self.config.sort_on_prepare {
            let start = summary.then(Instant::now);
            self.sort();
            if let Some(start) = start {
                info!("prepare: sort: {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
            }
        }

        if combed || defragmented {
            self.generation += 1;
        }
        if let Some(start) = prepare_start {
            info!(
                "prepare total: {:.3}ms ({} nodes, {} leaves)",
                start.elapsed().as_secs_f64() * 1000.0,
                self.node_count(),
                self.leaf_count()
            );
        }
    }

    /// Runs until no marked node can merge leaves or absorb a child.
    pub(crate) fn comb(&mut self) {
        let empty_slots = &self.empty_slots;
        self.to_comb.retain(|index| !empty_slots.contains(index));
        let mut rounds = 0usize;
        let mut merges = 0usize;
        while !self.to_comb.is_empty() {
            rounds += 1;
            let mut batch: Vec<NodeIndex> = self.to_comb.drain().collect();
            batch.sort_unstable();
            for index in batch {
                if self.empty_slots.contains(&index) {
                    continue;
                }
                let merged_leaves = self.try_to_merge_leaves(index);
                let absorbed = self.try_to_absorb_child(index);
                if merged_leaves || absorbed {
                    merges += 1;
                    self.mark_dirty(index);
                    continue;
                }
                let node = self.node(index);
                if let Some(parent) = node.parent {
                    if self.node(parent).unused_capacity() + 1 >= node.len() {
                        self.mark_dirty(parent);
                    }
                }
            }
        }
        debug!("comb: {} rounds, {} merges, {} tombstones", rounds, merges, self.empty_slots.len());
    }

    /// Fuses pairs of leaves that tile a cuboid exactly and carry the same
    /// value, restarting the scan after each fusion.
    fn try_to_merge_leaves(&mut self, index: NodeIndex) -> bool {
        let mut merged_any = false;
        let mut offset = 0;
        while offset < self.node(index).leaf_count() {
            let node = self.node(index);
            let cuboid = node.cuboid(offset);
            let value = node.leaf_value(offset);
            let candidates = node.cuboids.mergeable(&cuboid) & node.leaves_with_value(value);
            let found = candidates.iter().find_map(|slot| {
                let merged = node.cuboid(slot).union(&cuboid);
                P::can_merge(&merged).then_some((slot, merged))
            });
            match found {
                Some((slot, merged)) => {
                    let node = self.node_mut(index);
                    node.update_leaf(slot, &merged, value);
                    node.erase_leaf(offset);
                    merged_any = true;
                    offset = 0;
                }
                None => offset += 1,
            }
        }
        merged_any
    }

    /// Splices the first child whose entries fit in the room its own slot
    /// frees. Leaves move up as leaves and grandchildren are re-parented.
    fn try_to_absorb_child(&mut self, index: NodeIndex) -> bool {
        let node = self.node(index);
        let room = node.unused_capacity() + 1;
        let found = node
            .branches()
            .find(|(_, child)| self.node(*child).len() <= room)
            .map(|(_, child)| child);
        let child = match found {
            Some(child) => child,
            None => return false,
        };

        let child_node = self.node(child);
        let leaves: Vec<(Cuboid, V)> = child_node.leaves().collect();
        let branches: Vec<(Cuboid, NodeIndex)> = child_node.branches().collect();

        let node = self.node_mut(index);
        let slot = node.offset_for(child);
        node.erase_branch(slot);
        for (cuboid, value) in &leaves {
            node.insert_leaf(cuboid, *value);
        }
        for (cuboid, grandchild) in &branches {
            node.insert_branch(cuboid, *grandchild);
        }
        for (_, grandchild) in &branches {
            self.node_mut(*grandchild).parent = Some(index);
        }

        let child_node = self.node_mut(child);
        child_node.clear();
        child_node.parent = None;
        self.empty_slots.insert(child);
        self.to_comb.remove(&child);
        true
    }

    /// Fills tombstoned slots with nodes from the end of the arena, then
    /// truncates it.
    pub(crate) fn defragment(&mut self) {
        let mut holes: Vec<NodeIndex> = self.empty_slots.drain().collect();
        holes.sort_unstable();
        let mut next = 0usize;
        let mut moved = 0usize;
        while next < holes.len() {
            let last = NodeIndex::from_usize(self.nodes.len() - 1);
            if holes.last() == Some(&last) {
                holes.pop();
                self.nodes.pop();
                continue;
            }
            // Lowest remaining hole; always below `last`.
            let target = holes[next];
            next += 1;
            self.nodes.swap(target.get(), last.get());
            self.nodes.pop();
            moved += 1;

            if let Some(parent) = self.node(target).parent {
                self.node_mut(parent).update_child_index(last, target);
            }
            let children: Vec<NodeIndex> = self.node(target).branches().map(|(_, child)| child).collect();
            for child in children {
                self.node_mut(child).parent = Some(target);
            }
            if self.to_comb.remove(&last) {
                self.to_comb.insert(target);
            }
        }
        debug!("defragment: moved {} nodes, {} remain", moved, self.nodes.len());
    }

    /// Stable sort of every non-root node by the Hilbert key of its bounding
    /// cuboid's center, scaled onto the root boundary.
    pub(crate) fn sort(&mut self) {
        debug_assert!(self.empty_slots.is_empty());
        if self.nodes.len() <= 2 || !self.empty_slots.is_empty() {
            return;
        }
        let bounds = match self.nodes[0].boundary() {
            Some(bounds) => bounds,
            None => return,
        };
        let order = self.config.hilbert_order;
        let keys: Vec<u64> = self
            .nodes
            .iter()
            .map(|node| node.sort_order(&bounds, order))
            .collect();

        let mut order_of: Vec<usize> = (1..self.nodes.len()).collect();
        order_of.sort_by_key(|&old| keys[old]);
        let mut new_index = vec![0usize; self.nodes.len()];
        for (position, &old) in order_of.iter().enumerate() {
            new_index[old] = position + 1;
        }

        let mut old_nodes: Vec<Option<Node<V, N>>> = self.nodes.drain(..).map(Some).collect();
        let mut sorted = Vec::with_capacity(old_nodes.len());
        if let Some(root) = old_nodes[0].take() {
            sorted.push(root);
        }
        for &old in &order_of {
            if let Some(node) = old_nodes[old].take() {
                sorted.push(node);
            }
        }
        for node in sorted.iter_mut() {
            node.parent = node.parent.map(|parent| NodeIndex::from_usize(new_index[parent.get()]));
            for slot in node.child_begin..N {
                if let Slot::Branch(child) = node.slots[slot] {
                    node.slots[slot] = Slot::Branch(NodeIndex::from_usize(new_index[child.get()]));
                }
            }
        }
        self.nodes = sorted;
        self.to_comb = self
            .to_comb
            .iter()
            .map(|index| NodeIndex::from_usize(new_index[index.get()]))
            .collect();
        debug!("sort: reordered {} nodes", self.nodes.len() - 1);
    }
}
