use common::hilbert::hilbert_index;
use common::shapes::{Cuboid, Volume};
use serde::{Deserialize, Serialize};

use super::cuboid_array::{CuboidArray, SlotMask};
use super::LeafValue;
use crate::error::RTreeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const ROOT: NodeIndex = NodeIndex(0);

    #[inline(always)]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_usize(index: usize) -> Self {
        NodeIndex(index as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot<V> {
    Empty,
    Leaf(V),
    Branch(NodeIndex),
}

/// Slots `0..leaf_end` hold leaves and `child_begin..N` hold branches. The
/// gap between them is free capacity. Erasing moves the entry nearest the
/// gap into the freed slot, so slot order is not stable.
#[derive(Debug, Clone)]
pub struct Node<V, const N: usize> {
    pub(crate) cuboids: CuboidArray<N>,
    pub(crate) slots: [Slot<V>; N],
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) leaf_end: usize,
    pub(crate) child_begin: usize,
}

impl<V: LeafValue, const N: usize> Node<V, N> {
    pub fn new(parent: Option<NodeIndex>) -> Self {
        Self {
            cuboids: CuboidArray::new(),
            slots: [Slot::Empty; N],
            parent,
            leaf_end: 0,
            child_begin: N,
        }
    }

    #[inline(always)]
    pub fn leaf_count(&self) -> usize {
        self.leaf_end
    }

    #[inline(always)]
    pub fn child_count(&self) -> usize {
        N - self.child_begin
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.leaf_count() + self.child_count()
    }

    #[inline(always)]
    pub fn unused_capacity(&self) -> usize {
        self.child_begin - self.leaf_end
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.unused_capacity() == N
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.leaf_end == self.child_begin
    }

    #[inline(always)]
    pub fn leaf_mask(&self) -> SlotMask {
        SlotMask::range(0, self.leaf_end)
    }

    #[inline(always)]
    pub fn branch_mask(&self) -> SlotMask {
        SlotMask::range(self.child_begin, N)
    }

    #[inline(always)]
    pub fn is_leaf_slot(&self, slot: usize) -> bool {
        slot < self.leaf_end
    }

    #[inline(always)]
    pub fn cuboid(&self, slot: usize) -> Cuboid {
        self.cuboids.get(slot)
    }

    pub fn leaf_value(&self, slot: usize) -> V {
        match self.slots[slot] {
            Slot::Leaf(value) => value,
            other => panic!("slot {} is not a leaf: {:?}", slot, other),
        }
    }

    pub fn child(&self, slot: usize) -> NodeIndex {
        match self.slots[slot] {
            Slot::Branch(index) => index,
            other => panic!("slot {} is not a branch: {:?}", slot, other),
        }
    }

    pub fn leaves(&self) -> impl Iterator<Item = (Cuboid, V)> + '_ {
        (0..self.leaf_end).map(move |slot| (self.cuboid(slot), self.leaf_value(slot)))
    }

    pub fn branches(&self) -> impl Iterator<Item = (Cuboid, NodeIndex)> + '_ {
        (self.child_begin..N).map(move |slot| (self.cuboid(slot), self.child(slot)))
    }

    /// Leaf slots whose value equals `value`.
    pub fn leaves_with_value(&self, value: V) -> SlotMask {
        let mut mask = SlotMask::empty();
        for slot in 0..self.leaf_end {
            if self.slots[slot] == Slot::Leaf(value) {
                mask.set(slot);
            }
        }
        mask
    }

    pub fn offset_for(&self, child: NodeIndex) -> usize {
        match (self.child_begin..N).find(|&slot| self.slots[slot] == Slot::Branch(child)) {
            Some(slot) => slot,
            None => panic!("node {:?} is not a child of this node", child),
        }
    }

    #[inline(always)]
    fn assert_capacity(&self) {
        if self.is_full() {
            panic!("{}", RTreeError::CapacityExceeded { capacity: N });
        }
    }

    pub fn insert_leaf(&mut self, cuboid: &Cuboid, value: V) {
        self.assert_capacity();
        self.cuboids.insert(self.leaf_end, cuboid);
        self.slots[self.leaf_end] = Slot::Leaf(value);
        self.leaf_end += 1;
    }

    pub fn insert_branch(&mut self, cuboid: &Cuboid, child: NodeIndex) {
        self.assert_capacity();
        self.child_begin -= 1;
        self.cuboids.insert(self.child_begin, cuboid);
        self.slots[self.child_begin] = Slot::Branch(child);
    }

    pub fn erase_leaf(&mut self, slot: usize) {
        debug_assert!(slot < self.leaf_end);
        let last = self.leaf_end - 1;
        if slot != last {
            let moved = self.cuboids.get(last);
            self.cuboids.insert(slot, &moved);
            self.slots[slot] = self.slots[last];
        }
        self.cuboids.erase(last);
        self.slots[last] = Slot::Empty;
        self.leaf_end = last;
    }

    pub fn erase_branch(&mut self, slot: usize) {
        debug_assert!(slot >= self.child_begin && slot < N);
        let first = self.child_begin;
        if slot != first {
            let moved = self.cuboids.get(first);
            self.cuboids.insert(slot, &moved);
            self.slots[slot] = self.slots[first];
        }
        self.cuboids.erase(first);
        self.slots[first] = Slot::Empty;
        self.child_begin = first + 1;
    }

    /// Drops every masked slot, leaves and branches alike, and repacks the rest.
    pub fn erase_by_mask(&mut self, mask: SlotMask) {
        let mut cuboids = self.cuboids.clone();
        cuboids.erase_by_mask(mask);
        let slots = self.slots;
        self.clear();
        for (slot, entry) in slots.iter().enumerate() {
            if cuboids.is_null(slot) {
                continue;
            }
            match *entry {
                Slot::Leaf(value) => self.insert_leaf(&cuboids.get(slot), value),
                Slot::Branch(child) => self.insert_branch(&cuboids.get(slot), child),
                Slot::Empty => {}
            }
        }
    }

    pub fn clear(&mut self) {
        self.cuboids.clear();
        self.slots = [Slot::Empty; N];
        self.leaf_end = 0;
        self.child_begin = N;
    }

    pub fn update_leaf(&mut self, slot: usize, cuboid: &Cuboid, value: V) {
        debug_assert!(slot < self.leaf_end);
        self.cuboids.insert(slot, cuboid);
        self.slots[slot] = Slot::Leaf(value);
    }

    pub fn update_branch_boundary(&mut self, slot: usize, cuboid: &Cuboid) {
        debug_assert!(slot >= self.child_begin);
        self.cuboids.insert(slot, cuboid);
    }

    pub fn update_child_index(&mut self, old: NodeIndex, new: NodeIndex) {
        let slot = self.offset_for(old);
        self.slots[slot] = Slot::Branch(new);
    }

    pub fn boundary(&self) -> Option<Cuboid> {
        self.cuboids.boundary()
    }

    /// Hilbert position of the boundary's center, with coordinates scaled
    /// from `bounds` onto a cube of side `2^order`. Empty nodes sort last.
    pub fn sort_order(&self, bounds: &Cuboid, order: u32) -> u64 {
        let center = match self.boundary() {
            Some(boundary) => boundary.center(),
            None => return u64::MAX,
        };
        let scale = (1i128 << order) - 1;
        let mut scaled = [0u32; 3];
        for (axis, value) in scaled.iter_mut().enumerate() {
            let span = bounds.high.axis(axis) as i128 - bounds.low.axis(axis) as i128;
            if span <= 0 {
                continue;
            }
            let offset = (center.axis(axis) as i128 - bounds.low.axis(axis) as i128).clamp(0, span);
            *value = (offset * scale / span) as u32;
        }
        hilbert_index(scaled, order)
    }

    pub fn leaf_volume(&self) -> Volume {
        (0..self.leaf_end).map(|slot| self.cuboid(slot).volume()).sum()
    }

    pub fn node_volume(&self) -> Volume {
        (self.child_begin..N).map(|slot| self.cuboid(slot).volume()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuboid(x: i32) -> Cuboid {
        Cuboid::from_coords([x, 0, 0], [x, 0, 0])
    }

    #[test]
    fn leaves_and_branches_share_slots() {
        let mut node = Node::<u8, 4>::new(None);
        node.insert_leaf(&cuboid(0), 1);
        node.insert_leaf(&cuboid(1), 2);
        node.insert_branch(&cuboid(5), NodeIndex(7));
        assert_eq!(node.leaf_count(), 2);
        assert_eq!(node.child_count(), 1);
        assert_eq!(node.unused_capacity(), 1);
        assert_eq!(node.child(3), NodeIndex(7));
        assert_eq!(node.offset_for(NodeIndex(7)), 3);
        node.insert_branch(&cuboid(6), NodeIndex(8));
        assert!(node.is_full());
        assert_eq!(node.leaf_mask().bits(), 0b0011);
        assert_eq!(node.branch_mask().bits(), 0b1100);
    }

    #[test]
    fn erase_moves_boundary_entry() {
        let mut node = Node::<u8, 4>::new(None);
        node.insert_leaf(&cuboid(0), 1);
        node.insert_leaf(&cuboid(1), 2);
        node.insert_leaf(&cuboid(2), 3);
        node.erase_leaf(0);
        assert_eq!(node.leaf_count(), 2);
        assert_eq!(node.cuboid(0), cuboid(2));
        assert_eq!(node.leaf_value(0), 3);
        assert!(node.cuboids.is_null(2));

        node.insert_branch(&cuboid(8), NodeIndex(1));
        node.insert_branch(&cuboid(9), NodeIndex(2));
        node.erase_branch(3);
        assert_eq!(node.child_count(), 1);
        assert_eq!(node.child(3), NodeIndex(2));
        assert_eq!(node.cuboid(3), cuboid(9));
    }

    #[test]
    fn erase_by_mask_repacks() {
        let mut node = Node::<u8, 4>::new(Some(NodeIndex(0)));
        node.insert_leaf(&cuboid(0), 1);
        node.insert_leaf(&cuboid(1), 2);
        node.insert_leaf(&cuboid(2), 3);
        node.insert_branch(&cuboid(9), NodeIndex(4));
        node.erase_by_mask(SlotMask::single(0) | SlotMask::single(3));
        assert_eq!(node.leaf_count(), 2);
        assert_eq!(node.child_count(), 0);
        assert_eq!(node.leaves().map(|(_, v)| v).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(node.leaves_with_value(3).bits(), 0b10);
    }

    #[test]
    fn sort_order_follows_center() {
        let bounds = Cuboid::from_coords([0, 0, 0], [7, 7, 7]);
        let mut low = Node::<u8, 4>::new(None);
        low.insert_leaf(&Cuboid::from_coords([0, 0, 0], [1, 1, 1]), 1);
        let mut high = Node::<u8, 4>::new(None);
        high.insert_leaf(&Cuboid::from_coords([6, 6, 6], [7, 7, 7]), 1);
        assert_eq!(low.sort_order(&bounds, 3), 0);
        assert_ne!(high.sort_order(&bounds, 3), 0);
        assert_eq!(Node::<u8, 4>::new(None).sort_order(&bounds, 3), u64::MAX);
    }

    #[test]
    #[should_panic(expected = "node capacity exceeded")]
    fn insert_into_full_node_panics() {
        let mut node = Node::<(), 2>::new(None);
        node.insert_leaf(&cuboid(0), ());
        node.insert_leaf(&cuboid(1), ());
        node.insert_leaf(&cuboid(2), ());
    }
}
