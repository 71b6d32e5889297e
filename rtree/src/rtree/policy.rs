use common::shapes::Cuboid;
use std::fmt::Debug;

use super::cuboid_array::{CuboidArray, SlotMask};
use super::shape::QueryShape;

/// Decides which leaves may be fused and what counts as a leaf hit.
pub trait MergePolicy: Debug + Clone + Copy + Default + Send + Sync + 'static {
    /// Whether two mergeable leaves may become `merged`.
    fn can_merge(merged: &Cuboid) -> bool;

    /// Narrows `intersecting` (already limited to leaf slots) to real hits.
    fn leaf_hits<S: QueryShape + ?Sized, const N: usize>(
        shape: &S,
        cuboids: &CuboidArray<N>,
        intersecting: SlotMask,
    ) -> SlotMask;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Standard;

impl MergePolicy for Standard {
    #[inline(always)]
    fn can_merge(_merged: &Cuboid) -> bool {
        true
    }

    #[inline(always)]
    fn leaf_hits<S: QueryShape + ?Sized, const N: usize>(
        _shape: &S,
        _cuboids: &CuboidArray<N>,
        intersecting: SlotMask,
    ) -> SlotMask {
        intersecting
    }
}

/// Leaves stay one z level tall, and lines only hit a leaf by entering its
/// bottom face.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowZOnly;

impl MergePolicy for LowZOnly {
    #[inline(always)]
    fn can_merge(merged: &Cuboid) -> bool {
        merged.low.z == merged.high.z
    }

    #[inline(always)]
    fn leaf_hits<S: QueryShape + ?Sized, const N: usize>(
        shape: &S,
        cuboids: &CuboidArray<N>,
        intersecting: SlotMask,
    ) -> SlotMask {
        if intersecting.is_empty() {
            return intersecting;
        }
        intersecting & shape.intersecting_low_z(cuboids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_z_only_refuses_tall_merges() {
        assert!(LowZOnly::can_merge(&Cuboid::from_coords([0, 0, 3], [5, 5, 3])));
        assert!(!LowZOnly::can_merge(&Cuboid::from_coords([0, 0, 3], [0, 0, 4])));
        assert!(Standard::can_merge(&Cuboid::from_coords([0, 0, 3], [0, 0, 4])));
    }
}
