use common::shapes::{Cuboid, Volume};
use std::cmp::Ordering;

/// Two slots considered for merging when a node overflows, with the
/// bounding cuboid they would share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SplitCandidate {
    pub(crate) first: usize,
    pub(crate) second: usize,
    pub(crate) merged: Cuboid,
    /// Volume of `merged` not covered by either input. Negative when the
    /// inputs overlap.
    pub(crate) waste: i128,
    pub(crate) volume: Volume,
}

impl SplitCandidate {
    pub(crate) fn new(first: usize, second: usize, a: &Cuboid, b: &Cuboid) -> Self {
        let merged = a.union(b);
        let volume = merged.volume();
        let waste = volume as i128 - (a.volume() as i128 + b.volume() as i128);
        Self {
            first,
            second,
            merged,
            waste,
            volume,
        }
    }

    /// Exact when the two inputs tile `merged` with nothing left over.
    pub(crate) fn is_exact(&self) -> bool {
        self.waste == 0
    }
}

/// Less waste first; on equal waste the smaller merged volume.
pub(crate) fn compare_split_candidates(a: &SplitCandidate, b: &SplitCandidate) -> Ordering {
    a.waste.cmp(&b.waste).then(a.volume.cmp(&b.volume))
}

/// Exhaustive search over every unordered pair. The earliest pair wins ties.
pub(crate) fn find_pair_with_least_waste(cuboids: &[Cuboid]) -> Option<SplitCandidate> {
    let mut best: Option<SplitCandidate> = None;
    for first in 0..cuboids.len() {
        for second in first + 1..cuboids.len() {
            let candidate = SplitCandidate::new(first, second, &cuboids[first], &cuboids[second]);
            let better = match &best {
                Some(current) => compare_split_candidates(&candidate, current) == Ordering::Less,
                None => true,
            };
            if better {
                best = Some(candidate);
            }
        }
    }
    best
}
