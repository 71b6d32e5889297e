use common::shapes::{Coordinate, Cuboid, ParameterizedLine, Point3D, Sphere};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Marks an unused slot. Never a valid shape coordinate.
pub const NULL_COORDINATE: Coordinate = Coordinate::MAX;

/// One bit per slot of a [`CuboidArray`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SlotMask(u64);

impl SlotMask {
    #[inline(always)]
    pub const fn empty() -> Self {
        SlotMask(0)
    }

    /// Bits `begin..end` set.
    #[inline(always)]
    pub fn range(begin: usize, end: usize) -> Self {
        if begin >= end {
            return SlotMask(0);
        }
        let upper = if end >= 64 { u64::MAX } else { (1u64 << end) - 1 };
        let lower = (1u64 << begin) - 1;
        SlotMask(upper & !lower)
    }

    #[inline(always)]
    pub fn single(slot: usize) -> Self {
        SlotMask(1u64 << slot)
    }

    #[inline(always)]
    pub fn any(self) -> bool {
        self.0 != 0
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn get(self, slot: usize) -> bool {
        self.0 & (1u64 << slot) != 0
    }

    #[inline(always)]
    pub fn set(&mut self, slot: usize) {
        self.0 |= 1u64 << slot;
    }

    #[inline(always)]
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline(always)]
    pub fn first(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// Set slots in ascending order.
    pub fn iter(self) -> SlotMaskIter {
        SlotMaskIter(self.0)
    }
}

impl BitAnd for SlotMask {
    type Output = SlotMask;

    #[inline(always)]
    fn bitand(self, rhs: SlotMask) -> SlotMask {
        SlotMask(self.0 & rhs.0)
    }
}

impl BitAndAssign for SlotMask {
    #[inline(always)]
    fn bitand_assign(&mut self, rhs: SlotMask) {
        self.0 &= rhs.0;
    }
}

impl BitOr for SlotMask {
    type Output = SlotMask;

    #[inline(always)]
    fn bitor(self, rhs: SlotMask) -> SlotMask {
        SlotMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for SlotMask {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: SlotMask) {
        self.0 |= rhs.0;
    }
}

impl Not for SlotMask {
    type Output = SlotMask;

    #[inline(always)]
    fn not(self) -> SlotMask {
        SlotMask(!self.0)
    }
}

pub struct SlotMaskIter(u64);

impl Iterator for SlotMaskIter {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let slot = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(slot)
    }
}

/// Fixed capacity struct-of-arrays cuboid store. Each predicate evaluates
/// every slot with branch-free loops over the per-axis arrays and packs
/// the result into a [`SlotMask`]. Unused slots hold [`NULL_COORDINATE`]
/// in both corners and never satisfy a predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CuboidArray<const N: usize> {
    high: [[Coordinate; N]; 3],
    low: [[Coordinate; N]; 3],
}

impl<const N: usize> Default for CuboidArray<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn pack<const N: usize>(bits: [bool; N]) -> SlotMask {
    let mut mask = 0u64;
    for (slot, bit) in bits.iter().enumerate() {
        mask |= (*bit as u64) << slot;
    }
    SlotMask(mask)
}

impl<const N: usize> CuboidArray<N> {
    const WIDTH_OK: () = assert!(N >= 2 && N <= 64, "node width must be within 2..=64");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::WIDTH_OK;
        Self {
            high: [[NULL_COORDINATE; N]; 3],
            low: [[NULL_COORDINATE; N]; 3],
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    pub fn insert(&mut self, slot: usize, cuboid: &Cuboid) {
        for axis in 0..3 {
            self.high[axis][slot] = cuboid.high.axis(axis);
            self.low[axis][slot] = cuboid.low.axis(axis);
        }
    }

    #[inline(always)]
    pub fn erase(&mut self, slot: usize) {
        for axis in 0..3 {
            self.high[axis][slot] = NULL_COORDINATE;
            self.low[axis][slot] = NULL_COORDINATE;
        }
    }

    pub fn erase_by_mask(&mut self, mask: SlotMask) {
        for slot in mask.iter().take_while(|&slot| slot < N) {
            self.erase(slot);
        }
    }

    pub fn clear(&mut self) {
        self.high = [[NULL_COORDINATE; N]; 3];
        self.low = [[NULL_COORDINATE; N]; 3];
    }

    #[inline(always)]
    pub fn is_null(&self, slot: usize) -> bool {
        self.high[0][slot] == NULL_COORDINATE
    }

    #[inline(always)]
    pub fn get(&self, slot: usize) -> Cuboid {
        Cuboid::new(
            Point3D::new(self.low[0][slot], self.low[1][slot], self.low[2][slot]),
            Point3D::new(self.high[0][slot], self.high[1][slot], self.high[2][slot]),
        )
    }

    /// Smallest cuboid holding every non-null slot.
    pub fn boundary(&self) -> Option<Cuboid> {
        let mut output: Option<Cuboid> = None;
        for slot in 0..N {
            if self.is_null(slot) {
                continue;
            }
            let cuboid = self.get(slot);
            output = Some(match output {
                Some(acc) => acc.union(&cuboid),
                None => cuboid,
            });
        }
        output
    }

    pub fn intersecting_point(&self, point: &Point3D) -> SlotMask {
        let mut bits = [true; N];
        for axis in 0..3 {
            let p = point.axis(axis);
            for slot in 0..N {
                bits[slot] &= self.low[axis][slot] <= p && self.high[axis][slot] >= p;
            }
        }
        pack(bits)
    }

    pub fn intersecting_cuboid(&self, cuboid: &Cuboid) -> SlotMask {
        let mut bits = [true; N];
        for axis in 0..3 {
            let high = cuboid.high.axis(axis);
            let low = cuboid.low.axis(axis);
            for slot in 0..N {
                bits[slot] &= self.low[axis][slot] <= high && self.high[axis][slot] >= low;
            }
        }
        pack(bits)
    }

    pub fn intersecting_sphere(&self, sphere: &Sphere) -> SlotMask {
        let mut distance = [0i128; N];
        for axis in 0..3 {
            let center = sphere.center.axis(axis) as i64;
            for slot in 0..N {
                let nearest = center.clamp(self.low[axis][slot] as i64, self.high[axis][slot] as i64);
                let d = (nearest - center) as i128;
                distance[slot] += d * d;
            }
        }
        let radius_squared = sphere.radius_squared();
        let mut bits = [false; N];
        for slot in 0..N {
            bits[slot] = !self.is_null(slot) && distance[slot] <= radius_squared;
        }
        pack(bits)
    }

    /// Slots crossed by the segment. For every axis the line moves along,
    /// the line is evaluated where it meets the slot's low and high planes
    /// on that axis; a crossing counts when it lands inside the slot's other
    /// two extents and inside the segment's bounding box. A segment starting
    /// inside a slot also counts.
    pub fn intersecting_line(&self, line: &ParameterizedLine) -> SlotMask {
        let mut bits = [false; N];
        let candidates = self.intersecting_cuboid(&line.boundary);
        if candidates.is_empty() {
            return SlotMask::empty();
        }
        let starts_inside = self.intersecting_point(&line.begin);
        for slot in candidates.iter() {
            bits[slot] = starts_inside.get(slot)
                || (0..3).any(|axis| {
                    self.line_meets_face(line, axis, self.low[axis][slot], slot)
                        || self.line_meets_face(line, axis, self.high[axis][slot], slot)
                });
        }
        pack(bits)
    }

    /// Slots the segment enters through their low z face.
    pub fn intersecting_line_low_z(&self, line: &ParameterizedLine) -> SlotMask {
        if line.slope[2] == 0.0 {
            return SlotMask::empty();
        }
        let mut bits = [false; N];
        for slot in self.intersecting_cuboid(&line.boundary).iter() {
            bits[slot] = self.line_meets_face(line, 2, self.low[2][slot], slot);
        }
        pack(bits)
    }

    #[inline(always)]
    fn line_meets_face(
        &self,
        line: &ParameterizedLine,
        axis: usize,
        face: Coordinate,
        slot: usize,
    ) -> bool {
        match line.crossing(axis, face) {
            Some(point) => (0..3).all(|other| {
                other == axis
                    || (point.axis(other) >= self.low[other][slot]
                        && point.axis(other) <= self.high[other][slot])
            }),
            None => false,
        }
    }

    /// Slots entirely inside `cuboid`.
    pub fn contained_by(&self, cuboid: &Cuboid) -> SlotMask {
        let mut bits = [true; N];
        for axis in 0..3 {
            let high = cuboid.high.axis(axis);
            let low = cuboid.low.axis(axis);
            for slot in 0..N {
                bits[slot] &= self.low[axis][slot] >= low && self.high[axis][slot] <= high;
            }
        }
        pack(bits)
    }

    /// Slots entirely inside `sphere`: the farthest corner is within the radius.
    pub fn contained_by_sphere(&self, sphere: &Sphere) -> SlotMask {
        let mut distance = [0i128; N];
        for axis in 0..3 {
            let center = sphere.center.axis(axis) as i64;
            for slot in 0..N {
                let far = (self.low[axis][slot] as i64 - center)
                    .abs()
                    .max((self.high[axis][slot] as i64 - center).abs()) as i128;
                distance[slot] += far * far;
            }
        }
        let radius_squared = sphere.radius_squared();
        let mut bits = [false; N];
        for slot in 0..N {
            bits[slot] = !self.is_null(slot) && distance[slot] <= radius_squared;
        }
        pack(bits)
    }

    /// Slots that fully contain `cuboid`.
    pub fn containing(&self, cuboid: &Cuboid) -> SlotMask {
        let mut bits = [true; N];
        for axis in 0..3 {
            let high = cuboid.high.axis(axis);
            let low = cuboid.low.axis(axis);
            for slot in 0..N {
                bits[slot] &= self.low[axis][slot] <= low && self.high[axis][slot] >= high;
            }
        }
        pack(bits)
    }

    /// Slots overlapping or sharing a face, edge or corner with `cuboid`.
    pub fn touching(&self, cuboid: &Cuboid) -> SlotMask {
        let mut bits = [true; N];
        for axis in 0..3 {
            let high = cuboid.high.axis(axis) as i64 + 1;
            let low = cuboid.low.axis(axis) as i64;
            for slot in 0..N {
                let slot_low = self.low[axis][slot] as i64;
                let slot_high = self.high[axis][slot] as i64 + 1;
                bits[slot] &= !(high < slot_low || low > slot_high);
            }
        }
        let mut output = pack(bits);
        for slot in 0..N {
            if self.is_null(slot) {
                output.0 &= !(1u64 << slot);
            }
        }
        output
    }

    /// Slots whose union with `cuboid` is itself a cuboid with no slack:
    /// two axes match exactly and the boxes touch along the third.
    pub fn mergeable(&self, cuboid: &Cuboid) -> SlotMask {
        let mut shared = [0u8; N];
        for axis in 0..3 {
            let high = cuboid.high.axis(axis);
            let low = cuboid.low.axis(axis);
            for slot in 0..N {
                shared[slot] +=
                    (self.high[axis][slot] == high && self.low[axis][slot] == low) as u8;
            }
        }
        let mut bits = [false; N];
        for slot in 0..N {
            bits[slot] = shared[slot] == 2;
        }
        pack(bits) & self.touching(cuboid)
    }
}
