use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::Debug;

pub type Coordinate = i32;

/// Volumes are inclusive cell counts and can exceed 64 bits for huge cuboids.
pub type Volume = u128;

pub trait Shape: Debug {
    fn bounding_box(&self) -> Cuboid;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: Coordinate,
    pub y: Coordinate,
    pub z: Coordinate,
}

impl Point3D {
    pub const fn new(x: Coordinate, y: Coordinate, z: Coordinate) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub fn axis(&self, axis: usize) -> Coordinate {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    #[inline(always)]
    pub fn set_axis(&mut self, axis: usize, value: Coordinate) {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
    }

    pub fn to_array(self) -> [Coordinate; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(data: [Coordinate; 3]) -> Self {
        Self::new(data[0], data[1], data[2])
    }

    /// Per-axis minimum. Not the lexicographic `Ord::min`.
    pub fn component_min(&self, other: &Point3D) -> Point3D {
        Point3D::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn component_max(&self, other: &Point3D) -> Point3D {
        Point3D::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn distance_squared(&self, other: &Point3D) -> i128 {
        (0..3)
            .map(|axis| {
                let d = self.axis(axis) as i128 - other.axis(axis) as i128;
                d * d
            })
            .sum()
    }
}

impl Shape for Point3D {
    fn bounding_box(&self) -> Cuboid {
        Cuboid::from_point(*self)
    }
}

/// Axis-aligned box on the integer grid. Both corners are inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cuboid {
    pub low: Point3D,
    pub high: Point3D,
}

impl Cuboid {
    pub const fn new(low: Point3D, high: Point3D) -> Self {
        Self { low, high }
    }

    pub const fn from_point(point: Point3D) -> Self {
        Self {
            low: point,
            high: point,
        }
    }

    pub fn from_coords(low: [Coordinate; 3], high: [Coordinate; 3]) -> Self {
        Self::new(Point3D::from_array(low), Point3D::from_array(high))
    }

    /// False when any axis has `low > high`.
    pub fn is_ordered(&self) -> bool {
        self.low.x <= self.high.x && self.low.y <= self.high.y && self.low.z <= self.high.z
    }

    #[inline(always)]
    pub fn extent(&self, axis: usize) -> i64 {
        self.high.axis(axis) as i64 - self.low.axis(axis) as i64 + 1
    }

    pub fn volume(&self) -> Volume {
        (0..3).map(|axis| self.extent(axis) as Volume).product()
    }

    pub fn contains_point(&self, point: &Point3D) -> bool {
        (0..3).all(|axis| {
            self.low.axis(axis) <= point.axis(axis) && point.axis(axis) <= self.high.axis(axis)
        })
    }

    pub fn contains(&self, other: &Cuboid) -> bool {
        self.contains_point(&other.low) && self.contains_point(&other.high)
    }

    pub fn intersects(&self, other: &Cuboid) -> bool {
        (0..3).all(|axis| {
            self.low.axis(axis) <= other.high.axis(axis)
                && other.low.axis(axis) <= self.high.axis(axis)
        })
    }

    pub fn intersection(&self, other: &Cuboid) -> Option<Cuboid> {
        if !self.intersects(other) {
            return None;
        }
        Some(Cuboid::new(self.low.component_max(&other.low), self.high.component_min(&other.high)))
    }

    pub fn union(&self, other: &Cuboid) -> Cuboid {
        Cuboid::new(self.low.component_min(&other.low), self.high.component_max(&other.high))
    }

    /// Faces share a plane or the boxes overlap; diagonal contact counts.
    pub fn is_touching(&self, other: &Cuboid) -> bool {
        (0..3).all(|axis| {
            other.high.axis(axis) as i64 + 1 >= self.low.axis(axis) as i64
                && other.low.axis(axis) as i64 <= self.high.axis(axis) as i64 + 1
        })
    }

    pub fn center(&self) -> Point3D {
        let mid = |axis: usize| {
            ((self.low.axis(axis) as i64 + self.high.axis(axis) as i64).div_euclid(2)) as Coordinate
        };
        Point3D::new(mid(0), mid(1), mid(2))
    }

    /// Nearest point of the cuboid to `point`.
    pub fn clamp(&self, point: &Point3D) -> Point3D {
        Point3D::new(
            point.x.clamp(self.low.x, self.high.x),
            point.y.clamp(self.low.y, self.high.y),
            point.z.clamp(self.low.z, self.high.z),
        )
    }

    /// Pieces of `self` left over after cutting out `split`, which is
    /// clamped to `self` first. At most six, ordered above z, below z,
    /// higher y, lower y, higher x, lower x. Empty when `split` covers
    /// `self`; `[self]` when they do not intersect.
    pub fn split_by(&self, split: &Cuboid) -> SmallVec<[Cuboid; 6]> {
        let mut output = SmallVec::new();
        let split = match self.intersection(split) {
            Some(split) => split,
            None => {
                output.push(*self);
                return output;
            }
        };
        if split.high.z < self.high.z {
            output.push(Cuboid::new(
                Point3D::new(self.low.x, self.low.y, split.high.z + 1),
                self.high,
            ));
        }
        if split.low.z > self.low.z {
            output.push(Cuboid::new(
                self.low,
                Point3D::new(self.high.x, self.high.y, split.low.z - 1),
            ));
        }
        if split.high.y < self.high.y {
            output.push(Cuboid::new(
                Point3D::new(self.low.x, split.high.y + 1, split.low.z),
                Point3D::new(self.high.x, self.high.y, split.high.z),
            ));
        }
        if split.low.y > self.low.y {
            output.push(Cuboid::new(
                Point3D::new(self.low.x, self.low.y, split.low.z),
                Point3D::new(self.high.x, split.low.y - 1, split.high.z),
            ));
        }
        if split.high.x < self.high.x {
            output.push(Cuboid::new(
                Point3D::new(split.high.x + 1, split.low.y, split.low.z),
                Point3D::new(self.high.x, split.high.y, split.high.z),
            ));
        }
        if split.low.x > self.low.x {
            output.push(Cuboid::new(
                Point3D::new(self.low.x, split.low.y, split.low.z),
                Point3D::new(split.low.x - 1, split.high.y, split.high.z),
            ));
        }
        output
    }

    pub fn points(&self) -> impl Iterator<Item = Point3D> + '_ {
        (self.low.z..=self.high.z).flat_map(move |z| {
            (self.low.y..=self.high.y)
                .flat_map(move |y| (self.low.x..=self.high.x).map(move |x| Point3D::new(x, y, z)))
        })
    }

    /// Random cuboid inside `self` with each side at most `max_size` long.
    pub fn random_inside<R: Rng>(&self, max_size: Coordinate, rng: &mut R) -> Cuboid {
        let mut low = Point3D::default();
        let mut high = Point3D::default();
        for axis in 0..3 {
            let a = rng.gen_range(self.low.axis(axis)..=self.high.axis(axis));
            let b = (a + rng.gen_range(0..max_size.max(1))).min(self.high.axis(axis));
            low.set_axis(axis, a);
            high.set_axis(axis, b);
        }
        Cuboid::new(low, high)
    }

    pub fn random_point_inside<R: Rng>(&self, rng: &mut R) -> Point3D {
        Point3D::new(
            rng.gen_range(self.low.x..=self.high.x),
            rng.gen_range(self.low.y..=self.high.y),
            rng.gen_range(self.low.z..=self.high.z),
        )
    }
}

impl Shape for Cuboid {
    fn bounding_box(&self) -> Cuboid {
        *self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3D,
    pub radius: Coordinate,
}

impl Sphere {
    pub const fn new(center: Point3D, radius: Coordinate) -> Self {
        Self { center, radius }
    }

    pub fn radius_squared(&self) -> i128 {
        self.radius as i128 * self.radius as i128
    }

    pub fn contains_point(&self, point: &Point3D) -> bool {
        self.center.distance_squared(point) <= self.radius_squared()
    }

    pub fn intersects(&self, cuboid: &Cuboid) -> bool {
        self.contains_point(&cuboid.clamp(&self.center))
    }
}

impl Shape for Sphere {
    fn bounding_box(&self) -> Cuboid {
        let r = self.radius;
        Cuboid::new(
            Point3D::new(
                self.center.x.saturating_sub(r),
                self.center.y.saturating_sub(r),
                self.center.z.saturating_sub(r),
            ),
            Point3D::new(
                self.center.x.saturating_add(r),
                self.center.y.saturating_add(r),
                self.center.z.saturating_add(r),
            ),
        )
    }
}

/// Segment between two grid points. `slope` is the per-axis delta, so
/// `begin + slope * t` for `t` in `0..=1` walks the segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParameterizedLine {
    pub begin: Point3D,
    pub end: Point3D,
    pub slope: [f64; 3],
    pub boundary: Cuboid,
}

impl ParameterizedLine {
    pub fn new(begin: Point3D, end: Point3D) -> Self {
        let slope = [
            end.x as f64 - begin.x as f64,
            end.y as f64 - begin.y as f64,
            end.z as f64 - begin.z as f64,
        ];
        Self {
            begin,
            end,
            slope,
            boundary: Cuboid::new(begin.component_min(&end), begin.component_max(&end)),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.begin == self.end
    }

    /// Number of unit steps the rasterised walk takes.
    pub fn steps(&self) -> u64 {
        (0..3)
            .map(|axis| (self.end.axis(axis) as i64 - self.begin.axis(axis) as i64).unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// Where the segment meets the plane `axis == face`, with the other two
    /// coordinates rounded to the grid. `None` when the segment runs parallel
    /// to the plane or the crossing falls outside its bounding box.
    pub fn crossing(&self, axis: usize, face: Coordinate) -> Option<Point3D> {
        if self.slope[axis] == 0.0 {
            return None;
        }
        let steps = (face as f64 - self.begin.axis(axis) as f64) / self.slope[axis];
        let mut point = self.begin;
        for other in 0..3 {
            let coordinate = if other == axis {
                face as i64
            } else {
                self.begin.axis(other) as i64 + (self.slope[other] * steps).round() as i64
            };
            if coordinate < self.boundary.low.axis(other) as i64
                || coordinate > self.boundary.high.axis(other) as i64
            {
                return None;
            }
            point.set_axis(other, coordinate as Coordinate);
        }
        Some(point)
    }

    /// First grid point of `cuboid` the segment reaches: `begin` when it
    /// starts inside, otherwise the nearest face crossing that lands in it.
    pub fn entry_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        if cuboid.contains_point(&self.begin) {
            return Some(self.begin);
        }
        (0..3)
            .flat_map(|axis| {
                [cuboid.low.axis(axis), cuboid.high.axis(axis)]
                    .into_iter()
                    .filter_map(move |face| self.crossing(axis, face))
            })
            .filter(|point| cuboid.contains_point(point))
            .min_by_key(|point| self.begin.distance_squared(point))
    }

    /// Grid cells visited from `begin` to `end`, both included.
    pub fn points(&self) -> impl Iterator<Item = Point3D> + '_ {
        let steps = self.steps();
        (0..=steps).map(move |step| {
            if steps == 0 {
                return self.begin;
            }
            let t = step as f64 / steps as f64;
            let mut point = self.begin;
            for axis in 0..3 {
                let offset = (self.slope[axis] * t).round() as i64;
                point.set_axis(axis, (self.begin.axis(axis) as i64 + offset) as Coordinate);
            }
            point
        })
    }
}

impl Shape for ParameterizedLine {
    fn bounding_box(&self) -> Cuboid {
        self.boundary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuboidSet {
    cuboids: Vec<Cuboid>,
}

impl CuboidSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cuboid: Cuboid) {
        if !self.cuboids.contains(&cuboid) {
            self.cuboids.push(cuboid);
        }
    }

    pub fn len(&self) -> usize {
        self.cuboids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuboids.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cuboid> {
        self.cuboids.iter()
    }

    pub fn volume(&self) -> Volume {
        self.cuboids.iter().map(Cuboid::volume).sum()
    }

    pub fn contains_point(&self, point: &Point3D) -> bool {
        self.cuboids.iter().any(|cuboid| cuboid.contains_point(point))
    }

    pub fn as_slice(&self) -> &[Cuboid] {
        &self.cuboids
    }
}

impl FromIterator<Cuboid> for CuboidSet {
    fn from_iter<I: IntoIterator<Item = Cuboid>>(iter: I) -> Self {
        let mut set = CuboidSet::new();
        for cuboid in iter {
            set.add(cuboid);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CuboidSet {
    type Item = &'a Cuboid;
    type IntoIter = std::slice::Iter<'a, Cuboid>;

    fn into_iter(self) -> Self::IntoIter {
        self.cuboids.iter()
    }
}

impl Shape for CuboidSet {
    fn bounding_box(&self) -> Cuboid {
        let mut iter = self.cuboids.iter();
        match iter.next() {
            Some(first) => iter.fold(*first, |acc, cuboid| acc.union(cuboid)),
            None => Cuboid::from_point(Point3D::default()),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ShapeEnum {
    Point(Point3D),
    Cuboid(Cuboid),
    Sphere(Sphere),
    Line(ParameterizedLine),
    CuboidSet(CuboidSet),
}

impl Shape for ShapeEnum {
    fn bounding_box(&self) -> Cuboid {
        match self {
            ShapeEnum::Point(point) => point.bounding_box(),
            ShapeEnum::Cuboid(cuboid) => cuboid.bounding_box(),
            ShapeEnum::Sphere(sphere) => sphere.bounding_box(),
            ShapeEnum::Line(line) => line.bounding_box(),
            ShapeEnum::CuboidSet(set) => set.bounding_box(),
        }
    }
}
