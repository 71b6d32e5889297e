use common::shapes::{Cuboid, CuboidSet, ParameterizedLine, Point3D, ShapeEnum, Sphere};

use super::cuboid_array::{CuboidArray, SlotMask, NULL_COORDINATE};
use crate::error::{RTreeError, RTreeResult};

/// A shape the tree can be searched with.
pub trait QueryShape {
    /// Rejects shapes that cannot be evaluated against the grid.
    fn validate(&self) -> RTreeResult<()>;

    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask;

    /// Bottom face hits used by the low z policy. Lines differ from the
    /// full test; everything else does not.
    fn intersecting_low_z<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        self.intersecting(cuboids)
    }

    /// A grid point shared by `self` and `cuboid`, if one exists.
    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D>;
}

pub(crate) fn validate_point(point: &Point3D) -> RTreeResult<()> {
    if point.to_array().contains(&NULL_COORDINATE) {
        return Err(RTreeError::invalid_shape(format!(
            "coordinate {} is reserved ({:?})",
            NULL_COORDINATE, point
        )));
    }
    Ok(())
}

pub(crate) fn validate_cuboid(cuboid: &Cuboid) -> RTreeResult<()> {
    if !cuboid.is_ordered() {
        return Err(RTreeError::invalid_shape(format!(
            "cuboid low corner must not exceed high corner ({:?})",
            cuboid
        )));
    }
    validate_point(&cuboid.low)?;
    validate_point(&cuboid.high)
}

impl QueryShape for Point3D {
    fn validate(&self) -> RTreeResult<()> {
        validate_point(self)
    }

    #[inline(always)]
    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        cuboids.intersecting_point(self)
    }

    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        cuboid.contains_point(self).then_some(*self)
    }
}

impl QueryShape for Cuboid {
    fn validate(&self) -> RTreeResult<()> {
        validate_cuboid(self)
    }

    #[inline(always)]
    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        cuboids.intersecting_cuboid(self)
    }

    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        self.intersection(cuboid).map(|overlap| overlap.low)
    }
}

impl QueryShape for Sphere {
    fn validate(&self) -> RTreeResult<()> {
        if self.radius < 0 {
            return Err(RTreeError::invalid_shape(format!(
                "sphere radius must be non-negative (radius: {})",
                self.radius
            )));
        }
        validate_point(&self.center)
    }

    #[inline(always)]
    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        cuboids.intersecting_sphere(self)
    }

    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        let nearest = cuboid.clamp(&self.center);
        self.contains_point(&nearest).then_some(nearest)
    }
}

impl QueryShape for ParameterizedLine {
    fn validate(&self) -> RTreeResult<()> {
        if self.is_degenerate() {
            return Err(RTreeError::invalid_shape(format!(
                "line begin and end must differ ({:?})",
                self.begin
            )));
        }
        validate_point(&self.begin)?;
        validate_point(&self.end)
    }

    #[inline(always)]
    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        cuboids.intersecting_line(self)
    }

    #[inline(always)]
    fn intersecting_low_z<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        cuboids.intersecting_line_low_z(self)
    }

    /// Uses the same face crossings as [`CuboidArray::intersecting_line`].
    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        self.entry_point(cuboid)
    }
}

impl QueryShape for CuboidSet {
    fn validate(&self) -> RTreeResult<()> {
        if self.is_empty() {
            return Err(RTreeError::invalid_shape("cuboid set is empty"));
        }
        self.iter().try_for_each(validate_cuboid)
    }

    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        let mut output = SlotMask::empty();
        for cuboid in self {
            output |= cuboids.intersecting_cuboid(cuboid);
        }
        output
    }

    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        self.iter().find_map(|member| member.intersection_point(cuboid))
    }
}

impl QueryShape for ShapeEnum {
    fn validate(&self) -> RTreeResult<()> {
        match self {
            ShapeEnum::Point(point) => point.validate(),
            ShapeEnum::Cuboid(cuboid) => cuboid.validate(),
            ShapeEnum::Sphere(sphere) => sphere.validate(),
            ShapeEnum::Line(line) => line.validate(),
            ShapeEnum::CuboidSet(set) => set.validate(),
        }
    }

    fn intersecting<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        match self {
            ShapeEnum::Point(point) => point.intersecting(cuboids),
            ShapeEnum::Cuboid(cuboid) => cuboid.intersecting(cuboids),
            ShapeEnum::Sphere(sphere) => sphere.intersecting(cuboids),
            ShapeEnum::Line(line) => line.intersecting(cuboids),
            ShapeEnum::CuboidSet(set) => set.intersecting(cuboids),
        }
    }

    fn intersecting_low_z<const N: usize>(&self, cuboids: &CuboidArray<N>) -> SlotMask {
        match self {
            ShapeEnum::Line(line) => line.intersecting_low_z(cuboids),
            other => other.intersecting(cuboids),
        }
    }

    fn intersection_point(&self, cuboid: &Cuboid) -> Option<Point3D> {
        match self {
            ShapeEnum::Point(point) => point.intersection_point(cuboid),
            ShapeEnum::Cuboid(shape) => shape.intersection_point(cuboid),
            ShapeEnum::Sphere(sphere) => sphere.intersection_point(cuboid),
            ShapeEnum::Line(line) => line.intersection_point(cuboid),
            ShapeEnum::CuboidSet(set) => set.intersection_point(cuboid),
        }
    }
}
