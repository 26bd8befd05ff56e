//! Math type re-exports and bounding boxes.
//!
//! Positions use `glam`; boxes are single precision to match the GPU
//! storage buffers the collapsed tree is uploaded into.

pub use glam::Vec3;

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Axis-aligned bounding box with single precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a bounding box from a single point.
    #[inline]
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Create the tight box around a set of points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.expand_by_point(p);
        }
        b
    }

    /// Check if this box is empty (inverted on some axis).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Union of two boxes.
    #[inline]
    pub fn union(mut self, other: &Self) -> Self {
        self.expand_by_box(other);
        self
    }

    /// Surface area (for SAH cost). Zero for empty boxes.
    #[inline]
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents) of the box.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// True if `other` lies entirely inside this box.
    #[inline]
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty() || (self.min.cmple(other.min).all() && self.max.cmpge(other.max).all())
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb() {
        let mut b = Aabb::EMPTY;
        assert!(b.is_empty());
        assert_eq!(b.area(), 0.0);

        b.expand_by_point(Vec3::ZERO);
        assert!(!b.is_empty());
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ZERO);

        b.expand_by_point(Vec3::ONE);
        assert_eq!(b.center(), Vec3::splat(0.5));
        assert_eq!(b.size(), Vec3::ONE);
        assert_eq!(b.area(), 6.0);
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.union(&Aabb::EMPTY), a);
        assert_eq!(Aabb::EMPTY.union(&a), a);

        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(3.0));
        assert!(u.contains_box(&a) && u.contains_box(&b));
        assert!(!a.contains_box(&u));
    }

    #[test]
    fn test_flat_box_has_area() {
        // Triangles in a plane still give a non-zero SAH weight.
        let b = Aabb::from_points([Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)]);
        assert_eq!(b.area(), 4.0);
    }

    #[test]
    fn test_aabb_pod() {
        assert_eq!(std::mem::size_of::<Aabb>(), 24);
    }
}
