//! Axis-aligned bounds stored as center + extent
//!
//! # Layout
//! ```text
//! 0x00: center  f32 x 3
//! 0x0C: extent  f32 x 3 (half size)
//! ```

use glam::{Mat4, Vec3};

/// Axis-aligned bounding box (24 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub center: Vec3,
    pub extent: Vec3,
}

impl Aabb {
    pub const SIZE: usize = 24;

    /// Degenerate zero-size box at the origin
    pub const ZERO: Self = Self {
        center: Vec3::ZERO,
        extent: Vec3::ZERO,
    };

    pub fn new(center: Vec3, extent: Vec3) -> Self {
        Self { center, extent }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            extent: (max - min) * 0.5,
        }
    }

    /// Bounds of a point set, or `None` when empty.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self::from_min_max(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extent
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extent
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Conservative bounds of this box after an affine transform.
    ///
    /// The center is transformed as a point; the new extent is
    /// `|M3| * extent` where `|M3|` is the element-wise absolute upper 3x3.
    pub fn transform(&self, m: &Mat4) -> Aabb {
        let center = m.transform_point3(self.center);
        let abs_x = m.x_axis.truncate().abs();
        let abs_y = m.y_axis.truncate().abs();
        let abs_z = m.z_axis.truncate().abs();
        let extent = abs_x * self.extent.x + abs_y * self.extent.y + abs_z * self.extent.z;
        Aabb { center, extent }
    }

    /// Write bounds to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let values = [
            self.center.x,
            self.center.y,
            self.center.z,
            self.extent.x,
            self.extent.y,
            self.extent.z,
        ];
        for (i, v) in values.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// Read bounds from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let f = |i: usize| {
            f32::from_le_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ])
        };
        Some(Self {
            center: Vec3::new(f(0), f(1), f(2)),
            extent: Vec3::new(f(3), f(4), f(5)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_min_max() {
        let b = Aabb::from_min_max(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 2.0));
        assert_eq!(b.center, Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(b.extent, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(b.min(), Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(b.max(), Vec3::new(3.0, 4.0, 2.0));
    }

    #[test]
    fn test_from_points_empty() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_union() {
        let a = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_min_max(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(&b);
        assert_eq!(u.min(), Vec3::ZERO);
        assert_eq!(u.max(), Vec3::splat(3.0));
    }

    #[test]
    fn test_transform_translation() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let t = b.transform(&Mat4::from_translation(Vec3::new(5.0, 0.0, -1.0)));
        assert_eq!(t.center, Vec3::new(5.0, 0.0, -1.0));
        assert_eq!(t.extent, Vec3::ONE);
    }

    #[test]
    fn test_transform_rotation_grows_extent() {
        let b = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let t = b.transform(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_4));
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert!((t.extent.x - s).abs() < 1e-6);
        assert!((t.extent.y - s).abs() < 1e-6);
        assert_eq!(t.extent.z, 0.0);
    }

    #[test]
    fn test_bytes_layout() {
        let b = Aabb::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        let bytes = b.to_bytes();
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[20..24], &6.0f32.to_le_bytes());
        assert_eq!(Aabb::from_bytes(&bytes), Some(b));
        assert!(Aabb::from_bytes(&bytes[..23]).is_none());
    }
}
