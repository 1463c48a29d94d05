//! Node transform stacks
//!
//! A node's local matrix is the product of its transform elements in
//! document order. Look-at and skew elements are rejected when the stack is
//! built, so evaluation never fails.

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::document::{TransformDesc, TransformKind};
use crate::error::{BakeError, BakeResult};

/// Maximum elements per node
pub const MAX_TRANSFORMS: usize = 8;

/// Raw element parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    /// Row-major 4x4
    Matrix([f32; 16]),
    /// Axis xyz, angle in degrees
    Rotate([f32; 4]),
    Translate([f32; 3]),
    Scale([f32; 3]),
}

impl TransformOp {
    fn from_desc(node: &str, desc: &TransformDesc) -> BakeResult<Self> {
        fn take<const N: usize>(node: &str, desc: &TransformDesc) -> BakeResult<[f32; N]> {
            desc.values.as_slice().try_into().map_err(|_| {
                BakeError::invalid(
                    format!("node '{}'", node),
                    format!(
                        "{:?} transform needs {} values, found {}",
                        desc.kind,
                        N,
                        desc.values.len()
                    ),
                )
            })
        }

        match desc.kind {
            TransformKind::Matrix => Ok(Self::Matrix(take(node, desc)?)),
            TransformKind::Rotate => Ok(Self::Rotate(take(node, desc)?)),
            TransformKind::Translate => Ok(Self::Translate(take(node, desc)?)),
            TransformKind::Scale => Ok(Self::Scale(take(node, desc)?)),
            TransformKind::Lookat | TransformKind::Skew => Err(BakeError::UnsupportedTransform {
                node: node.to_string(),
                kind: format!("{:?}", desc.kind).to_lowercase(),
            }),
        }
    }

    pub fn params(&self) -> &[f32] {
        match self {
            Self::Matrix(p) => p,
            Self::Rotate(p) => p,
            Self::Translate(p) | Self::Scale(p) => p,
        }
    }

    pub fn params_mut(&mut self) -> &mut [f32] {
        match self {
            Self::Matrix(p) => p,
            Self::Rotate(p) => p,
            Self::Translate(p) | Self::Scale(p) => p,
        }
    }

    /// This element's own matrix
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Matrix(m) => Mat4::from_cols_array(&m).transpose(),
            Self::Rotate([x, y, z, degrees]) => {
                let axis = Vec3::new(x, y, z).normalize_or_zero();
                if axis == Vec3::ZERO {
                    Mat4::IDENTITY
                } else {
                    Mat4::from_axis_angle(axis, degrees.to_radians())
                }
            }
            Self::Translate(t) => Mat4::from_translation(Vec3::from_array(t)),
            Self::Scale(s) => Mat4::from_scale(Vec3::from_array(s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformElement {
    pub sid: Option<String>,
    pub op: TransformOp,
}

/// Ordered transform elements of one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformStack {
    elements: SmallVec<[TransformElement; MAX_TRANSFORMS]>,
}

impl TransformStack {
    pub fn from_descs(node: &str, descs: &[TransformDesc]) -> BakeResult<Self> {
        if descs.len() > MAX_TRANSFORMS {
            return Err(BakeError::TooManyTransforms {
                node: node.to_string(),
                count: descs.len(),
                max: MAX_TRANSFORMS,
            });
        }
        let elements = descs
            .iter()
            .map(|d| {
                Ok(TransformElement {
                    sid: d.sid.clone(),
                    op: TransformOp::from_desc(node, d)?,
                })
            })
            .collect::<BakeResult<_>>()?;
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[TransformElement] {
        &self.elements
    }

    pub fn element_mut(&mut self, index: usize) -> Option<&mut TransformElement> {
        self.elements.get_mut(index)
    }

    /// Index of the element with the given sid
    pub fn find_sid(&self, sid: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.sid.as_deref() == Some(sid))
    }

    /// Product of all element matrices in document order
    pub fn compose(&self) -> Mat4 {
        self.elements
            .iter()
            .fold(Mat4::IDENTITY, |acc, e| acc * e.op.matrix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(kind: TransformKind, sid: &str, values: &[f32]) -> TransformDesc {
        TransformDesc {
            kind,
            sid: Some(sid.to_string()),
            values: values.to_vec(),
        }
    }

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn test_matrix_is_transposed() {
        // row-major translation (1, 2, 3)
        let row_major = [
            1.0, 0.0, 0.0, 1.0, //
            0.0, 1.0, 0.0, 2.0, //
            0.0, 0.0, 1.0, 3.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let m = TransformOp::Matrix(row_major).matrix();
        assert_eq!(m, Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_rotate_uses_degrees() {
        let m = TransformOp::Rotate([0.0, 0.0, 1.0, 90.0]).matrix();
        let p = m.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::Y, 1e-6));
        assert_eq!(TransformOp::Rotate([0.0, 0.0, 0.0, 45.0]).matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_compose_in_document_order() {
        let stack = TransformStack::from_descs(
            "n",
            &[
                desc(TransformKind::Translate, "t", &[5.0, 0.0, 0.0]),
                desc(TransformKind::Rotate, "rz", &[0.0, 0.0, 1.0, 90.0]),
                desc(TransformKind::Scale, "s", &[2.0, 2.0, 2.0]),
            ],
        )
        .unwrap();
        let expected = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0))
            * Mat4::from_rotation_z(90f32.to_radians())
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(approx(stack.compose(), expected));
        // point (1,0,0): scaled to 2, rotated to (0,2,0), translated to (5,2,0)
        let p = stack.compose().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(5.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_find_sid_and_edit() {
        let mut stack = TransformStack::from_descs(
            "n",
            &[desc(TransformKind::Translate, "location", &[0.0, 0.0, 0.0])],
        )
        .unwrap();
        let i = stack.find_sid("location").unwrap();
        stack.element_mut(i).unwrap().op.params_mut()[1] = 4.0;
        assert_eq!(stack.compose(), Mat4::from_translation(Vec3::new(0.0, 4.0, 0.0)));
        assert!(stack.find_sid("missing").is_none());
    }

    #[test]
    fn test_rejects_lookat_and_skew() {
        for kind in [TransformKind::Lookat, TransformKind::Skew] {
            let err = TransformStack::from_descs("cam", &[desc(kind, "x", &[0.0; 9])]).unwrap_err();
            assert!(matches!(err, BakeError::UnsupportedTransform { ref node, .. } if node == "cam"));
        }
    }

    #[test]
    fn test_rejects_wrong_value_count() {
        let err = TransformStack::from_descs("n", &[desc(TransformKind::Translate, "t", &[1.0])])
            .unwrap_err();
        assert!(matches!(err, BakeError::InvalidData { .. }));
    }

    #[test]
    fn test_too_many_transforms() {
        let descs: Vec<_> = (0..9)
            .map(|i| desc(TransformKind::Scale, &format!("s{i}"), &[1.0, 1.0, 1.0]))
            .collect();
        assert!(matches!(
            TransformStack::from_descs("n", &descs).unwrap_err(),
            BakeError::TooManyTransforms { count: 9, .. }
        ));
    }
}
