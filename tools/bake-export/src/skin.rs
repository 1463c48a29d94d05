//! Skin weight packing (variable influence lists -> 4 quantized bones)
//!
//! Each vertex keeps its 4 heaviest influences. Weights are renormalized
//! after truncation and quantized to snorm16 summing to exactly 32767.
//! Per-joint bind-space bounds cover every vertex position that a joint
//! influences through one of the kept slots.

use std::cmp::Ordering;

use bake_common::{quantize_weights_snorm16, Aabb, WEIGHT_ONE};
use glam::Vec3;
use smallvec::SmallVec;

use crate::document::ControllerDesc;
use crate::error::{BakeError, BakeResult};

/// Maximum influences listed for one vertex
pub const MAX_INFLUENCES: usize = 32;

/// Maximum joints per skin (bone indices are stored as u8)
pub const MAX_JOINTS: usize = 256;

/// Bone slots per packed vertex
pub const SKIN_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointInfluence {
    pub bone: u8,
    pub weight: f32,
}

/// Packed skin data of one vertex (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedInfluences {
    pub bones: [u8; SKIN_SLOTS],
    pub weights: [i16; SKIN_SLOTS],
}

impl PackedInfluences {
    pub const SIZE: usize = 12;

    /// Fully bound to bone 0
    pub const RIGID: Self = Self {
        bones: [0; SKIN_SLOTS],
        weights: [WEIGHT_ONE, 0, 0, 0],
    };

    /// Append weights (snorm16 x 4) then bone indices (u8 x 4)
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for w in self.weights {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out.extend_from_slice(&self.bones);
    }
}

/// Skin packed for one controller
#[derive(Debug, Clone)]
pub struct PackedSkin {
    pub controller: String,
    /// Id of the skinned geometry
    pub geometry: String,
    /// One entry per source position element
    pub vertices: Vec<PackedInfluences>,
    /// Bind-space bounds per joint; zero for joints no vertex uses
    pub joint_bounds: Vec<Aabb>,
}

impl PackedSkin {
    /// Packed influences of source position `index`
    pub fn influences(&self, index: u32) -> PackedInfluences {
        self.vertices
            .get(index as usize)
            .copied()
            .unwrap_or(PackedInfluences::RIGID)
    }
}

/// Select the 4 heaviest influences and normalize them.
///
/// Sorting is stable, so equal weights keep their listed order. Slots past
/// the list length get bone 0 and weight 0. Returns the number of used slots.
pub fn select_influences(
    influences: &mut [JointInfluence],
) -> ([u8; SKIN_SLOTS], [f32; SKIN_SLOTS], usize) {
    influences.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));

    let used = influences.len().min(SKIN_SLOTS);
    let mut bones = [0u8; SKIN_SLOTS];
    let mut weights = [0f32; SKIN_SLOTS];
    for (slot, inf) in influences.iter().take(used).enumerate() {
        bones[slot] = inf.bone;
        weights[slot] = inf.weight;
    }

    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    } else {
        weights = [1.0, 0.0, 0.0, 0.0];
    }

    (bones, weights, used)
}

/// Pack the influence lists of `controller` against its geometry's source
/// positions.
pub fn pack_skin(controller: &ControllerDesc, positions: &[Vec3]) -> BakeResult<PackedSkin> {
    let owner = format!("controller '{}'", controller.id);
    let joint_count = controller.joints.len();

    if joint_count > MAX_JOINTS {
        return Err(BakeError::TooManyJoints {
            controller: controller.id.clone(),
            count: joint_count,
            max: MAX_JOINTS,
        });
    }

    let pair_count: usize = controller.vcount.iter().map(|&c| c as usize).sum();
    if pair_count * 2 != controller.v.len() {
        return Err(BakeError::IndexCountMismatch {
            owner,
            expected: pair_count * 2,
            found: controller.v.len(),
        });
    }

    if controller.vcount.len() > positions.len() {
        return Err(BakeError::IndexCountMismatch {
            owner,
            expected: positions.len(),
            found: controller.vcount.len(),
        });
    }

    let mut vertices = Vec::with_capacity(positions.len());
    let mut bounds: Vec<Option<(Vec3, Vec3)>> = vec![None; joint_count];
    let mut pairs = controller.v.chunks_exact(2);
    let mut list: SmallVec<[JointInfluence; 8]> = SmallVec::new();

    for (vertex, &count) in controller.vcount.iter().enumerate() {
        let count = count as usize;
        if count > MAX_INFLUENCES {
            return Err(BakeError::TooManyInfluences {
                controller: controller.id.clone(),
                vertex,
                count,
                max: MAX_INFLUENCES,
            });
        }

        list.clear();
        for pair in pairs.by_ref().take(count) {
            let bone = checked_index(&owner, "joints", pair[0], joint_count)?;
            let weight = checked_index(&owner, "weights", pair[1], controller.weights.len())?;
            list.push(JointInfluence {
                bone: bone as u8,
                weight: controller.weights[weight],
            });
        }

        let (bones, weights, used) = select_influences(&mut list);

        let position = positions[vertex];
        for &bone in &bones[..used] {
            let entry = &mut bounds[bone as usize];
            *entry = Some(match *entry {
                Some((lo, hi)) => (lo.min(position), hi.max(position)),
                None => (position, position),
            });
        }

        vertices.push(PackedInfluences {
            bones,
            weights: quantize_weights_snorm16(weights),
        });
    }

    // Positions past the influence list are bound rigidly to bone 0
    vertices.resize(positions.len(), PackedInfluences::RIGID);

    let joint_bounds: Vec<Aabb> = bounds
        .into_iter()
        .map(|b| b.map_or(Aabb::ZERO, |(lo, hi)| Aabb::from_min_max(lo, hi)))
        .collect();

    tracing::info!(
        "Packed skin '{}': {} vertices, {} joints",
        controller.id,
        controller.vcount.len(),
        joint_count
    );

    Ok(PackedSkin {
        controller: controller.id.clone(),
        geometry: crate::document::strip_url(&controller.skin_source).to_string(),
        vertices,
        joint_bounds,
    })
}

fn checked_index(owner: &str, stream: &str, index: i32, len: usize) -> BakeResult<usize> {
    if index < 0 || index as usize >= len {
        return Err(BakeError::IndexOutOfRange {
            owner: owner.to_string(),
            stream: stream.to_string(),
            index: index as i64,
            len,
        });
    }
    Ok(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inf(bone: u8, weight: f32) -> JointInfluence {
        JointInfluence { bone, weight }
    }

    fn controller(joints: usize, weights: Vec<f32>, vcount: Vec<u32>, v: Vec<i32>) -> ControllerDesc {
        ControllerDesc {
            id: "skin".into(),
            skin_source: "#mesh".into(),
            bind_shape_matrix: glam::Mat4::IDENTITY.to_cols_array(),
            joints: (0..joints).map(|j| format!("j{j}")).collect(),
            inverse_bind_matrices: (0..joints)
                .flat_map(|_| glam::Mat4::IDENTITY.to_cols_array())
                .collect(),
            weights,
            vcount,
            v,
        }
    }

    #[test]
    fn test_top_four_selection() {
        let mut list = vec![
            inf(0, 0.1),
            inf(1, 0.5),
            inf(2, 0.3),
            inf(3, 0.05),
            inf(4, 0.05),
        ];
        let (bones, weights, used) = select_influences(&mut list);
        assert_eq!(bones, [1, 2, 0, 3]);
        assert_eq!(used, 4);
        let sum: f32 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((weights[0] - 0.5 / 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_fewer_than_four_pads_with_zero() {
        let mut list = vec![inf(7, 0.2), inf(3, 0.6)];
        let (bones, weights, used) = select_influences(&mut list);
        assert_eq!(used, 2);
        assert_eq!(bones, [3, 7, 0, 0]);
        assert_eq!(weights[2], 0.0);
        assert_eq!(weights[3], 0.0);
        assert!((weights[0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_zero_weights_bind_first_slot() {
        let mut list = vec![inf(2, 0.0)];
        let (bones, weights, _) = select_influences(&mut list);
        assert_eq!(bones[0], 2);
        assert_eq!(weights, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_tiny_weights_are_normalized() {
        let mut list = vec![inf(4, 1e-8), inf(5, 3e-8)];
        let (bones, weights, used) = select_influences(&mut list);
        assert_eq!(used, 2);
        assert_eq!(bones, [5, 4, 0, 0]);
        assert!((weights[0] - 0.75).abs() < 1e-6, "{weights:?}");
        assert!((weights[1] - 0.25).abs() < 1e-6, "{weights:?}");
    }

    #[test]
    fn test_pack_sums_to_one() {
        let weights = vec![0.1, 0.5, 0.3, 0.05, 0.05, 1.0 / 3.0];
        let c = controller(5, weights, vec![5, 3], vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 0, 5, 1, 5, 2, 5]);
        let positions = vec![Vec3::ZERO, Vec3::ONE];
        let skin = pack_skin(&c, &positions).unwrap();
        assert_eq!(skin.vertices.len(), 2);
        for v in &skin.vertices {
            let sum: i32 = v.weights.iter().map(|&w| w as i32).sum();
            assert!((sum - 32767).abs() <= 1);
        }
        assert_eq!(skin.vertices[0].bones, [1, 2, 0, 3]);
        assert_eq!(skin.geometry, "mesh");
    }

    #[test]
    fn test_joint_bounds_only_for_used_influences() {
        // vertex 0 uses joints 0..3 and drops joint 4
        let weights = vec![0.1, 0.5, 0.3, 0.05, 0.05];
        let c = controller(6, weights, vec![5, 1], vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 1, 1]);
        let positions = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.0, 2.0, 0.0)];
        let skin = pack_skin(&c, &positions).unwrap();

        assert_eq!(skin.joint_bounds.len(), 6);
        assert_eq!(skin.joint_bounds[4], Aabb::ZERO);
        assert_eq!(skin.joint_bounds[5], Aabb::ZERO);
        assert_eq!(skin.joint_bounds[0].center, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(skin.joint_bounds[0].extent, Vec3::ZERO);
        // joint 1 is used by both vertices
        assert_eq!(skin.joint_bounds[1].min(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(skin.joint_bounds[1].max(), Vec3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn test_unlisted_positions_are_rigid() {
        let c = controller(1, vec![1.0], vec![1], vec![0, 0]);
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let skin = pack_skin(&c, &positions).unwrap();
        assert_eq!(skin.vertices.len(), 3);
        assert_eq!(skin.influences(2), PackedInfluences::RIGID);
        assert_eq!(skin.influences(99), PackedInfluences::RIGID);
    }

    #[test]
    fn test_pair_count_mismatch() {
        let c = controller(1, vec![1.0], vec![2], vec![0, 0]);
        assert!(matches!(
            pack_skin(&c, &[Vec3::ZERO]).unwrap_err(),
            BakeError::IndexCountMismatch { expected: 4, found: 2, .. }
        ));
    }

    #[test]
    fn test_bad_joint_index() {
        let c = controller(1, vec![1.0], vec![1], vec![-1, 0]);
        assert!(matches!(
            pack_skin(&c, &[Vec3::ZERO]).unwrap_err(),
            BakeError::IndexOutOfRange { index: -1, .. }
        ));
        let c = controller(1, vec![1.0], vec![1], vec![0, 3]);
        assert!(matches!(
            pack_skin(&c, &[Vec3::ZERO]).unwrap_err(),
            BakeError::IndexOutOfRange { index: 3, .. }
        ));
    }

    #[test]
    fn test_limits() {
        let c = controller(MAX_JOINTS + 1, vec![], vec![], vec![]);
        assert!(matches!(
            pack_skin(&c, &[]).unwrap_err(),
            BakeError::TooManyJoints { .. }
        ));

        let n = MAX_INFLUENCES + 1;
        let c = controller(1, vec![0.1], vec![n as u32], vec![0; n * 2]);
        assert!(matches!(
            pack_skin(&c, &[Vec3::ZERO]).unwrap_err(),
            BakeError::TooManyInfluences { count, .. } if count == n
        ));
    }

    #[test]
    fn test_packed_layout() {
        let p = PackedInfluences {
            bones: [1, 2, 3, 4],
            weights: [100, 200, 300, 32167],
        };
        let mut out = Vec::new();
        p.write_to(&mut out);
        assert_eq!(out.len(), PackedInfluences::SIZE);
        assert_eq!(&out[0..2], &100i16.to_le_bytes());
        assert_eq!(&out[8..12], &[1, 2, 3, 4]);
    }
}
