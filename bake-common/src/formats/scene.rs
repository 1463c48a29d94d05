//! Baked scene binary format (.bmi)
//!
//! # Layout
//! ```text
//! header:    magic u32 (0x57BEDEFE), version u32
//! nodes:     count u32, NodeRecord x count
//! skeletons: count u32, per skeleton:
//!              SkeletonHeader (joint_count u32, bind_shape mat4)
//!              joint node ids   u32  x joint_count
//!              joint matrices   mat4 x joint_count (inverse bind x bind shape)
//!              joint bounds     Aabb x joint_count
//! animation: animated_count u32, animated node ids u32 x animated_count,
//!            sample_count u32, mat4 x (sample_count * animated_count),
//!            Aabb x max(sample_count, 1)
//! materials: count u32, MaterialRecord x count
//! strings:   size u32, NUL-terminated UTF-8 strings
//! ```
//!
//! String references are byte offsets into the pool. Offset 0 means "none"
//! for optional strings (geometry name, alpha map).

use glam::Mat4;

use super::{read_matrix, write_matrix, MATRIX_SIZE, NONE_ID, SCENE_MAGIC, SCENE_VERSION};
use crate::bounds::Aabb;

/// Scene blob header (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneHeader {
    pub magic: u32,
    pub version: u32,
}

impl SceneHeader {
    pub const SIZE: usize = 8;

    pub fn new() -> Self {
        Self {
            magic: SCENE_MAGIC,
            version: SCENE_VERSION,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == SCENE_MAGIC && self.version == SCENE_VERSION
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

impl Default for SceneHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of the node table (152 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRecord {
    /// Name string offset
    pub name: u32,
    /// Geometry id string offset, 0 = none
    pub geometry: u32,
    /// Parent node index, [`NONE_ID`] = none
    pub parent: u32,
    /// Skeleton index, [`NONE_ID`] = none
    pub skeleton: u32,
    /// Effect (material) index, [`NONE_ID`] = none
    pub effect: u32,
    /// Reserved, always 0
    pub flags: u32,
    /// Static transform composed with all parents
    pub model: Mat4,
    /// Static local transform
    pub model_original: Mat4,
}

impl NodeRecord {
    pub const SIZE: usize = 24 + 2 * MATRIX_SIZE;

    /// Record with no parent, skeleton or effect
    pub fn new(name: u32) -> Self {
        Self {
            name,
            geometry: 0,
            parent: NONE_ID,
            skeleton: NONE_ID,
            effect: NONE_ID,
            flags: 0,
            model: Mat4::IDENTITY,
            model_original: Mat4::IDENTITY,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let ids = [
            self.name,
            self.geometry,
            self.parent,
            self.skeleton,
            self.effect,
            self.flags,
        ];
        for (i, id) in ids.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&id.to_le_bytes());
        }
        let mut matrices = Vec::with_capacity(2 * MATRIX_SIZE);
        write_matrix(&mut matrices, &self.model);
        write_matrix(&mut matrices, &self.model_original);
        bytes[24..].copy_from_slice(&matrices);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let u = |o: usize| u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
        Some(Self {
            name: u(0),
            geometry: u(4),
            parent: u(8),
            skeleton: u(12),
            effect: u(16),
            flags: u(20),
            model: read_matrix(&bytes[24..24 + MATRIX_SIZE])?,
            model_original: read_matrix(&bytes[24 + MATRIX_SIZE..Self::SIZE])?,
        })
    }
}

/// Fixed part of a skeleton entry (68 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonHeader {
    pub joint_count: u32,
    pub bind_shape: Mat4,
}

impl SkeletonHeader {
    pub const SIZE: usize = 4 + MATRIX_SIZE;

    pub fn new(joint_count: u32, bind_shape: Mat4) -> Self {
        Self {
            joint_count,
            bind_shape,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.joint_count.to_le_bytes());
        let mut matrix = Vec::with_capacity(MATRIX_SIZE);
        write_matrix(&mut matrix, &self.bind_shape);
        bytes[4..].copy_from_slice(&matrix);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            joint_count: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            bind_shape: read_matrix(&bytes[4..Self::SIZE])?,
        })
    }
}

/// One entry of the material table (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialRecord {
    /// Diffuse color texture path offset, 0 = none
    pub color: u32,
    /// Diffuse alpha texture path offset, 0 = none
    pub alpha: u32,
}

impl MaterialRecord {
    pub const SIZE: usize = 8;

    pub fn new(color: u32, alpha: u32) -> Self {
        Self { color, alpha }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.color.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.alpha.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            color: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            alpha: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Skeleton entry as read back from a blob
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonEntry {
    pub bind_shape: Mat4,
    pub joints: Vec<u32>,
    pub matrices: Vec<Mat4>,
    pub bounds: Vec<Aabb>,
}

/// Fully decoded scene blob
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBlob {
    pub header: SceneHeader,
    pub nodes: Vec<NodeRecord>,
    pub skeletons: Vec<SkeletonEntry>,
    pub animated_nodes: Vec<u32>,
    pub sample_count: u32,
    /// `[sample][animated node]`, flattened
    pub animation: Vec<Mat4>,
    /// One per sample, at least one
    pub frame_bounds: Vec<Aabb>,
    pub materials: Vec<MaterialRecord>,
    pub strings: Vec<u8>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn count(&mut self) -> Option<usize> {
        let n = self.u32()? as usize;
        // Every counted element occupies at least four bytes
        (n <= self.bytes.len() / 4).then_some(n)
    }

    fn matrix(&mut self) -> Option<Mat4> {
        read_matrix(self.take(MATRIX_SIZE)?)
    }

    fn aabb(&mut self) -> Option<Aabb> {
        Aabb::from_bytes(self.take(Aabb::SIZE)?)
    }

    fn repeat<T>(&mut self, n: usize, mut f: impl FnMut(&mut Self) -> Option<T>) -> Option<Vec<T>> {
        (0..n).map(|_| f(self)).collect()
    }
}

impl SceneBlob {
    /// Decode a complete scene blob.
    ///
    /// Returns `None` on a bad header, truncated data or trailing bytes.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let mut c = Cursor { bytes, pos: 0 };

        let header = SceneHeader::from_bytes(c.take(SceneHeader::SIZE)?)?;
        if !header.is_valid() {
            return None;
        }

        let node_count = c.count()?;
        let nodes = c.repeat(node_count, |c| NodeRecord::from_bytes(c.take(NodeRecord::SIZE)?))?;

        let skeleton_count = c.count()?;
        let skeletons = c.repeat(skeleton_count, |c| {
            let head = SkeletonHeader::from_bytes(c.take(SkeletonHeader::SIZE)?)?;
            let n = head.joint_count as usize;
            Some(SkeletonEntry {
                bind_shape: head.bind_shape,
                joints: c.repeat(n, Cursor::u32)?,
                matrices: c.repeat(n, Cursor::matrix)?,
                bounds: c.repeat(n, Cursor::aabb)?,
            })
        })?;

        let animated_count = c.count()?;
        let animated_nodes = c.repeat(animated_count, Cursor::u32)?;
        let sample_count = c.u32()?;
        let animation = c.repeat(sample_count as usize * animated_count, Cursor::matrix)?;
        let frame_bounds = c.repeat((sample_count as usize).max(1), Cursor::aabb)?;

        let material_count = c.count()?;
        let materials = c.repeat(material_count, |c| {
            MaterialRecord::from_bytes(c.take(MaterialRecord::SIZE)?)
        })?;

        let pool_size = c.u32()? as usize;
        let strings = c.take(pool_size)?.to_vec();

        if c.pos != bytes.len() {
            return None;
        }

        Some(Self {
            header,
            nodes,
            skeletons,
            animated_nodes,
            sample_count,
            animation,
            frame_bounds,
            materials,
            strings,
        })
    }

    /// String at a pool offset, up to its NUL terminator
    pub fn string_at(&self, offset: u32) -> Option<&str> {
        let rest = self.strings.get(offset as usize..)?;
        let end = rest.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&rest[..end]).ok()
    }

    /// Name of node `index`
    pub fn node_name(&self, index: usize) -> Option<&str> {
        self.string_at(self.nodes.get(index)?.name)
    }

    /// Animation matrix of animated slot `slot` at `sample`
    pub fn sample_matrix(&self, sample: usize, slot: usize) -> Option<Mat4> {
        if slot >= self.animated_nodes.len() {
            return None;
        }
        self.animation
            .get(sample * self.animated_nodes.len() + slot)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn minimal_blob(strings: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SceneHeader::new().to_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        let mut node = NodeRecord::new(0);
        node.model = Mat4::from_translation(Vec3::Y);
        out.extend_from_slice(&node.to_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // skeletons
        out.extend_from_slice(&0u32.to_le_bytes()); // animated
        out.extend_from_slice(&0u32.to_le_bytes()); // samples
        out.extend_from_slice(&Aabb::ZERO.to_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // materials
        out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        out.extend_from_slice(strings);
        out
    }

    #[test]
    fn test_header_magic() {
        let bytes = SceneHeader::new().to_bytes();
        assert_eq!(&bytes[0..4], &[0xFE, 0xDE, 0xBE, 0x57]);
        assert!(SceneHeader::from_bytes(&bytes).is_some_and(|h| h.is_valid()));
    }

    #[test]
    fn test_node_record_layout() {
        let mut node = NodeRecord::new(7);
        node.parent = 3;
        let bytes = node.to_bytes();
        assert_eq!(bytes.len(), 152);
        assert_eq!(&bytes[0..4], &7u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &NONE_ID.to_le_bytes());
        assert_eq!(NodeRecord::from_bytes(&bytes), Some(node));
    }

    #[test]
    fn test_parse_minimal_blob() {
        let blob = SceneBlob::parse(&minimal_blob(b"root\0")).unwrap();
        assert_eq!(blob.nodes.len(), 1);
        assert_eq!(blob.node_name(0), Some("root"));
        assert_eq!(blob.sample_count, 0);
        assert_eq!(blob.frame_bounds, vec![Aabb::ZERO]);
        assert!(blob.sample_matrix(0, 0).is_none());
    }

    #[test]
    fn test_parse_rejects_truncated_and_trailing() {
        let bytes = minimal_blob(b"root\0");
        assert!(SceneBlob::parse(&bytes[..bytes.len() - 1]).is_none());
        let mut extra = bytes;
        extra.push(0);
        assert!(SceneBlob::parse(&extra).is_none());
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = minimal_blob(b"root\0");
        bytes[0] ^= 0xFF;
        assert!(SceneBlob::parse(&bytes).is_none());
    }
}
