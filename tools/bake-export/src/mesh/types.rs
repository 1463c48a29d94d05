//! Types and constants for geometry indexing

use bake_common::Aabb;
use glam::Vec3;

/// Maximum number of raw indices per corner
pub(crate) const MAX_CORNER_WIDTH: usize = 8;

/// Maximum vertex count addressable by u16 indices
pub(crate) const MAX_VERTICES: usize = u16::MAX as usize + 1;

/// Per-corner raw attribute indices; slots past the geometry's width are 0
pub type CornerKey = [u32; MAX_CORNER_WIDTH];

/// Output vertex (24 bytes packed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    /// f32 bit patterns, so the vertex can be compared exactly
    pub position: [u32; 3],
    pub texcoord: [i16; 2],
    pub normal: [i16; 4],
}

impl Vertex {
    pub const SIZE: usize = 24;

    pub fn position(&self) -> Vec3 {
        Vec3::new(
            f32::from_bits(self.position[0]),
            f32::from_bits(self.position[1]),
            f32::from_bits(self.position[2]),
        )
    }

    /// Append the packed vertex
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for p in self.position {
            out.extend_from_slice(&p.to_le_bytes());
        }
        for t in self.texcoord {
            out.extend_from_slice(&t.to_le_bytes());
        }
        for n in self.normal {
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Remapping statistics gathered while indexing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Corners whose raw index was rewritten to a first-seen equal value
    pub remapped: usize,
    /// Corners that reused an existing output vertex
    pub reused: usize,
}

/// Result of indexing one geometry
#[derive(Debug, Clone)]
pub struct IndexedGeometry {
    pub id: String,
    pub vertices: Vec<Vertex>,
    /// One entry per input corner
    pub indices: Vec<u16>,
    /// Output vertex → canonical source position index
    pub pos_index: Vec<u32>,
    pub bounds: Aabb,
    /// Position stream in element order, for skin bounds
    pub source_positions: Vec<Vec3>,
    pub stats: IndexStats,
}

impl IndexedGeometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
