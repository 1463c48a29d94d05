//! Baked scene and geometry binary formats
//!
//! Two blob kinds are produced per baked input:
//! - scene blobs (`.bmi`): node, skeleton, animation and material tables plus a string pool
//! - geometry blobs (`.bgi`): one indexed vertex buffer per geometry
//!
//! Everything is little-endian and packed. Matrices are 16 f32 in
//! column-major order (translation in elements 12..14).
//!
//! All fixed-size records implement the [`BinarySerializable`] trait for
//! consistent serialization/deserialization.

pub mod geometry;
pub mod scene;
mod serialization;

pub use geometry::*;
pub use scene::*;
pub use serialization::BinarySerializable;

use glam::Mat4;

/// Magic number at the start of every scene blob
pub const SCENE_MAGIC: u32 = 0x57BE_DEFE;

/// Scene blob format version
pub const SCENE_VERSION: u32 = 1;

/// Geometry blob format version
pub const GEOMETRY_VERSION: u32 = 1;

/// Sentinel for "no parent / no skeleton / no effect"
pub const NONE_ID: u32 = u32::MAX;

/// Serialized size of one matrix
pub const MATRIX_SIZE: usize = 64;

/// File-level constants of the baked formats.
#[derive(Debug, Clone, Copy)]
pub struct BakeFormat {
    /// Scene blob extension without dot
    pub scene_ext: &'static str,
    /// Geometry blob extension without dot
    pub geometry_ext: &'static str,
    pub scene_magic: u32,
    pub scene_version: u32,
    pub geometry_version: u32,
    /// Animation samples per second
    pub sample_rate: u32,
}

impl BakeFormat {
    /// Duration of one animation sample in seconds
    pub fn sample_period(&self) -> f32 {
        1.0 / self.sample_rate as f32
    }
}

/// The baked format used by the exporter.
pub const BAKE_FORMAT: BakeFormat = BakeFormat {
    scene_ext: "bmi",
    geometry_ext: "bgi",
    scene_magic: SCENE_MAGIC,
    scene_version: SCENE_VERSION,
    geometry_version: GEOMETRY_VERSION,
    sample_rate: 30,
};

/// Append a matrix as 16 little-endian f32 (column-major).
pub fn write_matrix(out: &mut Vec<u8>, m: &Mat4) {
    for v in m.to_cols_array() {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Read a column-major matrix written by [`write_matrix`].
pub fn read_matrix(bytes: &[u8]) -> Option<Mat4> {
    if bytes.len() < MATRIX_SIZE {
        return None;
    }
    let mut cols = [0f32; 16];
    for (i, c) in cols.iter_mut().enumerate() {
        let o = i * 4;
        *c = f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
    }
    Some(Mat4::from_cols_array(&cols))
}
