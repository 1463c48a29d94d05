//! Shared types and utilities for baked scene assets
//!
//! This crate provides the pieces shared between:
//! - `bake-export` (baking pipeline and CLI)
//! - runtimes that load the baked blobs
//!
//! # Modules
//!
//! - [`packing`] - Vertex data packing utilities (f32 → snorm16, weight quantization)
//! - [`bounds`] - Center/extent bounding boxes as stored in the blobs
//! - [`formats`] - Binary scene (.bmi) and geometry (.bgi) formats

pub mod bounds;
pub mod formats;
pub mod packing;

pub use bounds::Aabb;

// Re-export commonly used packing items
pub use packing::{
    f32_to_snorm16, pack_normal_snorm16, pack_texcoord_snorm16, quantize_weights_snorm16,
    WEIGHT_ONE,
};

// Re-export commonly used format items
pub use formats::{
    read_matrix, write_matrix, BinarySerializable, ComponentType, GeometryHeader, MaterialRecord,
    NodeRecord, SceneBlob, SceneHeader, SkeletonHeader, BAKE_FORMAT, GEOMETRY_VERSION,
    MATRIX_SIZE, NONE_ID, SCENE_MAGIC, SCENE_VERSION,
};
