//! bake-export library
//!
//! Bakes parsed scene descriptions into renderer-ready scene (.bmi) and
//! geometry (.bgi) blobs. The stages are usable on their own:
//!
//! - [`mesh`] - attribute indexing into a single 16-bit indexed vertex buffer
//! - [`skin`] - per-vertex joint influence packing
//! - [`animation`] - fixed-rate resampling of keyframe channels
//! - [`scene`] - hierarchy, skeletons, sub-tree selection and composition

pub mod animation;
pub mod document;
pub mod error;
pub mod formats;
pub mod inspect;
pub mod manifest;
pub mod mesh;
pub mod pipeline;
pub mod scene;
pub mod skin;
pub mod transform;

// Re-export packing functions and format constants from bake-common
pub use bake_common::{
    pack_normal_snorm16, pack_texcoord_snorm16, quantize_weights_snorm16, Aabb, BAKE_FORMAT,
};

pub use document::SceneDocument;
pub use error::{BakeError, BakeResult, ErrorClass};
pub use pipeline::{bake_document, bake_file, BakeOptions, BakedBlob, BakedDocument};
