//! Geometry indexing (raw corner streams -> indexed vertex buffer)

mod indexer;
mod streams;
mod types;

pub use indexer::index_geometry;
pub use streams::{resolve, AttributeStream, ResolvedGeometry, Semantic};
pub use types::{CornerKey, IndexStats, IndexedGeometry, Vertex};

use crate::document::GeometryDesc;
use crate::error::BakeResult;

/// Resolve and index one geometry.
pub fn build_geometry(desc: &GeometryDesc) -> BakeResult<IndexedGeometry> {
    let resolved = resolve(desc)?;
    let indexed = index_geometry(&resolved)?;
    tracing::info!(
        "Indexed geometry '{}': {} vertices, {} triangles",
        indexed.id,
        indexed.vertex_count(),
        indexed.triangle_count()
    );
    Ok(indexed)
}
