//! Corner deduplication into an indexed vertex buffer
//!
//! Two passes run per corner, in corner order:
//! 1. Value canonicalization: for every slot carrying position, texcoord or
//!    normal data, the decoded value is looked up in a first-seen table and
//!    the raw index is rewritten to the first index that produced the same
//!    value. Results depend on traversal order.
//! 2. Structural dedup: the rewritten corner key is hashed; a hit reuses the
//!    output vertex, a miss appends a new one. Only slots feeding an emitted
//!    attribute take part, so binormal, tangent and unknown inputs never
//!    split a vertex.

use bake_common::{pack_normal_snorm16, pack_texcoord_snorm16, Aabb};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use smallvec::SmallVec;

use super::streams::{ResolvedGeometry, Semantic};
use super::types::{CornerKey, IndexStats, IndexedGeometry, Vertex, MAX_CORNER_WIDTH, MAX_VERTICES};
use crate::error::{BakeError, BakeResult};

/// Bit patterns of every canonicalized value stored in one slot
type ValueKey = SmallVec<[u32; 9]>;

/// Deduplicate the corners of a resolved geometry.
pub fn index_geometry(geom: &ResolvedGeometry<'_>) -> BakeResult<IndexedGeometry> {
    let slots = geom.canonical_slots();
    let mut first_seen: SmallVec<[HashMap<ValueKey, u32>; 3]> =
        slots.iter().map(|_| HashMap::new()).collect();
    let mut structural: HashMap<CornerKey, u16> = HashMap::with_capacity(geom.corners.len());

    let pos_slot = geom.stream(Semantic::Position).map(|s| s.slot);

    let mut vertices = Vec::new();
    let mut pos_index = Vec::new();
    let mut indices = Vec::with_capacity(geom.corners.len());
    let mut stats = IndexStats::default();

    for corner in &geom.corners {
        let mut key: CornerKey = [0; MAX_CORNER_WIDTH];
        for (slot, _) in &slots {
            key[*slot] = corner[*slot];
        }

        for ((slot, members), seen) in slots.iter().zip(first_seen.iter_mut()) {
            // Slots are disjoint, so decoding from the unmodified corner is exact
            let value: ValueKey = members
                .iter()
                .flat_map(|&s| geom.decode(s, corner).map(f32::to_bits))
                .collect();
            match seen.entry(value) {
                Entry::Occupied(e) => {
                    if *e.get() != key[*slot] {
                        key[*slot] = *e.get();
                        stats.remapped += 1;
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(key[*slot]);
                }
            }
        }

        let index = match structural.entry(key) {
            Entry::Occupied(e) => {
                stats.reused += 1;
                *e.get()
            }
            Entry::Vacant(e) => {
                if vertices.len() >= MAX_VERTICES {
                    return Err(BakeError::TooManyVertices {
                        geometry: geom.id.to_string(),
                        count: vertices.len() + 1,
                    });
                }
                let id = vertices.len() as u16;
                vertices.push(build_vertex(geom, &key));
                pos_index.push(pos_slot.map_or(0, |s| key[s]));
                *e.insert(id)
            }
        };
        indices.push(index);
    }

    let bounds = Aabb::from_points(vertices.iter().map(Vertex::position)).unwrap_or(Aabb::ZERO);

    tracing::debug!(
        "Geometry '{}': remapped {} corner indices, {} of {} corners reused",
        geom.id,
        stats.remapped,
        stats.reused,
        indices.len()
    );

    Ok(IndexedGeometry {
        id: geom.id.to_string(),
        vertices,
        indices,
        pos_index,
        bounds,
        source_positions: geom.source_positions(),
        stats,
    })
}

fn build_vertex(geom: &ResolvedGeometry<'_>, key: &CornerKey) -> Vertex {
    let position = geom.decode(Semantic::Position, key);
    let uv = geom.decode(Semantic::Texcoord, key);
    let normal = geom.decode(Semantic::Normal, key);
    Vertex {
        position: position.map(f32::to_bits),
        texcoord: pack_texcoord_snorm16([uv[0], uv[1]]),
        normal: pack_normal_snorm16(normal),
    }
}
