//! Binary format writers for baked scene and geometry blobs
//!
//! Re-exports the record types from bake-common and assembles them into
//! complete files.

pub use bake_common::formats::*;

mod strings;

pub use strings::StringPool;

use anyhow::Result;
use bake_common::Aabb;
use std::io::Write;

use crate::document::SceneDocument;
use crate::mesh::IndexedGeometry;
use crate::scene::{ComposedScene, SceneGraph};
use crate::skin::{PackedInfluences, PackedSkin};

fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<()> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_mat4<W: Write>(w: &mut W, m: &glam::Mat4) -> Result<()> {
    let mut bytes = Vec::with_capacity(MATRIX_SIZE);
    write_matrix(&mut bytes, m);
    w.write_all(&bytes)?;
    Ok(())
}

fn write_aabb<W: Write>(w: &mut W, b: &Aabb) -> Result<()> {
    w.write_all(&b.to_bytes())?;
    Ok(())
}

fn id(index: Option<usize>) -> u32 {
    index.map_or(NONE_ID, |i| i as u32)
}

/// Write a complete baked scene (.bmi)
///
/// Node names, geometry ids and texture file names go to the string pool in
/// table order: nodes first, then materials.
pub fn write_scene<W: Write>(
    w: &mut W,
    scene: &ComposedScene,
    graph: &SceneGraph,
    doc: &SceneDocument,
) -> Result<()> {
    let mut strings = StringPool::new();

    let nodes: Vec<NodeRecord> = scene
        .nodes
        .iter()
        .map(|node| {
            let name = strings.push(&graph.nodes[node.source].name);
            let geometry = strings.push_opt(
                node.geometry
                    .and_then(|g| doc.geometries.get(g))
                    .map(|g| g.id.as_str()),
            );
            NodeRecord {
                name,
                geometry,
                parent: id(node.parent),
                skeleton: id(node.skeleton),
                effect: id(node.effect),
                flags: 0,
                model: node.model,
                model_original: node.model_original,
            }
        })
        .collect();

    let materials: Vec<MaterialRecord> = scene
        .effects
        .iter()
        .map(|&e| {
            let textures = &graph.effects[e];
            MaterialRecord::new(
                strings.push_opt(textures.color.as_deref()),
                strings.push_opt(textures.alpha.as_deref()),
            )
        })
        .collect();

    w.write_all(&SceneHeader::new().to_bytes())?;

    write_u32(w, nodes.len() as u32)?;
    for node in &nodes {
        w.write_all(&node.to_bytes())?;
    }

    write_u32(w, scene.skeletons.len() as u32)?;
    for skel in &scene.skeletons {
        let header = SkeletonHeader::new(skel.joints.len() as u32, skel.bind_shape);
        w.write_all(&header.to_bytes())?;
        for &joint in &skel.joints {
            write_u32(w, joint as u32)?;
        }
        for m in &skel.inverse_bind {
            write_mat4(w, m)?;
        }
        for j in 0..skel.joints.len() {
            write_aabb(w, skel.bounds.get(j).unwrap_or(&Aabb::ZERO))?;
        }
    }

    write_u32(w, scene.animated.len() as u32)?;
    for &node in &scene.animated {
        write_u32(w, node as u32)?;
    }
    write_u32(w, scene.sample_count as u32)?;
    for m in &scene.animation {
        write_mat4(w, m)?;
    }
    for b in &scene.frame_bounds {
        write_aabb(w, b)?;
    }

    write_u32(w, materials.len() as u32)?;
    for material in &materials {
        w.write_all(&material.to_bytes())?;
    }

    write_u32(w, strings.len() as u32)?;
    w.write_all(strings.as_bytes())?;

    Ok(())
}

/// Write a complete baked geometry (.bgi)
///
/// With a skin, every vertex is followed by the packed influences of the
/// source position it was built from.
pub fn write_geometry<W: Write>(
    w: &mut W,
    geometry: &IndexedGeometry,
    skin: Option<&PackedSkin>,
) -> Result<()> {
    let header = GeometryHeader::new(
        geometry.vertices.len() as u32,
        geometry.indices.len() as u32,
        skin.is_some(),
        geometry.bounds,
    );
    w.write_all(&header.to_bytes())?;
    for tag in GeometryHeader::layout_for(skin.is_some()) {
        write_u32(w, *tag as u32)?;
    }

    let mut vertex_data = Vec::with_capacity(geometry.vertices.len() * header.vertex_size as usize);
    for (vertex, &pos) in geometry.vertices.iter().zip(&geometry.pos_index) {
        vertex.write_to(&mut vertex_data);
        if let Some(skin) = skin {
            skin.influences(pos).write_to(&mut vertex_data);
        }
    }
    w.write_all(&vertex_data)?;

    for index in &geometry.indices {
        w.write_all(&index.to_le_bytes())?;
    }

    Ok(())
}

/// Vertex stride written by [`write_geometry`]
pub fn vertex_stride(skinned: bool) -> usize {
    if skinned {
        crate::mesh::Vertex::SIZE + PackedInfluences::SIZE
    } else {
        crate::mesh::Vertex::SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{IndexStats, Vertex};
    use crate::scene::{build_scene_graph, compose_scene, select_subtree, SceneInputs};
    use crate::animation::BakedAnimation;
    use glam::Vec3;

    fn triangle() -> IndexedGeometry {
        let vertex = |x: f32| Vertex {
            position: [x.to_bits(), 0, 0],
            texcoord: [0, 32767],
            normal: [0, 0, 32767, 0],
        };
        IndexedGeometry {
            id: "tri".into(),
            vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)],
            indices: vec![0, 1, 2],
            pos_index: vec![0, 1, 2],
            bounds: Aabb::from_min_max(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)),
            source_positions: vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0],
            stats: IndexStats::default(),
        }
    }

    #[test]
    fn test_static_geometry_layout() {
        let mut out = Vec::new();
        write_geometry(&mut out, &triangle(), None).unwrap();

        let header = GeometryHeader::from_bytes(&out).unwrap();
        assert!(!header.is_skinned());
        assert_eq!(header.vertex_size as usize, vertex_stride(false));
        assert_eq!(header.index_count, 3);
        assert_eq!(out.len(), header.blob_size());

        let tags = parse_component_tags(&out[GeometryHeader::SIZE..], header.component_count).unwrap();
        assert_eq!(tags, STATIC_LAYOUT.to_vec());

        let indices = &out[out.len() - 6..];
        assert_eq!(indices, &[0, 0, 1, 0, 2, 0]);
    }

    #[test]
    fn test_skinned_geometry_appends_influences() {
        let skin = PackedSkin {
            controller: "skin".into(),
            geometry: "tri".into(),
            vertices: vec![
                PackedInfluences::RIGID,
                PackedInfluences {
                    bones: [3, 1, 0, 0],
                    weights: [16384, 16383, 0, 0],
                },
            ],
            joint_bounds: vec![],
        };
        let mut out = Vec::new();
        write_geometry(&mut out, &triangle(), Some(&skin)).unwrap();

        let header = GeometryHeader::from_bytes(&out).unwrap();
        assert!(header.is_skinned());
        assert_eq!(header.vertex_size as usize, vertex_stride(true));
        assert_eq!(out.len(), header.blob_size());

        // second vertex: 24 bytes of attributes, then weights, then bones
        let base = GeometryHeader::SIZE + header.tags_size() + header.vertex_size as usize;
        let skin_bytes = &out[base + Vertex::SIZE..base + header.vertex_size as usize];
        assert_eq!(&skin_bytes[0..2], &16384i16.to_le_bytes());
        assert_eq!(&skin_bytes[8..12], &[3, 1, 0, 0]);

        // third vertex has no listed influences and falls back to rigid
        let base = base + header.vertex_size as usize;
        let skin_bytes = &out[base + Vertex::SIZE..base + header.vertex_size as usize];
        assert_eq!(&skin_bytes[0..2], &32767i16.to_le_bytes());
        assert_eq!(&skin_bytes[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_scene_blob_parses_back() {
        let doc = SceneDocument::from_json(
            r##"{
                "images": [ { "id": "img", "path": "maps/bark.png" } ],
                "effects": [ { "id": "fx", "diffuse_texture": "img" } ],
                "materials": [ { "id": "mat", "effect": "#fx" } ],
                "geometries": [ { "id": "trunk" } ],
                "nodes": [
                    { "id": "tree", "name": "Tree", "geometry": { "url": "#trunk", "material": "#mat" } },
                    { "id": "leaf", "parent": 0 }
                ]
            }"##,
        )
        .unwrap();
        let graph = build_scene_graph(&doc).unwrap();
        let animation = BakedAnimation::default();
        let bounds = [Aabb::new(Vec3::ZERO, Vec3::ONE)];
        let inputs = SceneInputs {
            graph: &graph,
            animation: &animation,
            geometry_bounds: &bounds,
            joint_bounds: &[],
        };
        let scene = compose_scene(&inputs, &select_subtree(&graph, None)).unwrap();

        let mut out = Vec::new();
        write_scene(&mut out, &scene, &graph, &doc).unwrap();
        let blob = SceneBlob::parse(&out).unwrap();

        assert_eq!(blob.nodes.len(), 2);
        assert_eq!(blob.node_name(0), Some("Tree"));
        assert_eq!(blob.node_name(1), Some("leaf"));
        assert_eq!(blob.string_at(blob.nodes[0].geometry), Some("trunk"));
        assert_eq!(blob.nodes[1].geometry, 0);
        assert_eq!(blob.nodes[1].parent, 0);
        assert_eq!(blob.nodes[0].parent, NONE_ID);
        assert_eq!(blob.nodes[0].effect, 0);
        assert_eq!(blob.nodes[1].effect, NONE_ID);
        assert!(blob.skeletons.is_empty());
        assert_eq!(blob.sample_count, 0);
        assert_eq!(blob.frame_bounds.len(), 1);
        assert_eq!(blob.materials.len(), 1);
        assert_eq!(blob.string_at(blob.materials[0].color), Some("bark.png"));
        assert_eq!(blob.materials[0].alpha, 0);
    }
}
