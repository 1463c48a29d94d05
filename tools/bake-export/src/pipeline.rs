//! End-to-end bake of one scene document
//!
//! All blobs are produced in memory; files are only written once every
//! stage of the document has succeeded.

use anyhow::{Context, Result};
use bake_common::formats::BAKE_FORMAT;
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::animation::bake_animation;
use crate::document::{strip_url, SceneDocument};
use crate::error::{BakeError, BakeResult};
use crate::formats::{write_geometry, write_scene};
use crate::mesh::{build_geometry, IndexedGeometry};
use crate::scene::{build_scene_graph, compose_scene, select_subtree, SceneInputs, Selection};
use crate::skin::{pack_skin, PackedSkin};
use crate::transform::TransformStack;

/// Export options, also the `[options]` table of a bake manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BakeOptions {
    /// Write a stand-alone blob for every root node carrying the object suffix
    pub export_standalone_objects: bool,
    pub object_suffix: String,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            export_standalone_objects: true,
            object_suffix: "_object".to_string(),
        }
    }
}

/// One output file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakedBlob {
    /// File stem, without extension
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Every blob produced from one document
#[derive(Debug, Clone, Default)]
pub struct BakedDocument {
    /// Full scene first, then stand-alone objects in document order
    pub scenes: Vec<BakedBlob>,
    /// One per geometry, in document order
    pub geometries: Vec<BakedBlob>,
}

impl BakedDocument {
    /// Write all blobs into `dir`, returning the written paths.
    ///
    /// Every blob is staged under a `.tmp` name first and only renamed into
    /// place once all of them are on disk. On failure the staged files and
    /// any blob already renamed by this call are removed.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let scenes = self.scenes.iter().map(|b| (b, BAKE_FORMAT.scene_ext));
        let geometries = self.geometries.iter().map(|b| (b, BAKE_FORMAT.geometry_ext));

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (blob, ext) in scenes.chain(geometries) {
            let path = dir.join(format!("{}.{}", blob.name, ext));
            let tmp = dir.join(format!("{}.{}.tmp", blob.name, ext));
            if let Err(e) = std::fs::write(&tmp, &blob.bytes) {
                remove_all(staged.iter().map(|(tmp, _)| tmp));
                return Err(e).with_context(|| format!("Failed to write {:?}", tmp));
            }
            staged.push((tmp, path));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = std::fs::rename(tmp, path) {
                remove_all(written.iter().chain(staged[i..].iter().map(|(tmp, _)| tmp)));
                return Err(e).with_context(|| format!("Failed to write {:?}", path));
            }
            written.push(path.clone());
        }

        for (path, blob) in written.iter().zip(self.scenes.iter().chain(&self.geometries)) {
            tracing::info!("Wrote {:?} ({} bytes)", path, blob.bytes.len());
        }
        Ok(written)
    }
}

fn remove_all<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Stand-alone object name of a root node, if its name carries `suffix`.
///
/// The first occurrence of the suffix must be at the very end, and some name
/// must remain once it is removed.
pub fn object_name<'a>(node_name: &'a str, suffix: &str) -> Option<&'a str> {
    if suffix.is_empty() {
        return None;
    }
    let at = node_name.find(suffix)?;
    (at > 0 && at + suffix.len() == node_name.len()).then(|| &node_name[..at])
}

/// First controller skinning each geometry
fn skins_by_geometry<'a>(doc: &SceneDocument, skins: &'a [PackedSkin]) -> Vec<Option<&'a PackedSkin>> {
    let mut by_geometry = vec![None; doc.geometries.len()];
    for skin in skins {
        if let Some(g) = doc.geometry_index(&skin.geometry) {
            if by_geometry[g].is_none() {
                by_geometry[g] = Some(skin);
            } else {
                tracing::warn!(
                    "Geometry '{}' is skinned by more than one controller, using the first",
                    skin.geometry
                );
            }
        }
    }
    by_geometry
}

fn pack_skins(doc: &SceneDocument, geometries: &[IndexedGeometry]) -> BakeResult<Vec<PackedSkin>> {
    doc.controllers
        .par_iter()
        .map(|controller| {
            let g = doc
                .geometry_index(&controller.skin_source)
                .ok_or_else(|| BakeError::unresolved("geometry", strip_url(&controller.skin_source)))?;
            pack_skin(controller, &geometries[g].source_positions)
        })
        .collect()
}

/// Bake a document into scene and geometry blobs.
///
/// `stem` names the full-scene blob. Stand-alone objects are named after
/// their root node with the object suffix removed.
pub fn bake_document(doc: &SceneDocument, stem: &str, options: &BakeOptions) -> Result<BakedDocument> {
    let geometries = doc
        .geometries
        .par_iter()
        .map(build_geometry)
        .collect::<BakeResult<Vec<_>>>()?;
    let skins = pack_skins(doc, &geometries)?;

    let graph = build_scene_graph(doc)?;
    let stacks: Vec<TransformStack> = graph.nodes.iter().map(|n| n.stack.clone()).collect();
    let animation = bake_animation(doc, &stacks)?;

    let geometry_bounds: Vec<_> = geometries.iter().map(|g| g.bounds).collect();
    let joint_bounds: Vec<_> = skins.iter().map(|s| s.joint_bounds.clone()).collect();

    let inputs = SceneInputs {
        graph: &graph,
        animation: &animation,
        geometry_bounds: &geometry_bounds,
        joint_bounds: &joint_bounds,
    };

    let mut selections: Vec<(String, Selection)> = vec![(stem.to_string(), select_subtree(&graph, None))];
    if options.export_standalone_objects {
        for (i, node) in graph.nodes.iter().enumerate() {
            if node.parent.is_some() {
                continue;
            }
            let Some(name) = object_name(&node.name, &options.object_suffix) else {
                continue;
            };
            if name == stem {
                tracing::warn!(
                    "Object '{}' would overwrite the scene blob of the same name, skipping it",
                    name
                );
                continue;
            }
            if selections[1..].iter().any(|(n, _)| n == name) {
                tracing::warn!("Object '{}' is exported more than once, keeping the first", name);
                continue;
            }
            let selection = select_subtree(&graph, Some(i));
            tracing::info!(
                "Object '{}': {} nodes selected from '{}'",
                name,
                selection.nodes.len(),
                node.name
            );
            selections.push((name.to_string(), selection));
        }
    }

    let mut baked = BakedDocument::default();
    for (name, selection) in &selections {
        let composed = compose_scene(&inputs, selection)?;
        let mut bytes = Vec::new();
        write_scene(&mut bytes, &composed, &graph, doc)?;
        baked.scenes.push(BakedBlob {
            name: name.clone(),
            bytes,
        });
    }

    for (geometry, skin) in geometries.iter().zip(skins_by_geometry(doc, &skins)) {
        let mut bytes = Vec::new();
        write_geometry(&mut bytes, geometry, skin)?;
        baked.geometries.push(BakedBlob {
            name: geometry.id.clone(),
            bytes,
        });
    }

    tracing::info!(
        "Baked '{}': {} scene blobs, {} geometries, {} skins, {} samples",
        stem,
        baked.scenes.len(),
        baked.geometries.len(),
        skins.len(),
        animation.sample_count
    );

    Ok(baked)
}

/// Load a scene description from a JSON file
pub fn load_document(path: &Path) -> Result<SceneDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene: {:?}", path))?;
    SceneDocument::from_json(&text).with_context(|| format!("Failed to parse scene: {:?}", path))
}

/// Bake one scene file into `output_dir`
pub fn bake_file(input: &Path, output_dir: &Path, options: &BakeOptions) -> Result<Vec<PathBuf>> {
    let doc = load_document(input)?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Invalid scene file name: {:?}", input))?;

    let baked = bake_document(&doc, stem, options)
        .with_context(|| format!("Failed to bake {:?}", input))?;
    baked.write_to(output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("crate_object", "_object"), Some("crate"));
        assert_eq!(object_name("crate_object_object", "_object"), None);
        assert_eq!(object_name("crate_objects", "_object"), None);
        assert_eq!(object_name("_object", "_object"), None);
        assert_eq!(object_name("crate", "_object"), None);
        assert_eq!(object_name("crate", ""), None);
    }

    #[test]
    fn test_default_options() {
        let options = BakeOptions::default();
        assert!(options.export_standalone_objects);
        assert_eq!(options.object_suffix, "_object");
    }

    #[test]
    fn test_empty_document() {
        let baked = bake_document(&SceneDocument::default(), "empty", &BakeOptions::default()).unwrap();
        assert_eq!(baked.scenes.len(), 1);
        assert_eq!(baked.scenes[0].name, "empty");
        assert!(baked.geometries.is_empty());
    }

    #[test]
    fn test_error_keeps_class() {
        let doc = SceneDocument::from_json(
            r##"{ "nodes": [ { "id": "a", "geometry": { "url": "#missing" } } ] }"##,
        )
        .unwrap();
        let err = bake_document(&doc, "broken", &BakeOptions::default()).unwrap_err();
        let bake = err.downcast_ref::<BakeError>().unwrap();
        assert_eq!(bake.class(), crate::error::ErrorClass::MalformedInput);
    }
}
