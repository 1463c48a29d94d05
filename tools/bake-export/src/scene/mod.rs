//! Scene assembly: node hierarchy, skeletons and materials resolved from a
//! [`SceneDocument`], plus sub-tree selection and per-frame composition.

mod compose;
mod subtree;

pub use compose::{compose_scene, ComposedNode, ComposedScene, ComposedSkeleton, SceneInputs};
pub use subtree::{select_subtree, Selection};

use glam::Mat4;

use crate::document::{strip_url, ControllerDesc, SceneDocument};
use crate::error::{BakeError, BakeResult};
use crate::transform::TransformStack;

/// One node with its references resolved to indices
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: String,
    pub name: String,
    /// Always lower than this node's own index
    pub parent: Option<usize>,
    pub stack: TransformStack,
    /// Idle local transform
    pub local: Mat4,
    /// Geometry index, also set for skinned instances
    pub geometry: Option<usize>,
    pub skeleton: Option<usize>,
    pub effect: Option<usize>,
}

/// Skeleton created for one controller instance
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub controller: usize,
    pub controller_id: String,
    /// Joint node indices
    pub joints: Vec<usize>,
    pub bind_shape: Mat4,
    /// Inverse bind matrices premultiplied onto the bind shape
    pub inverse_bind: Vec<Mat4>,
}

/// Texture file names of one effect
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectTextures {
    pub color: Option<String>,
    pub alpha: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub skeletons: Vec<Skeleton>,
    pub effects: Vec<EffectTextures>,
}

impl SceneGraph {
    /// Direct and indirect children of `root`, `root` included, in document order
    pub fn subtree_mask(&self, root: usize) -> Vec<bool> {
        let mut mask = vec![false; self.nodes.len()];
        mask[root] = true;
        for i in root + 1..self.nodes.len() {
            if let Some(p) = self.nodes[i].parent {
                mask[i] = mask[p];
            }
        }
        mask
    }

    /// Top-most ancestor of `node`
    pub fn top_ancestor(&self, mut node: usize) -> usize {
        while let Some(p) = self.nodes[node].parent {
            node = p;
        }
        node
    }
}

/// Row-major 16 floats to a column-vector matrix
fn row_major(m: &[f32]) -> Mat4 {
    let mut cols = [0f32; 16];
    cols.copy_from_slice(&m[..16]);
    Mat4::from_cols_array(&cols).transpose()
}

/// Reduce an image path to its file name
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Resolve nodes, skeletons and effects of a document.
pub fn build_scene_graph(doc: &SceneDocument) -> BakeResult<SceneGraph> {
    let effects = resolve_effects(doc);

    let mut graph = SceneGraph {
        nodes: Vec::with_capacity(doc.nodes.len()),
        skeletons: Vec::new(),
        effects,
    };

    for (index, node) in doc.nodes.iter().enumerate() {
        if let Some(parent) = node.parent {
            if parent >= index {
                return Err(BakeError::ParentOrder {
                    node: node.id.clone(),
                    parent,
                });
            }
        }

        let stack = TransformStack::from_descs(&node.id, &node.transforms)?;
        let local = stack.compose();

        let mut geometry = None;
        let mut material = None;
        let mut skeleton = None;

        if let Some(inst) = &node.geometry {
            geometry = Some(
                doc.geometry_index(&inst.url)
                    .ok_or_else(|| BakeError::unresolved("geometry", strip_url(&inst.url)))?,
            );
            material = inst.material.as_deref();
        }

        if let Some(inst) = &node.controller {
            let controller_index = doc
                .controller_index(&inst.url)
                .ok_or_else(|| BakeError::unresolved("controller", strip_url(&inst.url)))?;
            let controller = &doc.controllers[controller_index];
            geometry = Some(
                doc.geometry_index(&controller.skin_source)
                    .ok_or_else(|| BakeError::unresolved("geometry", strip_url(&controller.skin_source)))?,
            );
            if inst.material.is_some() {
                material = inst.material.as_deref();
            }

            let skel = build_skeleton(doc, controller_index, controller, inst.skeleton.as_deref())?;
            skeleton = Some(graph.skeletons.len());
            graph.skeletons.push(skel);
        }

        let effect = match material {
            Some(url) => {
                let m = doc
                    .material_index(url)
                    .ok_or_else(|| BakeError::unresolved("material", strip_url(url)))?;
                let effect_url = &doc.materials[m].effect;
                Some(
                    doc.effect_index(effect_url)
                        .ok_or_else(|| BakeError::unresolved("effect", strip_url(effect_url)))?,
                )
            }
            None => None,
        };

        graph.nodes.push(SceneNode {
            id: node.id.clone(),
            name: node.display_name().to_string(),
            parent: node.parent,
            stack,
            local,
            geometry,
            skeleton,
            effect,
        });
    }

    tracing::debug!(
        "Scene graph: {} nodes, {} skeletons, {} effects",
        graph.nodes.len(),
        graph.skeletons.len(),
        graph.effects.len()
    );

    Ok(graph)
}

fn resolve_effects(doc: &SceneDocument) -> Vec<EffectTextures> {
    let texture = |effect: &str, image: Option<&String>| -> Option<String> {
        let id = image?;
        match doc.image(id) {
            Some(img) => Some(file_name(&img.path).to_string()),
            None => {
                // Frequently a sampler parameter name rather than an image id
                tracing::debug!("Effect '{}': texture '{}' is not an image", effect, id);
                None
            }
        }
    };

    doc.effects
        .iter()
        .map(|e| EffectTextures {
            color: texture(&e.id, e.diffuse_texture.as_ref()),
            alpha: texture(&e.id, e.transparent_texture.as_ref()),
        })
        .collect()
}

fn build_skeleton(
    doc: &SceneDocument,
    controller_index: usize,
    controller: &ControllerDesc,
    root_url: Option<&str>,
) -> BakeResult<Skeleton> {
    let joint_count = controller.joints.len();
    if controller.inverse_bind_matrices.len() != joint_count * 16 {
        return Err(BakeError::invalid(
            format!("controller '{}'", controller.id),
            format!(
                "expected {} inverse bind values for {} joints, found {}",
                joint_count * 16,
                joint_count,
                controller.inverse_bind_matrices.len()
            ),
        ));
    }

    let root = match root_url.and_then(|url| doc.node_index(url)) {
        Some(root) => root,
        None => {
            tracing::warn!(
                "Controller '{}': skeleton root {:?} not found, searching from the first node",
                controller.id,
                root_url
            );
            0
        }
    };

    let joints = controller
        .joints
        .iter()
        .map(|sid| {
            doc.nodes
                .iter()
                .enumerate()
                .skip(root)
                .find(|(_, n)| n.sid.as_deref() == Some(sid.as_str()))
                .map(|(i, _)| i)
                .ok_or_else(|| BakeError::JointNotFound {
                    controller: controller.id.clone(),
                    joint: sid.clone(),
                    root: doc
                        .nodes
                        .get(root)
                        .map(|n| n.id.clone())
                        .unwrap_or_default(),
                })
        })
        .collect::<BakeResult<Vec<_>>>()?;

    let bind_shape = row_major(&controller.bind_shape_matrix);
    let inverse_bind = controller
        .inverse_bind_matrices
        .chunks_exact(16)
        .map(|m| row_major(m) * bind_shape)
        .collect();

    Ok(Skeleton {
        controller: controller_index,
        controller_id: controller.id.clone(),
        joints,
        bind_shape,
        inverse_bind,
    })
}
