//! Hierarchical composition of a selection into serializable tables
//!
//! Per frame, animated locals replace the idle ones, world matrices are
//! composed parent-first, bone matrices are `jointWorld * inverseBind`, and
//! the frame's bounds are the union over every node carrying geometry.

use bake_common::Aabb;
use glam::Mat4;
use rayon::prelude::*;

use super::{SceneGraph, Selection};
use crate::animation::BakedAnimation;
use crate::error::{BakeError, BakeResult};

/// Everything composition reads besides the selection
#[derive(Debug, Clone, Copy)]
pub struct SceneInputs<'a> {
    pub graph: &'a SceneGraph,
    pub animation: &'a BakedAnimation,
    /// Bounds per geometry
    pub geometry_bounds: &'a [Aabb],
    /// Bind-space joint bounds per controller
    pub joint_bounds: &'a [Vec<Aabb>],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedNode {
    /// Graph node index
    pub source: usize,
    pub parent: Option<usize>,
    pub geometry: Option<usize>,
    pub skeleton: Option<usize>,
    pub effect: Option<usize>,
    /// Idle world transform
    pub model: Mat4,
    /// Idle local transform, translation cleared for the selection root
    pub model_original: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedSkeleton {
    /// Graph skeleton index
    pub source: usize,
    /// Joint indices into the composed node table
    pub joints: Vec<usize>,
    pub bind_shape: Mat4,
    pub inverse_bind: Vec<Mat4>,
    pub bounds: Vec<Aabb>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedScene {
    pub nodes: Vec<ComposedNode>,
    pub skeletons: Vec<ComposedSkeleton>,
    /// Graph effect indices in first-use order
    pub effects: Vec<usize>,
    /// Animated node indices into the composed node table
    pub animated: Vec<usize>,
    pub sample_count: usize,
    /// `[sample][animated]`, flattened
    pub animation: Vec<Mat4>,
    /// One per sample, at least one
    pub frame_bounds: Vec<Aabb>,
}

/// Index of `item` in `list`, appending it on first use
fn first_use(list: &mut Vec<usize>, item: usize) -> usize {
    match list.iter().position(|&x| x == item) {
        Some(i) => i,
        None => {
            list.push(item);
            list.len() - 1
        }
    }
}

fn compose_worlds(nodes: &[ComposedNode], locals: &[Mat4]) -> Vec<Mat4> {
    let mut worlds: Vec<Mat4> = Vec::with_capacity(nodes.len());
    for (node, local) in nodes.iter().zip(locals) {
        let world = match node.parent {
            Some(p) => worlds[p] * *local,
            None => *local,
        };
        worlds.push(world);
    }
    worlds
}

/// Compose the selected part of the scene.
pub fn compose_scene(inputs: &SceneInputs<'_>, selection: &Selection) -> BakeResult<ComposedScene> {
    let graph = inputs.graph;
    let animation = inputs.animation;

    let mut skeleton_order: Vec<usize> = Vec::new();
    let mut effects: Vec<usize> = Vec::new();
    let mut nodes: Vec<ComposedNode> = Vec::with_capacity(selection.nodes.len());

    for &source in &selection.nodes {
        let node = &graph.nodes[source];
        let mut model_original = node.local;
        if selection.root == Some(source) {
            model_original.w_axis.x = 0.0;
            model_original.w_axis.y = 0.0;
            model_original.w_axis.z = 0.0;
        }
        nodes.push(ComposedNode {
            source,
            parent: node.parent.and_then(|p| selection.remap[p]),
            geometry: node.geometry,
            skeleton: node.skeleton.map(|s| first_use(&mut skeleton_order, s)),
            effect: node.effect.map(|e| first_use(&mut effects, e)),
            model: Mat4::IDENTITY,
            model_original,
        });
    }

    let idle: Vec<Mat4> = nodes.iter().map(|n| n.model_original).collect();
    let worlds = compose_worlds(&nodes, &idle);
    for (node, world) in nodes.iter_mut().zip(worlds) {
        node.model = world;
    }

    let skeletons = skeleton_order
        .iter()
        .map(|&s| {
            let skel = &graph.skeletons[s];
            let joints = skel
                .joints
                .iter()
                .map(|&j| {
                    selection.remap[j].ok_or_else(|| BakeError::JointNotFound {
                        controller: skel.controller_id.clone(),
                        joint: graph.nodes[j].id.clone(),
                        root: selection
                            .root
                            .map(|r| graph.nodes[r].id.clone())
                            .unwrap_or_default(),
                    })
                })
                .collect::<BakeResult<Vec<_>>>()?;
            let bounds = inputs
                .joint_bounds
                .get(skel.controller)
                .cloned()
                .unwrap_or_else(|| vec![Aabb::ZERO; skel.joints.len()]);
            Ok(ComposedSkeleton {
                source: s,
                joints,
                bind_shape: skel.bind_shape,
                inverse_bind: skel.inverse_bind.clone(),
                bounds,
            })
        })
        .collect::<BakeResult<Vec<_>>>()?;

    // Animated slots that fall inside the selection
    let kept: Vec<(usize, usize)> = animation
        .animated_nodes
        .iter()
        .enumerate()
        .filter_map(|(slot, &node)| selection.remap[node].map(|local| (local, slot)))
        .collect();
    let animated: Vec<usize> = kept.iter().map(|&(local, _)| local).collect();

    let sample_count = if kept.is_empty() { 0 } else { animation.sample_count };
    let mut matrices = Vec::with_capacity(sample_count * kept.len());
    for sample in 0..sample_count {
        for &(local, slot) in &kept {
            let mut m = animation.local(sample, slot);
            let source = nodes[local].source;
            if selection.is_skeleton_root(source) {
                let rest = graph.nodes[source].local.w_axis;
                m.w_axis.x -= rest.x;
                m.w_axis.y -= rest.y;
            }
            matrices.push(m);
        }
    }

    let frame_count = sample_count.max(1);
    let frame_bounds: Vec<Aabb> = (0..frame_count)
        .into_par_iter()
        .map(|frame| {
            let mut locals = idle.clone();
            if sample_count > 0 {
                let row = &matrices[frame * animated.len()..(frame + 1) * animated.len()];
                for (&local, m) in animated.iter().zip(row) {
                    locals[local] = *m;
                }
            }
            union_bounds(inputs, &nodes, &skeletons, &compose_worlds(&nodes, &locals))
        })
        .collect();

    tracing::debug!(
        "Composed {} nodes, {} skeletons, {} animated nodes, {} samples",
        nodes.len(),
        skeletons.len(),
        animated.len(),
        sample_count
    );

    Ok(ComposedScene {
        nodes,
        skeletons,
        effects,
        animated,
        sample_count,
        animation: matrices,
        frame_bounds,
    })
}

/// Union of every geometry-carrying node's bounds for one frame
fn union_bounds(
    inputs: &SceneInputs<'_>,
    nodes: &[ComposedNode],
    skeletons: &[ComposedSkeleton],
    worlds: &[Mat4],
) -> Aabb {
    let mut acc: Option<Aabb> = None;
    let mut add = |b: Aabb| {
        acc = Some(match acc {
            Some(a) => a.union(&b),
            None => b,
        });
    };

    for (i, node) in nodes.iter().enumerate() {
        let Some(geometry) = node.geometry else {
            continue;
        };
        match node.skeleton {
            Some(s) => {
                let skel = &skeletons[s];
                for (j, &joint) in skel.joints.iter().enumerate() {
                    let bone = worlds[joint] * skel.inverse_bind[j];
                    let bounds = skel.bounds.get(j).copied().unwrap_or(Aabb::ZERO);
                    add(bounds.transform(&bone));
                }
            }
            None => {
                let bounds = inputs
                    .geometry_bounds
                    .get(geometry)
                    .copied()
                    .unwrap_or(Aabb::ZERO);
                add(bounds.transform(&worlds[i]));
            }
        }
    }

    acc.unwrap_or(Aabb::ZERO)
}
