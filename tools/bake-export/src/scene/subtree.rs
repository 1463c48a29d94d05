//! Sub-tree selection for stand-alone object export

use super::SceneGraph;

/// Nodes kept for one exported scene blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected root, `None` for the full scene
    pub root: Option<usize>,
    /// Selected graph node indices in document order
    pub nodes: Vec<usize>,
    /// Graph node index -> position in `nodes`
    pub remap: Vec<Option<usize>>,
    /// Graph indices of the top-most ancestors of referenced skeletons
    pub skeleton_roots: Vec<usize>,
}

impl Selection {
    pub fn contains(&self, node: usize) -> bool {
        self.remap.get(node).is_some_and(Option::is_some)
    }

    pub fn is_skeleton_root(&self, node: usize) -> bool {
        self.skeleton_roots.contains(&node)
    }
}

/// Select `root` and its descendants, or every node when `root` is `None`.
///
/// The selection is closed over skeletons: every skeleton used by a selected
/// node pulls in the whole tree under the top-most ancestor of its first
/// joint, which may in turn reference further skeletons.
pub fn select_subtree(graph: &SceneGraph, root: Option<usize>) -> Selection {
    let count = graph.nodes.len();
    let mut mask = match root {
        Some(r) => graph.subtree_mask(r),
        None => vec![true; count],
    };
    let mut skeleton_roots: Vec<usize> = Vec::new();

    loop {
        let mut grown = false;
        for i in 0..count {
            if !mask[i] {
                continue;
            }
            let Some(first_joint) = graph.nodes[i]
                .skeleton
                .and_then(|s| graph.skeletons[s].joints.first().copied())
            else {
                continue;
            };
            let top = graph.top_ancestor(first_joint);
            if !skeleton_roots.contains(&top) {
                skeleton_roots.push(top);
            }
            if !mask[top] {
                tracing::debug!(
                    "Selection pulls in skeleton tree '{}' for node '{}'",
                    graph.nodes[top].id,
                    graph.nodes[i].id
                );
                for (m, add) in mask.iter_mut().zip(graph.subtree_mask(top)) {
                    *m |= add;
                }
                grown = true;
            }
        }
        if !grown {
            break;
        }
    }

    let nodes: Vec<usize> = (0..count).filter(|&i| mask[i]).collect();
    let mut remap = vec![None; count];
    for (local, &node) in nodes.iter().enumerate() {
        remap[node] = Some(local);
    }

    Selection {
        root,
        nodes,
        remap,
        skeleton_roots,
    }
}
