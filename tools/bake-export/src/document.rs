//! Parsed scene description consumed by the bake pipeline
//!
//! This is the in-memory form of an already-parsed interchange document.
//! It deserializes from JSON so the CLI can bake descriptions written by an
//! external front end. All arrays are kept raw; validation happens in the
//! pipeline stages that consume them.

use serde::Deserialize;

/// Complete scene description
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneDocument {
    pub images: Vec<ImageDesc>,
    pub effects: Vec<EffectDesc>,
    pub materials: Vec<MaterialDesc>,
    pub geometries: Vec<GeometryDesc>,
    pub controllers: Vec<ControllerDesc>,
    /// Nodes in document order; parents precede children
    pub nodes: Vec<NodeDesc>,
    pub animations: Vec<ChannelDesc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageDesc {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectDesc {
    pub id: String,
    /// Image id of the diffuse color map
    #[serde(default)]
    pub diffuse_texture: Option<String>,
    /// Image id of the transparency map
    #[serde(default)]
    pub transparent_texture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDesc {
    pub id: String,
    /// Effect url
    pub effect: String,
}

/// Named float array with element stride
#[derive(Debug, Clone, Deserialize)]
pub struct FloatSourceDesc {
    pub id: String,
    pub stride: usize,
    pub data: Vec<f32>,
}

/// Input bound through the `vertices` element (no offset of its own)
#[derive(Debug, Clone, Deserialize)]
pub struct InputDesc {
    pub semantic: String,
    pub source: String,
}

/// Input of a triangle list with its slot in each corner tuple
#[derive(Debug, Clone, Deserialize)]
pub struct OffsetInputDesc {
    pub semantic: String,
    pub source: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriangleBlock {
    /// Declared triangle count
    pub count: usize,
    /// Flat per-corner index tuples
    pub p: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeometryDesc {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sources: Vec<FloatSourceDesc>,
    #[serde(default)]
    pub vertices: Vec<InputDesc>,
    #[serde(default)]
    pub inputs: Vec<OffsetInputDesc>,
    #[serde(default)]
    pub triangles: Vec<TriangleBlock>,
}

impl GeometryDesc {
    pub fn source(&self, id: &str) -> Option<&FloatSourceDesc> {
        let id = strip_url(id);
        self.sources.iter().find(|s| s.id == id)
    }
}

/// Skin controller
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerDesc {
    pub id: String,
    /// Url of the skinned geometry
    pub skin_source: String,
    /// Row-major
    #[serde(default = "identity_matrix")]
    pub bind_shape_matrix: [f32; 16],
    /// Joint sids
    pub joints: Vec<String>,
    /// Row-major, 16 floats per joint
    pub inverse_bind_matrices: Vec<f32>,
    pub weights: Vec<f32>,
    /// Influence count per vertex
    pub vcount: Vec<u32>,
    /// Flat (joint index, weight index) pairs
    pub v: Vec<i32>,
}

fn identity_matrix() -> [f32; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Matrix,
    Rotate,
    Translate,
    Scale,
    Lookat,
    Skew,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransformDesc {
    pub kind: TransformKind,
    #[serde(default)]
    pub sid: Option<String>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeometryInstanceDesc {
    pub url: String,
    #[serde(default)]
    pub material: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerInstanceDesc {
    pub url: String,
    #[serde(default)]
    pub material: Option<String>,
    /// Url of the skeleton root node
    #[serde(default)]
    pub skeleton: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDesc {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sid: Option<String>,
    /// Index of the parent node, which must come earlier in the list
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub transforms: Vec<TransformDesc>,
    #[serde(default)]
    pub geometry: Option<GeometryInstanceDesc>,
    #[serde(default)]
    pub controller: Option<ControllerInstanceDesc>,
}

impl NodeDesc {
    /// Name used in output tables, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StridedDesc {
    pub stride: usize,
    pub data: Vec<f32>,
}

/// One animation channel
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDesc {
    #[serde(default)]
    pub id: String,
    /// `node/sid.X`, `node/sid(i)`, `node/sid(i)(j)` or `node/sid`
    pub target: String,
    pub input: Vec<f32>,
    pub output: StridedDesc,
    #[serde(default)]
    pub in_tangent: Option<StridedDesc>,
    #[serde(default)]
    pub out_tangent: Option<StridedDesc>,
    /// One interpolation name per keyframe
    pub interpolation: Vec<String>,
}

/// Strip a leading `#` from a url reference.
pub fn strip_url(url: &str) -> &str {
    url.strip_prefix('#').unwrap_or(url)
}

impl SceneDocument {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn geometry_index(&self, url: &str) -> Option<usize> {
        let id = strip_url(url);
        self.geometries.iter().position(|g| g.id == id)
    }

    pub fn controller_index(&self, url: &str) -> Option<usize> {
        let id = strip_url(url);
        self.controllers.iter().position(|c| c.id == id)
    }

    pub fn material_index(&self, url: &str) -> Option<usize> {
        let id = strip_url(url);
        self.materials.iter().position(|m| m.id == id)
    }

    pub fn effect_index(&self, url: &str) -> Option<usize> {
        let id = strip_url(url);
        self.effects.iter().position(|e| e.id == id)
    }

    pub fn node_index(&self, url: &str) -> Option<usize> {
        let id = strip_url(url);
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn image(&self, url: &str) -> Option<&ImageDesc> {
        let id = strip_url(url);
        self.images.iter().find(|i| i.id == id)
    }
}
