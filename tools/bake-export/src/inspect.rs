//! Summaries of written blobs

use anyhow::{Context, Result};
use bake_common::formats::{parse_component_tags, GeometryHeader, SceneBlob, BAKE_FORMAT};
use std::fmt;
use std::path::Path;

/// Table sizes of a scene blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub version: u32,
    pub nodes: usize,
    pub skeletons: usize,
    pub joints: usize,
    pub animated_nodes: usize,
    pub samples: u32,
    pub materials: usize,
    pub string_pool: usize,
}

impl SceneSummary {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let blob = SceneBlob::parse(bytes).context("Not a valid scene blob")?;
        Ok(Self {
            version: blob.header.version,
            nodes: blob.nodes.len(),
            skeletons: blob.skeletons.len(),
            joints: blob.skeletons.iter().map(|s| s.joints.len()).sum(),
            animated_nodes: blob.animated_nodes.len(),
            samples: blob.sample_count,
            materials: blob.materials.len(),
            string_pool: blob.strings.len(),
        })
    }
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scene v{}", self.version)?;
        writeln!(f, "  nodes:          {}", self.nodes)?;
        writeln!(f, "  skeletons:      {} ({} joints)", self.skeletons, self.joints)?;
        writeln!(f, "  animated nodes: {}", self.animated_nodes)?;
        writeln!(f, "  samples:        {}", self.samples)?;
        writeln!(f, "  materials:      {}", self.materials)?;
        write!(f, "  string pool:    {} bytes", self.string_pool)
    }
}

/// Header of a geometry blob, checked against its size
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySummary {
    pub header: GeometryHeader,
}

impl GeometrySummary {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = GeometryHeader::from_bytes(bytes).context("Geometry blob too short")?;
        parse_component_tags(&bytes[GeometryHeader::SIZE..], header.component_count)
            .context("Invalid component tag list")?;
        if bytes.len() != header.blob_size() {
            anyhow::bail!(
                "Geometry blob is {} bytes, header implies {}",
                bytes.len(),
                header.blob_size()
            );
        }
        Ok(Self { header })
    }
}

impl fmt::Display for GeometrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        writeln!(f, "geometry v{}", h.version)?;
        writeln!(
            f,
            "  layout:   {} ({} bytes per vertex)",
            if h.is_skinned() { "skinned" } else { "static" },
            h.vertex_size
        )?;
        writeln!(f, "  vertices: {}", h.vertex_count)?;
        writeln!(f, "  indices:  {}", h.index_count)?;
        write!(
            f,
            "  bounds:   center {:?} extent {:?}",
            h.bounds.center, h.bounds.extent
        )
    }
}

/// Describe a .bmi or .bgi file
pub fn inspect_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let summary = if ext == BAKE_FORMAT.scene_ext {
        SceneSummary::from_bytes(&bytes)?.to_string()
    } else if ext == BAKE_FORMAT.geometry_ext {
        GeometrySummary::from_bytes(&bytes)?.to_string()
    } else {
        anyhow::bail!(
            "Unsupported file: {:?} (use .{} or .{})",
            path,
            BAKE_FORMAT.scene_ext,
            BAKE_FORMAT.geometry_ext
        );
    };
    Ok(summary)
}
