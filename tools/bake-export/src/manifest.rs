//! Manifest parsing and build orchestration
//!
//! Parses bake.toml and bakes every listed scene.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::pipeline::{bake_file, BakeOptions};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct BakeManifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub options: BakeOptions,
    #[serde(default)]
    pub scenes: Vec<SceneEntry>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("baked/")
}

#[derive(Debug, Deserialize)]
pub struct SceneEntry {
    pub path: PathBuf,
    /// Overrides `options.export_standalone_objects` for this scene
    #[serde(default)]
    pub standalone_objects: Option<bool>,
}

impl BakeManifest {
    /// Parse manifest text; relative paths resolve against `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: BakeManifest = toml::from_str(text).context("Failed to parse manifest")?;
        manifest.base_dir = base_dir.to_path_buf();
        Ok(manifest)
    }

    pub fn scene_path(&self, entry: &SceneEntry) -> PathBuf {
        self.base_dir.join(&entry.path)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.output.dir)
    }

    /// Options for one scene
    pub fn options_for(&self, entry: &SceneEntry) -> BakeOptions {
        let mut options = self.options.clone();
        if let Some(standalone) = entry.standalone_objects {
            options.export_standalone_objects = standalone;
        }
        options
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<BakeManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let base_dir = path.parent().unwrap_or(Path::new(""));
    BakeManifest::parse(&content, base_dir)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))
}

/// Validate a manifest without building
pub fn validate(manifest: &BakeManifest) -> Result<()> {
    if manifest.scenes.is_empty() {
        anyhow::bail!("Manifest lists no scenes");
    }
    for entry in &manifest.scenes {
        let path = manifest.scene_path(entry);
        if !path.exists() {
            anyhow::bail!("Scene source not found: {:?}", path);
        }
    }
    Ok(())
}

/// Bake all scenes of a manifest
pub fn build_all(manifest: &BakeManifest, output_override: Option<&Path>) -> Result<Vec<PathBuf>> {
    let output_dir = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.output_dir());

    let mut written = Vec::new();
    for entry in &manifest.scenes {
        let input = manifest.scene_path(entry);
        tracing::info!("Baking scene: {:?} -> {:?}", input, output_dir);
        written.extend(bake_file(&input, &output_dir, &manifest.options_for(entry))?);
    }
    Ok(written)
}
