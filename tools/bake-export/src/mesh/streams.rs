//! Stream resolution: binds geometry inputs to float sources and corner slots

use smallvec::SmallVec;

use super::types::{CornerKey, MAX_CORNER_WIDTH};
use crate::document::GeometryDesc;
use crate::error::{BakeError, BakeResult};

/// Attribute semantics understood by the indexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Position = 0,
    Texcoord = 1,
    Normal = 2,
    Binormal = 3,
    Tangent = 4,
}

impl Semantic {
    pub const ALL: [Semantic; 5] = [
        Semantic::Position,
        Semantic::Texcoord,
        Semantic::Normal,
        Semantic::Binormal,
        Semantic::Tangent,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "POSITION" => Some(Self::Position),
            "TEXCOORD" => Some(Self::Texcoord),
            "NORMAL" => Some(Self::Normal),
            "TEXBINORMAL" => Some(Self::Binormal),
            "TEXTANGENT" => Some(Self::Tangent),
            _ => None,
        }
    }

    /// Number of components decoded per element
    pub fn components(self) -> usize {
        match self {
            Self::Texcoord => 2,
            _ => 3,
        }
    }

    /// Whether the decoded value takes part in value canonicalization
    pub fn is_canonicalized(self) -> bool {
        matches!(self, Self::Position | Self::Texcoord | Self::Normal)
    }
}

/// One float source bound to a corner slot
#[derive(Debug, Clone, Copy)]
pub struct AttributeStream<'a> {
    pub source: &'a str,
    pub data: &'a [f32],
    pub stride: usize,
    /// Index of this stream's raw index within a [`CornerKey`]
    pub slot: usize,
}

impl AttributeStream<'_> {
    /// Number of whole elements
    pub fn len(&self) -> usize {
        self.data.len() / self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode element `index` into a fixed 3-lane value.
    ///
    /// Reads `min(stride, components)` floats; remaining lanes are zero.
    /// Callers validate indices during resolution.
    pub fn decode(&self, index: u32, components: usize) -> [f32; 3] {
        let mut out = [0.0; 3];
        let base = index as usize * self.stride;
        let n = components.min(self.stride);
        if let Some(element) = self.data.get(base..base + n) {
            out[..n].copy_from_slice(element);
        }
        out
    }
}

/// Geometry with its streams bound and its corner keys gathered
#[derive(Debug, Clone)]
pub struct ResolvedGeometry<'a> {
    pub id: &'a str,
    /// Indexed by [`Semantic`]; `None` when the geometry lacks that stream
    pub streams: [Option<AttributeStream<'a>>; 5],
    /// Number of raw indices per corner
    pub width: usize,
    pub corners: Vec<CornerKey>,
}

impl<'a> ResolvedGeometry<'a> {
    pub fn stream(&self, semantic: Semantic) -> Option<&AttributeStream<'a>> {
        self.streams[semantic as usize].as_ref()
    }

    /// Decoded value of `semantic` at a corner, zero when the stream is absent
    pub fn decode(&self, semantic: Semantic, corner: &CornerKey) -> [f32; 3] {
        match self.stream(semantic) {
            Some(s) => s.decode(corner[s.slot], semantic.components()),
            None => [0.0; 3],
        }
    }

    /// Source positions in element order
    pub fn source_positions(&self) -> Vec<glam::Vec3> {
        match self.stream(Semantic::Position) {
            Some(s) => (0..s.len() as u32)
                .map(|i| glam::Vec3::from_array(s.decode(i, 3)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Slots carrying at least one canonicalized semantic, each with the
    /// semantics stored in it
    pub fn canonical_slots(&self) -> SmallVec<[(usize, SmallVec<[Semantic; 3]>); 3]> {
        let mut slots: SmallVec<[(usize, SmallVec<[Semantic; 3]>); 3]> = SmallVec::new();
        for semantic in Semantic::ALL {
            if !semantic.is_canonicalized() {
                continue;
            }
            let Some(stream) = self.stream(semantic) else {
                continue;
            };
            match slots.iter_mut().find(|(slot, _)| *slot == stream.slot) {
                Some((_, members)) => members.push(semantic),
                None => slots.push((stream.slot, SmallVec::from_slice(&[semantic]))),
            }
        }
        slots
    }
}

/// Bind every input of `geom` to its source and gather the corner keys.
pub fn resolve(geom: &GeometryDesc) -> BakeResult<ResolvedGeometry<'_>> {
    let owner = format!("geometry '{}'", geom.id);
    let mut streams: [Option<AttributeStream<'_>>; 5] = [None; 5];

    let mut bind = |semantic: &str, source_url: &str, slot: usize| -> BakeResult<()> {
        let Some(semantic) = Semantic::parse(semantic) else {
            tracing::debug!("{}: ignoring input semantic {}", owner, semantic);
            return Ok(());
        };
        // First input of a semantic wins
        if streams[semantic as usize].is_some() {
            return Ok(());
        }
        let source = geom
            .source(source_url)
            .ok_or_else(|| BakeError::MissingSource {
                owner: owner.clone(),
                source_id: source_url.to_string(),
            })?;
        if source.stride == 0 {
            return Err(BakeError::invalid(
                owner.clone(),
                format!("source '{}' has zero stride", source.id),
            ));
        }
        streams[semantic as usize] = Some(AttributeStream {
            source: &source.id,
            data: &source.data,
            stride: source.stride,
            slot,
        });
        Ok(())
    };

    let mut width = 0;
    for input in &geom.inputs {
        if input.offset >= MAX_CORNER_WIDTH {
            return Err(BakeError::TooManyInputs {
                geometry: geom.id.clone(),
                count: input.offset + 1,
                max: MAX_CORNER_WIDTH,
            });
        }
        width = width.max(input.offset + 1);

        if input.semantic == "VERTEX" {
            for v in &geom.vertices {
                bind(&v.semantic, &v.source, input.offset)?;
            }
        } else {
            bind(&input.semantic, &input.source, input.offset)?;
        }
    }

    let corners = gather_corners(geom, width)?;

    let resolved = ResolvedGeometry {
        id: &geom.id,
        streams,
        width,
        corners,
    };
    validate_indices(&resolved)?;
    Ok(resolved)
}

fn gather_corners(geom: &GeometryDesc, width: usize) -> BakeResult<Vec<CornerKey>> {
    let mut corners = Vec::new();
    for (block_index, block) in geom.triangles.iter().enumerate() {
        let expected = block.count * 3 * width;
        if block.p.len() != expected {
            return Err(BakeError::IndexCountMismatch {
                owner: format!("geometry '{}' triangles[{}]", geom.id, block_index),
                expected,
                found: block.p.len(),
            });
        }
        if width == 0 {
            continue;
        }
        corners.extend(block.p.chunks_exact(width).map(|raw| {
            let mut key: CornerKey = [0; MAX_CORNER_WIDTH];
            key[..width].copy_from_slice(raw);
            key
        }));
    }
    Ok(corners)
}

fn validate_indices(geom: &ResolvedGeometry<'_>) -> BakeResult<()> {
    for stream in geom.streams.iter().flatten() {
        let len = stream.len();
        if let Some(bad) = geom
            .corners
            .iter()
            .map(|c| c[stream.slot])
            .find(|&i| i as usize >= len)
        {
            return Err(BakeError::IndexOutOfRange {
                owner: format!("geometry '{}'", geom.id),
                stream: stream.source.to_string(),
                index: bad as i64,
                len,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FloatSourceDesc, InputDesc, OffsetInputDesc, TriangleBlock};

    fn source(id: &str, stride: usize, data: &[f32]) -> FloatSourceDesc {
        FloatSourceDesc {
            id: id.into(),
            stride,
            data: data.to_vec(),
        }
    }

    fn triangle_geometry(p: Vec<u32>, count: usize) -> GeometryDesc {
        GeometryDesc {
            id: "tri".into(),
            name: "tri".into(),
            sources: vec![
                source("pos", 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
                source("uv", 2, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
            ],
            vertices: vec![InputDesc {
                semantic: "POSITION".into(),
                source: "#pos".into(),
            }],
            inputs: vec![
                OffsetInputDesc {
                    semantic: "VERTEX".into(),
                    source: "#verts".into(),
                    offset: 0,
                },
                OffsetInputDesc {
                    semantic: "TEXCOORD".into(),
                    source: "#uv".into(),
                    offset: 1,
                },
            ],
            triangles: vec![TriangleBlock { count, p }],
        }
    }

    #[test]
    fn test_resolve_binds_vertex_offset() {
        let geom = triangle_geometry(vec![0, 0, 1, 1, 2, 2], 1);
        let resolved = resolve(&geom).unwrap();
        assert_eq!(resolved.width, 2);
        assert_eq!(resolved.corners.len(), 3);
        assert_eq!(resolved.stream(Semantic::Position).unwrap().slot, 0);
        assert_eq!(resolved.stream(Semantic::Texcoord).unwrap().slot, 1);
        assert!(resolved.stream(Semantic::Normal).is_none());
        assert_eq!(
            resolved.decode(Semantic::Position, &resolved.corners[1]),
            [1.0, 0.0, 0.0]
        );
        assert_eq!(
            resolved.decode(Semantic::Normal, &resolved.corners[1]),
            [0.0; 3]
        );
    }

    #[test]
    fn test_index_count_mismatch() {
        let geom = triangle_geometry(vec![0, 0, 1, 1, 2], 1);
        let err = resolve(&geom).unwrap_err();
        assert!(matches!(
            err,
            BakeError::IndexCountMismatch {
                expected: 6,
                found: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_source() {
        let mut geom = triangle_geometry(vec![0, 0, 1, 1, 2, 2], 1);
        geom.inputs[1].source = "#nope".into();
        let err = resolve(&geom).unwrap_err();
        assert!(matches!(err, BakeError::MissingSource { ref source_id, .. } if source_id == "#nope"));
    }

    #[test]
    fn test_index_out_of_range() {
        let geom = triangle_geometry(vec![0, 0, 1, 1, 3, 2], 1);
        let err = resolve(&geom).unwrap_err();
        assert!(matches!(err, BakeError::IndexOutOfRange { index: 3, len: 3, .. }));
    }

    #[test]
    fn test_too_many_inputs() {
        let mut geom = triangle_geometry(vec![], 0);
        geom.inputs[1].offset = 8;
        assert!(matches!(
            resolve(&geom).unwrap_err(),
            BakeError::TooManyInputs { .. }
        ));
    }

    #[test]
    fn test_shared_slot_groups_semantics() {
        let mut geom = triangle_geometry(vec![0, 1, 2], 1);
        geom.inputs[1].offset = 0;
        let resolved = resolve(&geom).unwrap();
        let slots = resolved.canonical_slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].0, 0);
        assert_eq!(
            slots[0].1.as_slice(),
            &[Semantic::Position, Semantic::Texcoord]
        );
    }
}
