//! Baked geometry binary format (.bgi)
//!
//! One indexed triangle list per geometry. POD format - no magic bytes.
//!
//! # Layout
//! ```text
//! 0x00: version         u32
//! 0x04: component_count u32 (including the END tag)
//! 0x08: vertex_count    u32
//! 0x0C: vertex_size     u32 (24 static, 36 skinned)
//! 0x10: index_count     u32
//! 0x14: index_size      u32 (always 2)
//! 0x18: bounds          center f32x3 + extent f32x3
//! 0x30: component tags  u32 x component_count, last one END
//! var:  vertex_data     (vertex_count * vertex_size)
//! var:  index_data      (index_count * 2)
//! ```

use crate::bounds::Aabb;

use super::GEOMETRY_VERSION;

/// Vertex component type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ComponentType {
    End = 0,
    Float2 = 1,
    Float3 = 2,
    Float4 = 3,
    /// Two normalized signed shorts
    Int16x2Norm = 4,
    /// Four normalized signed shorts
    Int16x4Norm = 5,
    /// Four unsigned bytes
    Uint8x4 = 6,
}

impl ComponentType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::End),
            1 => Some(Self::Float2),
            2 => Some(Self::Float3),
            3 => Some(Self::Float4),
            4 => Some(Self::Int16x2Norm),
            5 => Some(Self::Int16x4Norm),
            6 => Some(Self::Uint8x4),
            _ => None,
        }
    }

    /// Size of this component in bytes
    pub const fn size(self) -> u32 {
        match self {
            Self::End => 0,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Int16x2Norm => 4,
            Self::Int16x4Norm => 8,
            Self::Uint8x4 => 4,
        }
    }
}

/// position, texcoord, normal
pub const STATIC_LAYOUT: [ComponentType; 4] = [
    ComponentType::Float3,
    ComponentType::Int16x2Norm,
    ComponentType::Int16x4Norm,
    ComponentType::End,
];

/// position, texcoord, normal, skin weights, skin bone indices
pub const SKINNED_LAYOUT: [ComponentType; 6] = [
    ComponentType::Float3,
    ComponentType::Int16x2Norm,
    ComponentType::Int16x4Norm,
    ComponentType::Int16x4Norm,
    ComponentType::Uint8x4,
    ComponentType::End,
];

/// Vertex stride of a component layout
pub const fn layout_stride(layout: &[ComponentType]) -> u32 {
    let mut stride = 0;
    let mut i = 0;
    while i < layout.len() {
        stride += layout[i].size();
        i += 1;
    }
    stride
}

/// Static vertex stride in bytes
pub const STATIC_VERTEX_SIZE: u32 = layout_stride(&STATIC_LAYOUT);

/// Skinned vertex stride in bytes
pub const SKINNED_VERTEX_SIZE: u32 = layout_stride(&SKINNED_LAYOUT);

/// Baked geometry header (48 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryHeader {
    pub version: u32,
    pub component_count: u32,
    pub vertex_count: u32,
    pub vertex_size: u32,
    pub index_count: u32,
    pub index_size: u32,
    pub bounds: Aabb,
}

impl GeometryHeader {
    pub const SIZE: usize = 48;

    pub fn new(vertex_count: u32, index_count: u32, skinned: bool, bounds: Aabb) -> Self {
        let layout = Self::layout_for(skinned);
        Self {
            version: GEOMETRY_VERSION,
            component_count: layout.len() as u32,
            vertex_count,
            vertex_size: layout_stride(layout),
            index_count,
            index_size: 2,
            bounds,
        }
    }

    /// Component layout for static or skinned vertices
    pub fn layout_for(skinned: bool) -> &'static [ComponentType] {
        if skinned {
            &SKINNED_LAYOUT
        } else {
            &STATIC_LAYOUT
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.vertex_size == SKINNED_VERTEX_SIZE
    }

    /// Size of the tag list following the header
    pub fn tags_size(&self) -> usize {
        self.component_count as usize * 4
    }

    /// Total blob size implied by this header
    pub fn blob_size(&self) -> usize {
        Self::SIZE
            + self.tags_size()
            + self.vertex_count as usize * self.vertex_size as usize
            + self.index_count as usize * self.index_size as usize
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.component_count.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.vertex_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.vertex_size.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.index_count.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.index_size.to_le_bytes());
        bytes[24..48].copy_from_slice(&self.bounds.to_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let u = |o: usize| u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);
        Some(Self {
            version: u(0),
            component_count: u(4),
            vertex_count: u(8),
            vertex_size: u(12),
            index_count: u(16),
            index_size: u(20),
            bounds: Aabb::from_bytes(&bytes[24..48])?,
        })
    }
}

/// Parse the END-terminated component tag list that follows the header.
///
/// Returns `None` if the list is truncated, contains an unknown tag, or
/// does not end with exactly one END tag.
pub fn parse_component_tags(bytes: &[u8], count: u32) -> Option<Vec<ComponentType>> {
    let count = count as usize;
    if count == 0 || bytes.len() < count * 4 {
        return None;
    }
    let tags = bytes[..count * 4]
        .chunks_exact(4)
        .map(|c| ComponentType::from_u32(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
        .collect::<Option<Vec<_>>>()?;
    let end_at = tags.iter().position(|&t| t == ComponentType::End)?;
    (end_at == count - 1).then_some(tags)
}
