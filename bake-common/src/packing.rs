//! Vertex data packing utilities
//!
//! Provides functions to convert f32 vertex data to the packed blob formats:
//! - f32 → snorm16 (signed normalized, -1.0 to 1.0)
//! - texcoord → snorm16x2 with the V axis flipped
//! - normal → snorm16x4 (w = 0)
//! - normalized skin weights → snorm16x4 summing exactly to 32767
//!
//! Used by `bake-export` (asset pipeline) and by readers of the geometry blobs.

/// Fixed-point representation of a full weight (1.0) in snorm16.
pub const WEIGHT_ONE: i16 = 32767;

// ============================================================================
// Basic Conversion Functions
// ============================================================================

/// Convert f32 to signed normalized 16-bit integer (snorm16)
///
/// Maps f32 range [-1.0, 1.0] to i16 range [-32767, 32767].
#[inline]
pub fn f32_to_snorm16(value: f32) -> i16 {
    let clamped = value.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

/// Convert signed normalized 16-bit integer back to f32
#[inline]
pub fn snorm16_to_f32(value: i16) -> f32 {
    (value as f32 / 32767.0).max(-1.0)
}

// ============================================================================
// Attribute Packing
// ============================================================================

/// Pack a texture coordinate as snorm16x2, flipping V (`v' = 1 - v`).
#[inline]
pub fn pack_texcoord_snorm16(uv: [f32; 2]) -> [i16; 2] {
    [f32_to_snorm16(uv[0]), f32_to_snorm16(1.0 - uv[1])]
}

/// Pack a normal as snorm16x4 with w = 0.
///
/// The vertex layout declares normals as a 4-component normalized short,
/// so the fourth lane is written explicitly.
#[inline]
pub fn pack_normal_snorm16(normal: [f32; 3]) -> [i16; 4] {
    [
        f32_to_snorm16(normal[0]),
        f32_to_snorm16(normal[1]),
        f32_to_snorm16(normal[2]),
        0,
    ]
}

// ============================================================================
// Skin Weight Quantization
// ============================================================================

/// Quantize four normalized weights to snorm16.
///
/// Each weight is rounded to `round(w * 32767)`. The rounding residual is
/// added to the largest slot so the four values always sum to [`WEIGHT_ONE`].
/// Input weights are expected to be non-negative and to sum to 1.0.
pub fn quantize_weights_snorm16(weights: [f32; 4]) -> [i16; 4] {
    let mut quantized = [0i32; 4];
    let mut dominant = 0;
    for (i, &w) in weights.iter().enumerate() {
        quantized[i] = (w.clamp(0.0, 1.0) * WEIGHT_ONE as f32).round() as i32;
        if weights[i] > weights[dominant] {
            dominant = i;
        }
    }

    let residual = WEIGHT_ONE as i32 - quantized.iter().sum::<i32>();
    quantized[dominant] += residual;

    quantized.map(|q| q.clamp(0, WEIGHT_ONE as i32) as i16)
}
