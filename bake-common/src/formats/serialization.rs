//! Binary serialization trait for format records.
//!
//! All fixed-size records implement `BinarySerializable` for consistent
//! serialization/deserialization. Each record also keeps its type-specific
//! `to_bytes()` method returning a fixed-size array.

use crate::bounds::Aabb;

/// Trait for binary-serializable fixed-size records.
///
/// The trait uses `Vec<u8>` for the return type because associated const
/// generics in return types (`[u8; Self::SIZE]`) are not yet stable in Rust.
///
/// # Example
///
/// ```
/// use bake_common::formats::{BinarySerializable, MaterialRecord};
///
/// let record = MaterialRecord::new(1, 0);
///
/// let bytes = record.serialize();
/// let parsed = MaterialRecord::deserialize(&bytes).unwrap();
/// assert_eq!(parsed, record);
/// ```
pub trait BinarySerializable: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Serialize to bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes.
    ///
    /// Returns `None` if the byte slice is too short or contains invalid data.
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_binary_serializable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BinarySerializable for $ty {
                const SIZE: usize = <$ty>::SIZE;

                fn serialize(&self) -> Vec<u8> {
                    self.to_bytes().to_vec()
                }

                fn deserialize(bytes: &[u8]) -> Option<Self> {
                    Self::from_bytes(bytes)
                }
            }
        )*
    };
}

impl_binary_serializable!(
    super::GeometryHeader,
    super::SceneHeader,
    super::NodeRecord,
    super::SkeletonHeader,
    super::MaterialRecord,
    Aabb,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{GeometryHeader, NodeRecord, SceneHeader, SkeletonHeader};
    use glam::{Mat4, Vec3};

    fn roundtrip<T: BinarySerializable + PartialEq + std::fmt::Debug>(value: T) {
        let bytes = value.serialize();
        assert_eq!(bytes.len(), T::SIZE);
        assert_eq!(T::deserialize(&bytes), Some(value));
        assert!(T::deserialize(&bytes[..T::SIZE - 1]).is_none());
    }

    #[test]
    fn test_all_records_roundtrip() {
        roundtrip(SceneHeader::new());
        roundtrip(GeometryHeader::new(
            10,
            30,
            true,
            Aabb::new(Vec3::ONE, Vec3::splat(2.0)),
        ));
        roundtrip(NodeRecord {
            name: 1,
            geometry: 0,
            parent: 0,
            skeleton: crate::formats::NONE_ID,
            effect: 2,
            flags: 0,
            model: Mat4::from_translation(Vec3::X),
            model_original: Mat4::IDENTITY,
        });
        roundtrip(SkeletonHeader::new(3, Mat4::from_scale(Vec3::splat(2.0))));
    }

    #[test]
    fn test_sizes() {
        assert_eq!(<SceneHeader as BinarySerializable>::SIZE, 8);
        assert_eq!(<GeometryHeader as BinarySerializable>::SIZE, 48);
        assert_eq!(<NodeRecord as BinarySerializable>::SIZE, 152);
        assert_eq!(<SkeletonHeader as BinarySerializable>::SIZE, 68);
        assert_eq!(<Aabb as BinarySerializable>::SIZE, 24);
    }
}
