//! Bake pipeline errors
//!
//! Every failure is fatal for the file being baked. Errors fall into two
//! classes, see [`ErrorClass`].

use thiserror::Error;

/// Broad category of a [`BakeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or unresolvable data, unsupported constructs
    MalformedInput,
    /// Declared counts or references that do not agree with each other
    StructuralInconsistency,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BakeError {
    #[error("{owner}: source '{source_id}' not found")]
    MissingSource { owner: String, source_id: String },

    #[error("unresolved {kind} reference '{id}'")]
    UnresolvedReference { kind: &'static str, id: String },

    #[error("channel '{channel}': unsupported interpolation '{name}'")]
    UnsupportedInterpolation { channel: String, name: String },

    #[error("node '{node}': unsupported transform '{kind}'")]
    UnsupportedTransform { node: String, kind: String },

    #[error("channel '{channel}': unsupported target component '{component}'")]
    UnsupportedTargetComponent { channel: String, component: String },

    #[error("{owner}: {reason}")]
    InvalidData { owner: String, reason: String },

    #[error("{owner}: expected {expected} indices, found {found}")]
    IndexCountMismatch {
        owner: String,
        expected: usize,
        found: usize,
    },

    #[error("{owner}: index {index} out of range for '{stream}' ({len} elements)")]
    IndexOutOfRange {
        owner: String,
        stream: String,
        index: i64,
        len: usize,
    },

    #[error("geometry '{geometry}': {count} vertices exceed the 16-bit index range")]
    TooManyVertices { geometry: String, count: usize },

    #[error("geometry '{geometry}': {count} input offsets exceed the maximum of {max}")]
    TooManyInputs {
        geometry: String,
        count: usize,
        max: usize,
    },

    #[error("node '{node}': {count} transforms exceed the maximum of {max}")]
    TooManyTransforms {
        node: String,
        count: usize,
        max: usize,
    },

    #[error("controller '{controller}': {count} joints exceed the maximum of {max}")]
    TooManyJoints {
        controller: String,
        count: usize,
        max: usize,
    },

    #[error("controller '{controller}': vertex {vertex} has {count} influences (maximum {max})")]
    TooManyInfluences {
        controller: String,
        vertex: usize,
        count: usize,
        max: usize,
    },

    #[error("controller '{controller}': joint '{joint}' not found below '{root}'")]
    JointNotFound {
        controller: String,
        joint: String,
        root: String,
    },

    #[error("channel '{channel}': {reason}")]
    InvalidKeyframes { channel: String, reason: String },

    #[error("node '{node}': parent {parent} does not precede it")]
    ParentOrder { node: String, parent: usize },
}

impl BakeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingSource { .. }
            | Self::UnresolvedReference { .. }
            | Self::UnsupportedInterpolation { .. }
            | Self::UnsupportedTransform { .. }
            | Self::UnsupportedTargetComponent { .. }
            | Self::InvalidData { .. }
            | Self::IndexOutOfRange { .. }
            | Self::InvalidKeyframes { .. } => ErrorClass::MalformedInput,

            Self::IndexCountMismatch { .. }
            | Self::TooManyVertices { .. }
            | Self::TooManyInputs { .. }
            | Self::TooManyTransforms { .. }
            | Self::TooManyJoints { .. }
            | Self::TooManyInfluences { .. }
            | Self::JointNotFound { .. }
            | Self::ParentOrder { .. } => ErrorClass::StructuralInconsistency,
        }
    }

    pub(crate) fn invalid(owner: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            owner: owner.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            id: id.into(),
        }
    }
}

pub type BakeResult<T> = Result<T, BakeError>;
