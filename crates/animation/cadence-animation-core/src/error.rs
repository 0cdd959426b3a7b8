//! Error types for the animation core

use serde::{Deserialize, Serialize};

use crate::value::{ValueKind, VectorComponent};

/// Entity family a handle points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Spline,
    DataBinding,
    Instance,
    Animation,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Spline => "spline",
            EntityKind::DataBinding => "data binding",
            EntityKind::Instance => "animation instance",
            EntityKind::Animation => "animation",
        };
        f.write_str(name)
    }
}

/// Contract violations reported at the API boundary.
///
/// An animation with an unset or empty time range is not an error: it simply
/// never activates.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// Handle does not resolve (never allocated, removed, or stale generation)
    #[error("{kind} not found: index {index} generation {generation}")]
    EntityNotFound {
        kind: EntityKind,
        index: u32,
        generation: u32,
    },

    /// Binding cannot receive values produced by the instance's spline
    #[error("binding type {binding:?} is incompatible with spline type {spline:?} (component {component:?})")]
    IncompatibleBindingType {
        spline: ValueKind,
        component: VectorComponent,
        binding: ValueKind,
    },

    /// Key value kind differs from the spline value kind
    #[error("key type {actual:?} does not match spline type {expected:?}")]
    KeyTypeMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Tangent presence does not match the spline key shape
    #[error("key shape mismatch: spline stores {expected} keys")]
    KeyShapeMismatch { expected: String },

    #[error("key index {index} out of range (spline has {len} keys)")]
    KeyIndexOutOfRange { index: usize, len: usize },

    /// Bezier interpolation needs tangent keys
    #[error("bezier interpolation requires a spline with tangent keys")]
    BezierRequiresTangents,

    /// Explicitly validated range is unset or empty
    #[error("invalid time range: start {start:?} stop {stop:?}")]
    InvalidTimeRange {
        start: Option<u64>,
        stop: Option<u64>,
    },

    /// Playback speed must be finite and positive
    #[error("invalid playback speed {speed}")]
    InvalidPlaybackSpeed { speed: f32 },

    #[error("serialization error: {reason}")]
    SerializationError { reason: String },
}

impl AnimationError {
    pub(crate) fn not_found<T>(kind: EntityKind, handle: crate::ids::Handle<T>) -> Self {
        let err = Self::EntityNotFound {
            kind,
            index: handle.index(),
            generation: handle.generation(),
        };
        log::error!("{err}");
        err
    }

    /// Get error category for logging/metrics
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::EntityNotFound { .. } => "handle",
            Self::IncompatibleBindingType { .. }
            | Self::KeyTypeMismatch { .. }
            | Self::KeyShapeMismatch { .. }
            | Self::BezierRequiresTangents => "type",
            Self::KeyIndexOutOfRange { .. }
            | Self::InvalidTimeRange { .. }
            | Self::InvalidPlaybackSpeed { .. } => "validation",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnimationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Handle;

    #[test]
    fn not_found_carries_handle_parts() {
        let h: Handle<()> = Handle::new(4, 2);
        let err = AnimationError::not_found(EntityKind::Animation, h);
        assert_eq!(
            err,
            AnimationError::EntityNotFound {
                kind: EntityKind::Animation,
                index: 4,
                generation: 2
            }
        );
        assert_eq!(err.to_string(), "animation not found: index 4 generation 2");
        assert_eq!(err.category(), "handle");
    }

    #[test]
    fn serialization_roundtrip() {
        let error = AnimationError::KeyIndexOutOfRange { index: 3, len: 1 };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: AnimationError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
