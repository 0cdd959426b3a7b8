//! Spline data model: ordered keys with unique, strictly ascending timestamps.

use serde::{Deserialize, Serialize};

use crate::error::{AnimationError, Result};
use crate::time::SplineTimeStamp;
use crate::value::{Value, ValueKind};

/// 2D vector used for key tangents (x = time offset, y = value offset).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bezier tangents of a key: `in` arrives at the key, `out` departs from it.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Tangents {
    #[serde(rename = "in")]
    pub r#in: Vec2,
    #[serde(rename = "out")]
    pub r#out: Vec2,
}

impl Tangents {
    pub const FLAT: Tangents = Tangents {
        r#in: Vec2::ZERO,
        r#out: Vec2::ZERO,
    };
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum KeyShape {
    /// Value only
    Basic,
    /// Value plus in/out tangents; required for bezier evaluation
    Tangents,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SplineKey {
    pub value: Value,
    #[serde(default)]
    pub tangents: Option<Tangents>,
}

impl SplineKey {
    pub fn basic(value: Value) -> Self {
        Self {
            value,
            tangents: None,
        }
    }

    pub fn with_tangents(value: Value, tan_in: Vec2, tan_out: Vec2) -> Self {
        Self {
            value,
            tangents: Some(Tangents {
                r#in: tan_in,
                r#out: tan_out,
            }),
        }
    }

    #[inline]
    pub fn shape(&self) -> KeyShape {
        if self.tangents.is_some() {
            KeyShape::Tangents
        } else {
            KeyShape::Basic
        }
    }
}

/// A typed key series. Timestamps and keys are kept in parallel vectors so
/// segment lookups only touch the timestamp slice.
#[derive(Clone, Debug, PartialEq)]
pub struct Spline {
    key_shape: KeyShape,
    value_kind: ValueKind,
    timestamps: Vec<SplineTimeStamp>,
    keys: Vec<SplineKey>,
}

impl Spline {
    pub fn new(key_shape: KeyShape, value_kind: ValueKind) -> Self {
        Self {
            key_shape,
            value_kind,
            timestamps: Vec::new(),
            keys: Vec::new(),
        }
    }

    #[inline]
    pub fn key_shape(&self) -> KeyShape {
        self.key_shape
    }

    #[inline]
    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    fn check_key(&self, key: &SplineKey) -> Result<()> {
        if key.value.kind() != self.value_kind {
            return Err(AnimationError::KeyTypeMismatch {
                expected: self.value_kind,
                actual: key.value.kind(),
            });
        }
        if key.shape() != self.key_shape {
            return Err(AnimationError::KeyShapeMismatch {
                expected: format!("{:?}", self.key_shape),
            });
        }
        Ok(())
    }

    /// Insert a key (or replace the key at an equal timestamp) and return its
    /// index. Indices shift on later inserts/removals; re-resolve by timestamp.
    pub fn set_key(&mut self, timestamp: SplineTimeStamp, key: SplineKey) -> Result<usize> {
        self.check_key(&key)?;
        match self.timestamps.binary_search(&timestamp) {
            Ok(idx) => {
                self.keys[idx] = key;
                Ok(idx)
            }
            Err(idx) => {
                self.timestamps.insert(idx, timestamp);
                self.keys.insert(idx, key);
                Ok(idx)
            }
        }
    }

    pub fn remove_key(&mut self, index: usize) -> Result<()> {
        if index >= self.keys.len() {
            return Err(AnimationError::KeyIndexOutOfRange {
                index,
                len: self.keys.len(),
            });
        }
        self.timestamps.remove(index);
        self.keys.remove(index);
        Ok(())
    }

    pub fn remove_all_keys(&mut self) {
        self.timestamps.clear();
        self.keys.clear();
    }

    #[inline]
    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn timestamps(&self) -> &[SplineTimeStamp] {
        &self.timestamps
    }

    #[inline]
    pub fn timestamp(&self, index: usize) -> Option<SplineTimeStamp> {
        self.timestamps.get(index).copied()
    }

    #[inline]
    pub fn key(&self, index: usize) -> Option<&SplineKey> {
        self.keys.get(index)
    }

    /// Index of the key stored at exactly `timestamp`.
    pub fn find_key(&self, timestamp: SplineTimeStamp) -> Option<usize> {
        self.timestamps.binary_search(&timestamp).ok()
    }

    /// Timestamp of the last key; the spline's natural duration.
    #[inline]
    pub fn last_timestamp(&self) -> SplineTimeStamp {
        self.timestamps.last().copied().unwrap_or(0)
    }
}
