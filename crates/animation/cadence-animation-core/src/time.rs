//! Time model: global animation timestamps and spline-local timestamps.
//!
//! The engine never reads a clock. Global time is whatever monotonic
//! timestamp the caller feeds to the scheduler.

use serde::{Deserialize, Serialize};

use crate::error::{AnimationError, Result};

/// Global timestamp fed through `set_time`.
pub type AnimationTime = u64;

/// Spline-local timestamp of a key.
pub type SplineTimeStamp = u32;

/// Looping animations started through the system run for
/// `loop_duration * LOOPING_LENGTH_MULTIPLIER` time units.
pub const LOOPING_LENGTH_MULTIPLIER: u64 = 1 << 20;

/// Start/stop placement of an animation on the global timeline.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    #[serde(default)]
    pub start: Option<AnimationTime>,
    #[serde(default)]
    pub stop: Option<AnimationTime>,
}

impl TimeRange {
    pub const fn new(start: AnimationTime, stop: AnimationTime) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
        }
    }

    pub const fn unset() -> Self {
        Self {
            start: None,
            stop: None,
        }
    }

    /// Both ends set and `start < stop`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bounds().is_some()
    }

    /// `(start, stop)` when the range is valid.
    #[inline]
    pub fn bounds(&self) -> Option<(AnimationTime, AnimationTime)> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) if start < stop => Some((start, stop)),
            _ => None,
        }
    }

    /// Like [`TimeRange::bounds`], for callers that require a playable range.
    pub fn validate(&self) -> Result<(AnimationTime, AnimationTime)> {
        self.bounds().ok_or(AnimationError::InvalidTimeRange {
            start: self.start,
            stop: self.stop,
        })
    }

    #[inline]
    pub fn contains(&self, t: AnimationTime) -> bool {
        self.bounds()
            .map(|(start, stop)| start <= t && t < stop)
            .unwrap_or(false)
    }
}
