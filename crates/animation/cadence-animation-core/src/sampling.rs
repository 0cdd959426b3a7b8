//! Spline sampling: segment location with temporal-locality caching.
//!
//! Model:
//! - A segment is the pair of adjacent keys [i, i+1] whose timestamps bracket
//!   the query, plus the fraction of the way from key i to key i+1.
//! - The locator caches the last segment. Forward playback usually stays in
//!   the cached segment or finds the next one a few keys ahead; rewinds fall
//!   back to a search over the keys before the cached segment.
//! - Queries before the first key clamp to a zero-length segment at the first
//!   key; queries at or after the last key clamp to the last key.
//! - Reverse playback mirrors the query as `last_key_time - t` (saturating).

use crate::interp::{bezier_value, linear_value, step_value, InterpolationType};
use crate::spline::Spline;
use crate::time::SplineTimeStamp;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    /// Local fraction in [0, 1) between the two keys; 0 for clamped segments
    pub fraction: f32,
    /// Spline time the segment was resolved for (after mirroring)
    pub time: SplineTimeStamp,
}

impl Segment {
    #[inline]
    pub fn is_zero_length(&self) -> bool {
        self.start == self.end
    }

    fn clamped(index: usize, time: SplineTimeStamp) -> Self {
        Self {
            start: index,
            end: index,
            fraction: 0.0,
            time,
        }
    }

    fn between(timestamps: &[SplineTimeStamp], start: usize, time: SplineTimeStamp) -> Self {
        let t0 = timestamps[start];
        let t1 = timestamps[start + 1];
        let fraction = (time - t0) as f32 / (t1 - t0) as f32;
        Self {
            start,
            end: start + 1,
            fraction,
            time,
        }
    }
}

/// Stateful cursor over one spline's timestamps.
///
/// The cache stores key indices, which shift when keys are inserted or
/// removed; call [`SegmentLocator::reset`] after mutating the spline.
#[derive(Clone, Debug, Default)]
pub struct SegmentLocator {
    cached: Option<(usize, usize)>,
}

impl SegmentLocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cached = None;
    }

    /// Cached `(start, end)` key indices of the last lookup.
    #[inline]
    pub fn cached_segment(&self) -> Option<(usize, usize)> {
        self.cached
    }

    /// Resolve `time` to a segment. Returns `None` for a spline without keys.
    pub fn locate(
        &mut self,
        timestamps: &[SplineTimeStamp],
        time: SplineTimeStamp,
        reverse: bool,
    ) -> Option<Segment> {
        let n = timestamps.len();
        let last = *timestamps.last()?;
        let time = if reverse {
            last.saturating_sub(time)
        } else {
            time
        };

        let (cached_start, cached_end) = match self.cached {
            Some((s, e)) if e < n => (s, e),
            _ => (0, 0),
        };

        // 1) still inside the cached segment
        if cached_end > cached_start
            && timestamps[cached_start] <= time
            && time < timestamps[cached_end]
        {
            return Some(Segment::between(timestamps, cached_start, time));
        }

        // 2) forward from the cached end
        let mut found = None;
        for i in cached_end..n.saturating_sub(1) {
            if timestamps[i] > time {
                break;
            }
            if time < timestamps[i + 1] {
                found = Some(i);
                break;
            }
        }

        // 3) rewind: keys in [0, cached_start]
        if found.is_none() && n > 1 {
            let upper = cached_start.min(n - 2);
            let idx = timestamps[..=upper].partition_point(|ts| *ts <= time);
            if idx > 0 && time < timestamps[idx] {
                found = Some(idx - 1);
            }
        }

        let segment = match found {
            Some(start) => Segment::between(timestamps, start, time),
            // 4) clamp
            None if time < timestamps[0] => Segment::clamped(0, time),
            None if time >= last => Segment::clamped(n - 1, time),
            // unreachable for sorted input; treat as the last key
            None => Segment::clamped(n - 1, time),
        };
        self.cached = Some((segment.start, segment.end));
        Some(segment)
    }
}

/// Evaluate `spline` at local time `time`.
///
/// Exactly at a key (and for clamped queries) the stored key value is
/// returned unchanged for every interpolation kind.
pub fn sample_spline(
    spline: &Spline,
    locator: &mut SegmentLocator,
    time: SplineTimeStamp,
    reverse: bool,
    interpolation: InterpolationType,
) -> Option<Value> {
    let segment = locator.locate(spline.timestamps(), time, reverse)?;
    let left = spline.key(segment.start)?;
    if segment.is_zero_length() || segment.fraction <= 0.0 {
        return Some(left.value);
    }
    let right = spline.key(segment.end)?;
    let value = match interpolation {
        InterpolationType::Step => step_value(&left.value, &right.value, segment.fraction),
        InterpolationType::Linear => linear_value(&left.value, &right.value, segment.fraction),
        InterpolationType::Bezier => {
            let t0 = spline.timestamp(segment.start)? as f32;
            let t1 = spline.timestamp(segment.end)? as f32;
            bezier_value(left, t0, right, t1, segment.time as f32)
        }
    };
    Some(value)
}
