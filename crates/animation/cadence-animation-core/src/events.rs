//! Change and lifecycle events.
//!
//! Two families, mirroring the two listener interfaces:
//! - [`DataEvent`]: fired by the store for every observable mutation.
//! - [`LifecycleEvent`]: fired by the scheduler as animations move between
//!   pending, active and finished, plus one `TimeChanged` per advanced tick.

use serde::Serialize;

use crate::ids::{AnimationHandle, InstanceHandle, SplineHandle};
use crate::time::AnimationTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DataEvent {
    SplineChanged(SplineHandle),
    AnimationTimeRangeChanged(AnimationHandle),
    AnimationPauseChanged(AnimationHandle, bool),
    AnimationPropertiesChanged(AnimationHandle),
    AnimationInstanceChanged(InstanceHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LifecycleEvent {
    Started {
        animation: AnimationHandle,
        time: AnimationTime,
    },
    /// `time` is the animation's stop time when finished by the time cursor,
    /// or the current time when finished by a range change
    Finished {
        animation: AnimationHandle,
        time: AnimationTime,
    },
    Paused {
        animation: AnimationHandle,
        time: AnimationTime,
    },
    Resumed {
        animation: AnimationHandle,
        time: AnimationTime,
    },
    PropertiesChanged {
        animation: AnimationHandle,
    },
    TimeChanged {
        time: AnimationTime,
    },
}

impl LifecycleEvent {
    /// Animation the event refers to; `None` for `TimeChanged`.
    pub fn animation(&self) -> Option<AnimationHandle> {
        match self {
            LifecycleEvent::Started { animation, .. }
            | LifecycleEvent::Finished { animation, .. }
            | LifecycleEvent::Paused { animation, .. }
            | LifecycleEvent::Resumed { animation, .. }
            | LifecycleEvent::PropertiesChanged { animation } => Some(*animation),
            LifecycleEvent::TimeChanged { .. } => None,
        }
    }
}
