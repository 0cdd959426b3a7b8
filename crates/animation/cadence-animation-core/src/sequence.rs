//! Animation sequences: a group of animations placed on a shared,
//! sequence-relative timeline and started, stopped or re-timed together.
//!
//! A sequence holds no reference to the system; every operation that touches
//! animations takes the system explicitly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::binding::BindingTarget;
use crate::error::{AnimationError, EntityKind, Result};
use crate::ids::AnimationHandle;
use crate::store::{AnimationFlags, AnimationProperties};
use crate::system::AnimationSystem;
use crate::time::{AnimationTime, SplineTimeStamp, TimeRange, LOOPING_LENGTH_MULTIPLIER};

/// Placement of one animation inside a sequence, in sequence time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    pub start: AnimationTime,
    pub stop: AnimationTime,
    #[serde(default)]
    pub flags: AnimationFlags,
    #[serde(default)]
    pub loop_duration: SplineTimeStamp,
}

#[derive(Clone, Debug)]
pub struct AnimationSequence {
    items: IndexMap<AnimationHandle, SequenceItem>,
    playback_speed: f32,
    start_time: Option<AnimationTime>,
}

impl Default for AnimationSequence {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
            playback_speed: 1.0,
            start_time: None,
        }
    }
}

impl AnimationSequence {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn playback_speed(&self) -> f32 {
        self.playback_speed
    }

    /// Global time the sequence was last started at.
    #[inline]
    pub fn start_time(&self) -> Option<AnimationTime> {
        self.start_time
    }

    #[inline]
    pub fn num_animations(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn contains(&self, animation: AnimationHandle) -> bool {
        self.items.contains_key(&animation)
    }

    #[inline]
    pub fn item(&self, animation: AnimationHandle) -> Option<&SequenceItem> {
        self.items.get(&animation)
    }

    /// Latest stop time of any item, in sequence time.
    pub fn sequence_stop_time(&self) -> AnimationTime {
        self.items.values().map(|i| i.stop).max().unwrap_or(0)
    }

    /// Add (or re-place) an animation. Without an explicit `stop`, the item
    /// runs for the spline duration; looping animations run
    /// [`LOOPING_LENGTH_MULTIPLIER`] times longer.
    pub fn add_animation<T: BindingTarget>(
        &mut self,
        system: &AnimationSystem<T>,
        animation: AnimationHandle,
        start: AnimationTime,
        stop: Option<AnimationTime>,
    ) -> Result<()> {
        let anim = system
            .animation(animation)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Animation, animation))?;
        let stop = match stop {
            Some(stop) => stop,
            None => {
                let duration = system.animation_duration_from_spline(animation)?;
                let mut length = u64::from(duration);
                if anim.flags.looping {
                    length = length.saturating_mul(LOOPING_LENGTH_MULTIPLIER);
                }
                start.saturating_add(length)
            }
        };
        TimeRange::new(start, stop).validate()?;
        self.items.insert(
            animation,
            SequenceItem {
                start,
                stop,
                flags: anim.flags,
                loop_duration: anim.loop_duration,
            },
        );
        Ok(())
    }

    pub fn remove_animation(&mut self, animation: AnimationHandle) -> bool {
        self.items.shift_remove(&animation).is_some()
    }

    /// True once started while any member animation covers the current time.
    pub fn is_active<T: BindingTarget>(&self, system: &AnimationSystem<T>) -> bool {
        if self.start_time.is_none() {
            return false;
        }
        let now = system.time();
        self.items.keys().any(|h| {
            system
                .animation(*h)
                .is_some_and(|a| a.range.contains(now))
        })
    }

    pub fn start_at<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        at: AnimationTime,
    ) -> Result<()> {
        self.start_with(system, at, false)
    }

    pub fn start_reverse_at<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        at: AnimationTime,
    ) -> Result<()> {
        self.start_with(system, at, true)
    }

    /// Start `offset` after the current time.
    pub fn start<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        offset: AnimationTime,
    ) -> Result<()> {
        let at = system.time().saturating_add(offset);
        self.start_with(system, at, false)
    }

    fn start_with<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        at: AnimationTime,
        reverse: bool,
    ) -> Result<()> {
        self.start_time = Some(at);
        for item in self.items.values_mut() {
            item.flags.reverse = reverse;
        }
        self.flush(system, true)
    }

    /// Stop every member at `at`. Ignored unless the sequence is active.
    pub fn stop_at<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        at: AnimationTime,
    ) -> Result<()> {
        if !self.is_active(system) {
            return Ok(());
        }
        for animation in self.items.keys() {
            system.set_animation_stop_time(*animation, at)?;
        }
        Ok(())
    }

    /// Set the speed every member plays at. Item placements stay as they
    /// are; a running sequence shifts its start so members keep their
    /// current spline position.
    pub fn set_playback_speed<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        speed: f32,
    ) -> Result<()> {
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(AnimationError::InvalidPlaybackSpeed { speed });
        }
        if speed == self.playback_speed {
            return Ok(());
        }
        let scale = f64::from(self.playback_speed) / f64::from(speed);
        self.playback_speed = speed;
        if !self.is_active(system) {
            return Ok(());
        }
        let now = system.time();
        if let Some(start) = self.start_time.filter(|s| *s <= now) {
            let since = ((now - start) as f64 * scale) as AnimationTime;
            self.start_time = Some(now.saturating_sub(since));
        }
        self.flush(system, true)
    }

    pub fn set_animation_looping<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        animation: AnimationHandle,
        loop_duration: SplineTimeStamp,
    ) -> Result<()> {
        let item = self.item_mut(animation)?;
        item.flags.looping = true;
        item.loop_duration = loop_duration;
        self.flush(system, false)
    }

    pub fn set_animation_relative<T: BindingTarget>(
        &mut self,
        system: &mut AnimationSystem<T>,
        animation: AnimationHandle,
        relative: bool,
    ) -> Result<()> {
        self.item_mut(animation)?.flags.relative = relative;
        self.flush(system, false)
    }

    fn item_mut(&mut self, animation: AnimationHandle) -> Result<&mut SequenceItem> {
        self.items
            .get_mut(&animation)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Animation, animation))
    }

    /// Push item placements and properties into the system.
    fn flush<T: BindingTarget>(&self, system: &mut AnimationSystem<T>, force: bool) -> Result<()> {
        let Some(start_time) = self.start_time else {
            return Ok(());
        };
        if !force && !self.is_active(system) {
            return Ok(());
        }
        for (animation, item) in &self.items {
            system.set_animation_properties(
                *animation,
                AnimationProperties {
                    speed: self.playback_speed,
                    loop_duration: item.loop_duration,
                    flags: item.flags,
                },
            )?;
            system.set_animation_time_range(
                *animation,
                TimeRange::new(
                    start_time.saturating_add(item.start),
                    start_time.saturating_add(item.stop),
                ),
            )?;
        }
        Ok(())
    }
}
