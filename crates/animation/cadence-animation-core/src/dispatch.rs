//! Dispatchers: turn lifecycle events into property writes.
//!
//! Both variants keep a per-animation [`Playback`] record from `Started`
//! until `Finished`: the instance snapshot, a segment locator and the
//! property values captured at start (anchor for relative playback and
//! rollback). They differ only in when they write:
//!
//! | event              | Full                      | BoundaryOnly              |
//! |--------------------|---------------------------|---------------------------|
//! | `Started`          | cache, write start value  | cache, write start value  |
//! | `TimeChanged`      | write every unpaused one  | -                         |
//! | `Paused`           | -                         | write current value       |
//! | `Finished`         | write terminal value      | write terminal value      |
//!
//! Paused animations never receive a start or terminal write. While
//! `apply_initial_value` is set, every write restores the captured values
//! instead of sampling the spline.

use indexmap::IndexMap;

use crate::binding::BindingTarget;
use crate::config::ProcessingMode;
use crate::events::LifecycleEvent;
use crate::ids::{AnimationHandle, DataBindHandle, SplineHandle};
use crate::interp::InterpolationType;
use crate::sampling::{sample_spline, SegmentLocator};
use crate::store::{Animation, EntityStore};
use crate::time::{AnimationTime, SplineTimeStamp};
use crate::value::{Value, VectorComponent};

/// Spline time of `animation` at global time `at`, or `None` when its range
/// is unset or empty.
///
/// Non-looping animations stretch the spline over their range and scale the
/// result by `speed`: at speed 1 the start maps to 0 and the stop to
/// `spline_duration`, at speed 0.5 the stop maps to half of it. Local time
/// never passes `spline_duration`. Looping animations run at `speed` from
/// their start and wrap every `loop_duration` (the spline duration when 0).
pub fn local_spline_time(
    animation: &Animation,
    spline_duration: SplineTimeStamp,
    at: AnimationTime,
) -> Option<SplineTimeStamp> {
    animation
        .range
        .bounds()
        .map(|bounds| spline_time_in(bounds, animation, spline_duration, at))
}

fn spline_time_in(
    (start, stop): (AnimationTime, AnimationTime),
    animation: &Animation,
    spline_duration: SplineTimeStamp,
    at: AnimationTime,
) -> SplineTimeStamp {
    if animation.flags.looping {
        let period = if animation.loop_duration > 0 {
            animation.loop_duration
        } else {
            spline_duration
        };
        if period == 0 {
            return 0;
        }
        let elapsed = (at.saturating_sub(start) as f64 * animation.speed as f64) as u64;
        return (elapsed % u64::from(period)) as SplineTimeStamp;
    }
    if at <= start || stop <= start {
        return 0;
    }
    let progress = (at.min(stop) - start) as f64 / (stop - start) as f64;
    let local = (progress * f64::from(spline_duration) * f64::from(animation.speed)).round();
    local.min(f64::from(spline_duration)) as SplineTimeStamp
}

/// Per-animation state held between `Started` and `Finished`.
#[derive(Clone, Debug)]
struct Playback {
    spline: SplineHandle,
    interpolation: InterpolationType,
    component: VectorComponent,
    bindings: Vec<DataBindHandle>,
    bounds: (AnimationTime, AnimationTime),
    initial: Vec<(DataBindHandle, Value)>,
    locator: SegmentLocator,
}

impl Playback {
    fn capture(
        store: &EntityStore,
        animation: AnimationHandle,
        target: &dyn BindingTarget,
    ) -> Option<Self> {
        let Some(anim) = store.animation(animation) else {
            log::warn!("started {animation:?} does not resolve");
            return None;
        };
        let Some(inst) = store.instance(anim.instance) else {
            log::warn!("{animation:?}: instance {:?} does not resolve", anim.instance);
            return None;
        };
        let bounds = anim.range.bounds()?;
        let mut playback = Self {
            spline: inst.spline,
            interpolation: inst.interpolation,
            component: inst.component,
            bindings: inst.bindings.clone(),
            bounds,
            initial: Vec::new(),
            locator: SegmentLocator::new(),
        };
        playback.capture_initial(store, target);
        Some(playback)
    }

    /// Read the current value of every binding not captured yet.
    fn capture_initial(&mut self, store: &EntityStore, target: &dyn BindingTarget) {
        for handle in &self.bindings {
            if self.initial.iter().any(|(h, _)| h == handle) {
                continue;
            }
            let Some(binding) = store.data_binding(*handle) else {
                continue;
            };
            let value = target
                .read(&binding.address)
                .filter(|v| v.kind() == binding.value_kind)
                .unwrap_or_else(|| Value::zero(binding.value_kind));
            self.initial.push((*handle, value));
        }
    }

    fn refresh(&mut self, store: &EntityStore, animation: AnimationHandle, target: &dyn BindingTarget) {
        let Some(anim) = store.animation(animation) else {
            return;
        };
        if let Some(bounds) = anim.range.bounds() {
            self.bounds = bounds;
        }
        if let Some(inst) = store.instance(anim.instance) {
            self.spline = inst.spline;
            self.interpolation = inst.interpolation;
            self.component = inst.component;
            self.bindings = inst.bindings.clone();
        }
        // key indices may have shifted
        self.locator.reset();
        self.capture_initial(store, target);
    }

    fn sample(&mut self, store: &EntityStore, anim: &Animation, at: AnimationTime) -> Option<Value> {
        let Some(spline) = store.spline(self.spline) else {
            log::warn!("spline {:?} does not resolve", self.spline);
            return None;
        };
        let bounds = anim.range.bounds().unwrap_or(self.bounds);
        let time = spline_time_in(bounds, anim, spline.last_timestamp(), at);
        sample_spline(
            spline,
            &mut self.locator,
            time,
            anim.flags.reverse,
            self.interpolation,
        )
    }

    fn write(&self, store: &EntityStore, anim: &Animation, value: Value, target: &mut dyn BindingTarget) {
        let Some(masked) = value.masked(self.component) else {
            log::warn!("{:?} has no component {:?}", value.kind(), self.component);
            return;
        };
        for handle in &self.bindings {
            let Some(binding) = store.data_binding(*handle) else {
                log::warn!("data binding {handle:?} does not resolve");
                continue;
            };
            let out = if anim.flags.relative {
                self.initial
                    .iter()
                    .find(|(h, _)| h == handle)
                    .and_then(|(_, initial)| initial.add(&masked))
                    .unwrap_or(masked)
            } else {
                masked
            };
            target.write(&binding.address, &out);
        }
    }

    fn write_at(
        &mut self,
        store: &EntityStore,
        animation: AnimationHandle,
        at: AnimationTime,
        target: &mut dyn BindingTarget,
    ) {
        let Some(anim) = store.animation(animation) else {
            log::warn!("{animation:?} does not resolve");
            return;
        };
        let anim = *anim;
        if anim.flags.apply_initial_value {
            self.restore_initial(store, target);
            return;
        }
        if let Some(value) = self.sample(store, &anim, at) {
            log::trace!("{animation:?} @ {at} -> {value:?}");
            self.write(store, &anim, value, target);
        }
    }

    fn restore_initial(&self, store: &EntityStore, target: &mut dyn BindingTarget) {
        for (handle, value) in &self.initial {
            if let Some(binding) = store.data_binding(*handle) {
                target.write(&binding.address, value);
            }
        }
    }

    /// Terminal write on `Finished`.
    fn finish(
        &mut self,
        store: &EntityStore,
        animation: AnimationHandle,
        at: AnimationTime,
        target: &mut dyn BindingTarget,
    ) {
        let Some(anim) = store.animation(animation) else {
            return;
        };
        if anim.flags.apply_initial_value {
            self.restore_initial(store, target);
        } else if !anim.paused {
            self.write_at(store, animation, at, target);
        }
    }
}

fn is_paused(store: &EntityStore, animation: AnimationHandle) -> bool {
    store.animation(animation).is_some_and(|a| a.paused)
}

/// Re-evaluates every active animation on each `TimeChanged`.
#[derive(Debug, Default)]
pub struct FullDispatcher {
    cache: IndexMap<AnimationHandle, Playback>,
}

impl FullDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(
        &mut self,
        event: &LifecycleEvent,
        store: &EntityStore,
        target: &mut dyn BindingTarget,
    ) {
        match *event {
            LifecycleEvent::Started { animation, time } => {
                if let Some(mut playback) = Playback::capture(store, animation, &*target) {
                    if !is_paused(store, animation) {
                        playback.write_at(store, animation, time, target);
                    }
                    self.cache.insert(animation, playback);
                }
            }
            LifecycleEvent::PropertiesChanged { animation } => {
                if let Some(playback) = self.cache.get_mut(&animation) {
                    playback.refresh(store, animation, &*target);
                }
            }
            LifecycleEvent::TimeChanged { time } => {
                for (animation, playback) in self.cache.iter_mut() {
                    if !is_paused(store, *animation) {
                        playback.write_at(store, *animation, time, target);
                    }
                }
            }
            LifecycleEvent::Finished { animation, time } => {
                if let Some(mut playback) = self.cache.shift_remove(&animation) {
                    playback.finish(store, animation, time, target);
                }
            }
            LifecycleEvent::Paused { .. } | LifecycleEvent::Resumed { .. } => {}
        }
    }

    pub fn forget(&mut self, animation: AnimationHandle) {
        self.cache.shift_remove(&animation);
    }

    #[inline]
    pub fn is_cached(&self, animation: AnimationHandle) -> bool {
        self.cache.contains_key(&animation)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Writes only at start, pause and finish.
#[derive(Debug, Default)]
pub struct BoundaryDispatcher {
    started: IndexMap<AnimationHandle, Playback>,
}

impl BoundaryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(
        &mut self,
        event: &LifecycleEvent,
        store: &EntityStore,
        target: &mut dyn BindingTarget,
    ) {
        match *event {
            LifecycleEvent::Started { animation, time } => {
                let Some(mut playback) = Playback::capture(store, animation, &*target) else {
                    return;
                };
                if !is_paused(store, animation) {
                    playback.write_at(store, animation, time, target);
                }
                self.started.insert(animation, playback);
            }
            LifecycleEvent::Paused { animation, time } => {
                if let Some(playback) = self.started.get_mut(&animation) {
                    playback.write_at(store, animation, time, target);
                }
            }
            LifecycleEvent::PropertiesChanged { animation } => {
                if let Some(playback) = self.started.get_mut(&animation) {
                    playback.refresh(store, animation, &*target);
                }
            }
            LifecycleEvent::Finished { animation, time } => {
                if let Some(mut playback) = self.started.shift_remove(&animation) {
                    playback.finish(store, animation, time, target);
                }
            }
            LifecycleEvent::Resumed { .. } | LifecycleEvent::TimeChanged { .. } => {}
        }
    }

    pub fn forget(&mut self, animation: AnimationHandle) {
        self.started.shift_remove(&animation);
    }

    #[inline]
    pub fn is_cached(&self, animation: AnimationHandle) -> bool {
        self.started.contains_key(&animation)
    }
}

/// Dispatcher selected by [`ProcessingMode`].
#[derive(Debug)]
pub enum Dispatcher {
    Full(FullDispatcher),
    BoundaryOnly(BoundaryDispatcher),
}

impl Dispatcher {
    pub fn new(mode: ProcessingMode) -> Self {
        match mode {
            ProcessingMode::Full => Dispatcher::Full(FullDispatcher::new()),
            ProcessingMode::BoundaryOnly => Dispatcher::BoundaryOnly(BoundaryDispatcher::new()),
        }
    }

    pub fn mode(&self) -> ProcessingMode {
        match self {
            Dispatcher::Full(_) => ProcessingMode::Full,
            Dispatcher::BoundaryOnly(_) => ProcessingMode::BoundaryOnly,
        }
    }

    pub fn handle(
        &mut self,
        event: &LifecycleEvent,
        store: &EntityStore,
        target: &mut dyn BindingTarget,
    ) {
        match self {
            Dispatcher::Full(d) => d.handle(event, store, target),
            Dispatcher::BoundaryOnly(d) => d.handle(event, store, target),
        }
    }

    /// Drop cached state of an animation removed while tracked.
    pub fn forget(&mut self, animation: AnimationHandle) {
        match self {
            Dispatcher::Full(d) => d.forget(animation),
            Dispatcher::BoundaryOnly(d) => d.forget(animation),
        }
    }

    pub fn is_cached(&self, animation: AnimationHandle) -> bool {
        match self {
            Dispatcher::Full(d) => d.is_cached(animation),
            Dispatcher::BoundaryOnly(d) => d.is_cached(animation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::InstanceHandle;
    use crate::store::AnimationFlags;
    use crate::time::TimeRange;

    fn anim(start: u64, stop: u64) -> Animation {
        let mut a = Animation::new(InstanceHandle::new(0, 0));
        a.range = TimeRange::new(start, stop);
        a
    }

    #[test]
    fn stretches_spline_over_range() {
        let a = anim(1000, 2000);
        assert_eq!(local_spline_time(&a, 10, 1000), Some(0));
        assert_eq!(local_spline_time(&a, 10, 1500), Some(5));
        assert_eq!(local_spline_time(&a, 10, 1960), Some(10));
        assert_eq!(local_spline_time(&a, 10, 2000), Some(10));
        assert_eq!(local_spline_time(&a, 10, 500), Some(0));
        assert_eq!(local_spline_time(&a, 10, 9000), Some(10));
    }

    #[test]
    fn speed_scales_stretched_time() {
        let mut a = anim(0, 100);
        a.speed = 0.5;
        assert_eq!(local_spline_time(&a, 100, 50), Some(25));
        assert_eq!(local_spline_time(&a, 100, 100), Some(50));
        assert_eq!(local_spline_time(&a, 100, 400), Some(50));
        a.speed = 2.0;
        assert_eq!(local_spline_time(&a, 100, 25), Some(50));
        assert_eq!(local_spline_time(&a, 100, 60), Some(100));
        assert_eq!(local_spline_time(&a, 100, 100), Some(100));
    }

    #[test]
    fn invalid_range_has_no_local_time() {
        let mut a = anim(0, 10);
        a.range = TimeRange::unset();
        assert_eq!(local_spline_time(&a, 10, 5), None);
    }

    #[test]
    fn looping_wraps_with_speed() {
        let mut a = anim(100, 100 + 1_000_000);
        a.flags = AnimationFlags {
            looping: true,
            ..Default::default()
        };
        assert_eq!(local_spline_time(&a, 40, 130), Some(30));
        assert_eq!(local_spline_time(&a, 40, 145), Some(5));
        a.speed = 2.0;
        assert_eq!(local_spline_time(&a, 40, 130), Some(20));
        a.loop_duration = 25;
        assert_eq!(local_spline_time(&a, 40, 130), Some(10));
    }

    #[test]
    fn looping_empty_spline_stays_at_zero() {
        let mut a = anim(0, 10);
        a.flags.looping = true;
        assert_eq!(local_spline_time(&a, 0, 7), Some(0));
    }

    #[test]
    fn dispatcher_mode_roundtrip() {
        assert_eq!(Dispatcher::new(ProcessingMode::Full).mode(), ProcessingMode::Full);
        assert_eq!(
            Dispatcher::new(ProcessingMode::BoundaryOnly).mode(),
            ProcessingMode::BoundaryOnly
        );
    }
}
