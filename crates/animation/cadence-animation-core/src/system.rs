//! `AnimationSystem`: the facade hosts drive.
//!
//! Owns the entity store, the scheduler, the dispatcher picked by the
//! [`Config`], the host's [`BindingTarget`] and both listener families.
//! Every public mutation routes its events synchronously before returning:
//! store event -> data listeners -> scheduler -> (dispatcher, lifecycle
//! listeners) for each lifecycle event produced.

use crate::binding::{BindingTarget, DataBinding};
use crate::config::{Config, ProcessingMode};
use crate::dispatch::Dispatcher;
use crate::error::{AnimationError, EntityKind, Result};
use crate::events::{DataEvent, LifecycleEvent};
use crate::ids::{AnimationHandle, DataBindHandle, InstanceHandle, SplineHandle};
use crate::interp::InterpolationType;
use crate::notifier::{ChangeNotifier, SubscriptionId};
use crate::scheduler::Scheduler;
use crate::spline::{KeyShape, Spline, SplineKey};
use crate::store::{Animation, AnimationInstance, AnimationProperties, EntityStore};
use crate::time::{AnimationTime, SplineTimeStamp, TimeRange, LOOPING_LENGTH_MULTIPLIER};
use crate::value::{ValueKind, VectorComponent};

pub struct AnimationSystem<T: BindingTarget> {
    config: Config,
    store: EntityStore,
    scheduler: Scheduler,
    dispatcher: Dispatcher,
    target: T,
    data_listeners: ChangeNotifier<DataEvent>,
    lifecycle_listeners: ChangeNotifier<LifecycleEvent>,
}

impl<T: BindingTarget + Default> Default for AnimationSystem<T> {
    fn default() -> Self {
        Self::new(Config::default(), T::default())
    }
}

impl<T: BindingTarget> AnimationSystem<T> {
    pub fn new(config: Config, target: T) -> Self {
        log::debug!("animation system: {:?} processing", config.processing);
        Self {
            store: EntityStore::with_capacity(&config.capacity),
            scheduler: Scheduler::with_capacity(config.capacity.animations),
            dispatcher: Dispatcher::new(config.processing),
            target,
            data_listeners: ChangeNotifier::new(),
            lifecycle_listeners: ChangeNotifier::new(),
            config,
        }
    }

    pub fn with_target(target: T) -> Self {
        Self::new(Config::default(), target)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn processing_mode(&self) -> ProcessingMode {
        self.dispatcher.mode()
    }

    #[inline]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn target(&self) -> &T {
        &self.target
    }

    #[inline]
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    // ----- listeners -----

    pub fn subscribe_data<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&DataEvent) + 'static,
    {
        self.data_listeners.subscribe(listener)
    }

    pub fn unsubscribe_data(&mut self, id: SubscriptionId) -> bool {
        self.data_listeners.unsubscribe(id)
    }

    pub fn subscribe_lifecycle<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        self.lifecycle_listeners.subscribe(listener)
    }

    pub fn unsubscribe_lifecycle(&mut self, id: SubscriptionId) -> bool {
        self.lifecycle_listeners.unsubscribe(id)
    }

    // ----- event routing -----

    fn route(&mut self) {
        for event in self.store.drain_events() {
            self.data_listeners.notify(&event);
            self.scheduler.handle_data_event(&event, &self.store);
            self.route_lifecycle();
        }
    }

    fn route_lifecycle(&mut self) {
        for event in self.scheduler.drain_events() {
            self.dispatcher
                .handle(&event, &self.store, &mut self.target);
            self.lifecycle_listeners.notify(&event);
        }
    }

    /// Run `op` against the store, then route whatever it produced. Events
    /// pushed before a failure are still delivered.
    fn mutate<R>(&mut self, op: impl FnOnce(&mut EntityStore) -> Result<R>) -> Result<R> {
        let result = op(&mut self.store);
        self.route();
        result
    }

    // ----- time -----

    /// Advance the global time cursor. Non-increasing times are ignored.
    pub fn set_time(&mut self, time: AnimationTime) {
        self.scheduler.advance_time(time);
        self.route_lifecycle();
    }

    #[inline]
    pub fn time(&self) -> AnimationTime {
        self.scheduler.time()
    }

    #[inline]
    pub fn has_active_animations(&self) -> bool {
        self.scheduler.num_active() > 0
    }

    #[inline]
    pub fn is_animation_active(&self, animation: AnimationHandle) -> bool {
        self.scheduler.is_active(animation)
    }

    #[inline]
    pub fn num_active_animations(&self) -> usize {
        self.scheduler.num_active()
    }

    // ----- splines -----

    pub fn allocate_spline(&mut self, key_shape: KeyShape, value_kind: ValueKind) -> SplineHandle {
        self.store.allocate_spline(key_shape, value_kind)
    }

    #[inline]
    pub fn spline(&self, handle: SplineHandle) -> Option<&Spline> {
        self.store.spline(handle)
    }

    pub fn remove_spline(&mut self, handle: SplineHandle) -> Result<()> {
        self.mutate(|store| store.remove_spline(handle).map(drop))
    }

    pub fn set_spline_key(
        &mut self,
        handle: SplineHandle,
        timestamp: SplineTimeStamp,
        key: SplineKey,
    ) -> Result<usize> {
        self.mutate(|store| store.set_spline_key(handle, timestamp, key))
    }

    pub fn remove_spline_key(&mut self, handle: SplineHandle, index: usize) -> Result<()> {
        self.mutate(|store| store.remove_spline_key(handle, index))
    }

    pub fn remove_spline_keys(&mut self, handle: SplineHandle) -> Result<()> {
        self.mutate(|store| store.remove_spline_keys(handle))
    }

    // ----- data bindings -----

    pub fn allocate_data_binding(&mut self, binding: DataBinding) -> DataBindHandle {
        self.store.allocate_data_binding(binding)
    }

    #[inline]
    pub fn data_binding(&self, handle: DataBindHandle) -> Option<&DataBinding> {
        self.store.data_binding(handle)
    }

    pub fn remove_data_binding(&mut self, handle: DataBindHandle) -> Result<()> {
        self.mutate(|store| store.remove_data_binding(handle).map(drop))
    }

    // ----- instances -----

    pub fn allocate_instance(
        &mut self,
        spline: SplineHandle,
        interpolation: InterpolationType,
        component: VectorComponent,
    ) -> Result<InstanceHandle> {
        self.mutate(|store| store.allocate_instance(spline, interpolation, component))
    }

    #[inline]
    pub fn instance(&self, handle: InstanceHandle) -> Option<&AnimationInstance> {
        self.store.instance(handle)
    }

    pub fn remove_instance(&mut self, handle: InstanceHandle) -> Result<()> {
        self.mutate(|store| store.remove_instance(handle).map(drop))
    }

    pub fn add_data_binding_to_instance(
        &mut self,
        instance: InstanceHandle,
        binding: DataBindHandle,
    ) -> Result<()> {
        self.mutate(|store| store.add_data_binding_to_instance(instance, binding))
    }

    // ----- animations -----

    pub fn allocate_animation(&mut self, instance: InstanceHandle) -> Result<AnimationHandle> {
        self.mutate(|store| store.allocate_animation(instance))
    }

    #[inline]
    pub fn animation(&self, handle: AnimationHandle) -> Option<&Animation> {
        self.store.animation(handle)
    }

    fn animation_copy(&self, handle: AnimationHandle) -> Result<Animation> {
        self.store
            .animation(handle)
            .copied()
            .ok_or_else(|| AnimationError::not_found(EntityKind::Animation, handle))
    }

    /// Untrack (silently) and deallocate.
    pub fn remove_animation(&mut self, handle: AnimationHandle) -> Result<()> {
        if !self.store.contains_animation(handle) {
            return Err(AnimationError::not_found(EntityKind::Animation, handle));
        }
        if self.scheduler.dequeue(handle).is_some() {
            self.dispatcher.forget(handle);
        }
        self.mutate(|store| store.remove_animation(handle).map(drop))
    }

    pub fn set_animation_time_range(
        &mut self,
        handle: AnimationHandle,
        range: TimeRange,
    ) -> Result<()> {
        self.mutate(|store| store.set_animation_time_range(handle, range))
    }

    pub fn set_animation_paused(&mut self, handle: AnimationHandle, paused: bool) -> Result<()> {
        self.mutate(|store| store.set_animation_paused(handle, paused))
    }

    /// Replace speed, loop period and flags.
    ///
    /// Turning looping on, or changing the loop period of a looping
    /// animation, resolves a zero period to the spline duration and, when a
    /// range is set, extends it to the period times
    /// [`LOOPING_LENGTH_MULTIPLIER`] from its start.
    pub fn set_animation_properties(
        &mut self,
        handle: AnimationHandle,
        mut properties: AnimationProperties,
    ) -> Result<()> {
        let anim = self.animation_copy(handle)?;
        let loop_changed = properties.flags.looping
            && (!anim.flags.looping || properties.loop_duration != anim.loop_duration);
        if !loop_changed {
            return self.mutate(|store| store.set_animation_properties(handle, properties));
        }
        if properties.loop_duration == 0 {
            properties.loop_duration = self.animation_duration_from_spline(handle)?;
        }
        self.mutate(|store| store.set_animation_properties(handle, properties))?;
        let period = properties.loop_duration;
        let (Some(start), Some(_)) = (anim.range.start, anim.range.stop) else {
            return Ok(());
        };
        if period == 0 {
            return Ok(());
        }
        let length = u64::from(period).saturating_mul(LOOPING_LENGTH_MULTIPLIER);
        let stop = start.saturating_add(length);
        log::debug!("{handle:?} loops every {period}, range extended to [{start}, {stop})");
        self.set_animation_time_range(handle, TimeRange::new(start, stop))
    }

    /// Timestamp of the last key of the animation's spline.
    pub fn animation_duration_from_spline(&self, handle: AnimationHandle) -> Result<SplineTimeStamp> {
        let anim = self.animation_copy(handle)?;
        let inst = self
            .store
            .instance(anim.instance)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Instance, anim.instance))?;
        let spline = self
            .store
            .spline(inst.spline)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Spline, inst.spline))?;
        Ok(spline.last_timestamp())
    }

    /// Start at `start`; the stop time follows from the spline duration, or
    /// from the loop period times [`LOOPING_LENGTH_MULTIPLIER`] for looping
    /// animations. Speed scales time inside that window.
    pub fn set_animation_start_time(
        &mut self,
        handle: AnimationHandle,
        start: AnimationTime,
    ) -> Result<()> {
        let anim = self.animation_copy(handle)?;
        let duration = self.animation_duration_from_spline(handle)?;
        let length = if anim.flags.looping {
            let period = if anim.loop_duration > 0 {
                anim.loop_duration
            } else {
                duration
            };
            u64::from(period).saturating_mul(LOOPING_LENGTH_MULTIPLIER)
        } else {
            u64::from(duration)
        };
        self.set_animation_time_range(handle, TimeRange::new(start, start.saturating_add(length)))
    }

    /// Move the stop time, keeping the current start.
    pub fn set_animation_stop_time(&mut self, handle: AnimationHandle, stop: AnimationTime) -> Result<()> {
        let anim = self.animation_copy(handle)?;
        self.set_animation_time_range(
            handle,
            TimeRange {
                start: anim.range.start,
                stop: Some(stop),
            },
        )
    }

    /// Finish an active animation now and restore the property values it
    /// found when it started. No-op for animations that are not active.
    pub fn stop_animation_and_rollback(&mut self, handle: AnimationHandle) -> Result<()> {
        let anim = self.animation_copy(handle)?;
        if !self.scheduler.is_active(handle) {
            return Ok(());
        }
        let properties = anim.properties();
        let mut rollback = properties;
        rollback.flags.apply_initial_value = true;
        self.set_animation_properties(handle, rollback)?;
        self.set_animation_stop_time(handle, self.time())?;
        self.set_animation_properties(handle, properties)
    }
}
