//! Handle-indexed entity store.
//!
//! Owns every spline, data binding, animation instance and animation. Each
//! observable mutation pushes a [`DataEvent`] into the store outbox; the
//! owning [`AnimationSystem`](crate::system::AnimationSystem) drains and
//! routes it before the mutating call returns.
//!
//! Lookups (`spline`, `instance`, ...) return `Option` and stay quiet.
//! Mutations and removals of unknown handles return
//! [`AnimationError::EntityNotFound`] and log at error level.

use serde::{Deserialize, Serialize};

use crate::binding::DataBinding;
use crate::config::CapacityHints;
use crate::error::{AnimationError, EntityKind, Result};
use crate::events::DataEvent;
use crate::ids::{AnimationHandle, DataBindHandle, InstanceHandle, Pool, SplineHandle};
use crate::interp::InterpolationType;
use crate::spline::{KeyShape, Spline, SplineKey};
use crate::time::{AnimationTime, SplineTimeStamp, TimeRange};
use crate::value::{is_binding_compatible, ValueKind, VectorComponent};

/// Pairing of a spline with an interpolation kind and its output bindings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationInstance {
    pub spline: SplineHandle,
    pub interpolation: InterpolationType,
    #[serde(default)]
    pub component: VectorComponent,
    #[serde(default)]
    pub bindings: Vec<DataBindHandle>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFlags {
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub reverse: bool,
    /// Written value is the spline value added to the initial property value
    #[serde(default)]
    pub relative: bool,
    /// On finish, restore the property values captured at start
    #[serde(default)]
    pub apply_initial_value: bool,
}

/// Playback parameters that do not move the animation on the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationProperties {
    pub speed: f32,
    /// Period of a looping animation in spline time; 0 uses the spline duration
    pub loop_duration: SplineTimeStamp,
    pub flags: AnimationFlags,
}

impl Default for AnimationProperties {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_duration: 0,
            flags: AnimationFlags::default(),
        }
    }
}

/// Timeline placement of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub instance: InstanceHandle,
    pub range: TimeRange,
    pub speed: f32,
    pub loop_duration: SplineTimeStamp,
    pub flags: AnimationFlags,
    pub paused: bool,
}

impl Animation {
    pub fn new(instance: InstanceHandle) -> Self {
        let props = AnimationProperties::default();
        Self {
            instance,
            range: TimeRange::unset(),
            speed: props.speed,
            loop_duration: props.loop_duration,
            flags: props.flags,
            paused: false,
        }
    }

    pub fn properties(&self) -> AnimationProperties {
        AnimationProperties {
            speed: self.speed,
            loop_duration: self.loop_duration,
            flags: self.flags,
        }
    }

    #[inline]
    pub fn start(&self) -> Option<AnimationTime> {
        self.range.start
    }

    #[inline]
    pub fn stop(&self) -> Option<AnimationTime> {
        self.range.stop
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    splines: Pool<Spline>,
    bindings: Pool<DataBinding>,
    instances: Pool<AnimationInstance>,
    animations: Pool<Animation>,
    events: Vec<DataEvent>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(hints: &CapacityHints) -> Self {
        Self {
            splines: Pool::with_capacity(hints.splines),
            bindings: Pool::with_capacity(hints.data_bindings),
            instances: Pool::with_capacity(hints.instances),
            animations: Pool::with_capacity(hints.animations),
            events: Vec::new(),
        }
    }

    /// Take the events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<DataEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    fn push_event(&mut self, event: DataEvent) {
        self.events.push(event);
    }

    // ----- splines -----

    pub fn allocate_spline(&mut self, key_shape: KeyShape, value_kind: ValueKind) -> SplineHandle {
        self.splines.allocate(Spline::new(key_shape, value_kind))
    }

    #[inline]
    pub fn spline(&self, handle: SplineHandle) -> Option<&Spline> {
        self.splines.get(handle)
    }

    #[inline]
    pub fn contains_spline(&self, handle: SplineHandle) -> bool {
        self.splines.contains(handle)
    }

    pub fn remove_spline(&mut self, handle: SplineHandle) -> Result<Spline> {
        self.splines
            .remove(handle)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Spline, handle))
    }

    #[inline]
    pub fn num_splines(&self) -> usize {
        self.splines.len()
    }

    fn spline_mut(&mut self, handle: SplineHandle) -> Result<&mut Spline> {
        self.splines
            .get_mut(handle)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Spline, handle))
    }

    /// Insert or replace a key; returns the key's current index.
    pub fn set_spline_key(
        &mut self,
        handle: SplineHandle,
        timestamp: SplineTimeStamp,
        key: SplineKey,
    ) -> Result<usize> {
        let index = self.spline_mut(handle)?.set_key(timestamp, key)?;
        self.push_event(DataEvent::SplineChanged(handle));
        Ok(index)
    }

    pub fn remove_spline_key(&mut self, handle: SplineHandle, index: usize) -> Result<()> {
        self.spline_mut(handle)?.remove_key(index)?;
        self.push_event(DataEvent::SplineChanged(handle));
        Ok(())
    }

    pub fn remove_spline_keys(&mut self, handle: SplineHandle) -> Result<()> {
        self.spline_mut(handle)?.remove_all_keys();
        self.push_event(DataEvent::SplineChanged(handle));
        Ok(())
    }

    // ----- data bindings -----

    pub fn allocate_data_binding(&mut self, binding: DataBinding) -> DataBindHandle {
        self.bindings.allocate(binding)
    }

    #[inline]
    pub fn data_binding(&self, handle: DataBindHandle) -> Option<&DataBinding> {
        self.bindings.get(handle)
    }

    #[inline]
    pub fn contains_data_binding(&self, handle: DataBindHandle) -> bool {
        self.bindings.contains(handle)
    }

    pub fn remove_data_binding(&mut self, handle: DataBindHandle) -> Result<DataBinding> {
        self.bindings
            .remove(handle)
            .ok_or_else(|| AnimationError::not_found(EntityKind::DataBinding, handle))
    }

    #[inline]
    pub fn num_data_bindings(&self) -> usize {
        self.bindings.len()
    }

    // ----- instances -----

    pub fn allocate_instance(
        &mut self,
        spline: SplineHandle,
        interpolation: InterpolationType,
        component: VectorComponent,
    ) -> Result<InstanceHandle> {
        let spline_ref = self
            .splines
            .get(spline)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Spline, spline))?;
        if interpolation == InterpolationType::Bezier && spline_ref.key_shape() != KeyShape::Tangents {
            log::error!("bezier instance on basic-key spline {spline:?}");
            return Err(AnimationError::BezierRequiresTangents);
        }
        let handle = self.instances.allocate(AnimationInstance {
            spline,
            interpolation,
            component,
            bindings: Vec::new(),
        });
        self.push_event(DataEvent::AnimationInstanceChanged(handle));
        Ok(handle)
    }

    #[inline]
    pub fn instance(&self, handle: InstanceHandle) -> Option<&AnimationInstance> {
        self.instances.get(handle)
    }

    #[inline]
    pub fn contains_instance(&self, handle: InstanceHandle) -> bool {
        self.instances.contains(handle)
    }

    pub fn remove_instance(&mut self, handle: InstanceHandle) -> Result<AnimationInstance> {
        let removed = self
            .instances
            .remove(handle)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Instance, handle))?;
        self.push_event(DataEvent::AnimationInstanceChanged(handle));
        Ok(removed)
    }

    #[inline]
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Attach a binding; its value kind must accept what the instance emits.
    pub fn add_data_binding_to_instance(
        &mut self,
        instance: InstanceHandle,
        binding: DataBindHandle,
    ) -> Result<()> {
        let binding_kind = self
            .bindings
            .get(binding)
            .map(|b| b.value_kind)
            .ok_or_else(|| AnimationError::not_found(EntityKind::DataBinding, binding))?;
        let (spline, component) = self
            .instances
            .get(instance)
            .map(|i| (i.spline, i.component))
            .ok_or_else(|| AnimationError::not_found(EntityKind::Instance, instance))?;
        let spline_kind = self
            .splines
            .get(spline)
            .map(|s| s.value_kind())
            .ok_or_else(|| AnimationError::not_found(EntityKind::Spline, spline))?;

        if !is_binding_compatible(spline_kind, component, binding_kind) {
            let err = AnimationError::IncompatibleBindingType {
                spline: spline_kind,
                component,
                binding: binding_kind,
            };
            log::error!("{err}");
            return Err(err);
        }

        if let Some(inst) = self.instances.get_mut(instance) {
            inst.bindings.push(binding);
        }
        self.push_event(DataEvent::AnimationInstanceChanged(instance));
        Ok(())
    }

    // ----- animations -----

    pub fn allocate_animation(&mut self, instance: InstanceHandle) -> Result<AnimationHandle> {
        if !self.instances.contains(instance) {
            return Err(AnimationError::not_found(EntityKind::Instance, instance));
        }
        Ok(self.animations.allocate(Animation::new(instance)))
    }

    #[inline]
    pub fn animation(&self, handle: AnimationHandle) -> Option<&Animation> {
        self.animations.get(handle)
    }

    #[inline]
    pub fn contains_animation(&self, handle: AnimationHandle) -> bool {
        self.animations.contains(handle)
    }

    /// Deallocates the slot. Untracking from the scheduler is the caller's job.
    pub fn remove_animation(&mut self, handle: AnimationHandle) -> Result<Animation> {
        self.animations
            .remove(handle)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Animation, handle))
    }

    #[inline]
    pub fn num_animations(&self) -> usize {
        self.animations.len()
    }

    /// Live animations in slot order.
    pub fn animations(&self) -> impl Iterator<Item = (AnimationHandle, &Animation)> {
        self.animations.iter()
    }

    fn animation_mut(&mut self, handle: AnimationHandle) -> Result<&mut Animation> {
        self.animations
            .get_mut(handle)
            .ok_or_else(|| AnimationError::not_found(EntityKind::Animation, handle))
    }

    /// Place the animation on the timeline. Any range is accepted; one that
    /// is unset or empty just never activates.
    pub fn set_animation_time_range(
        &mut self,
        handle: AnimationHandle,
        range: TimeRange,
    ) -> Result<()> {
        self.animation_mut(handle)?.range = range;
        self.push_event(DataEvent::AnimationTimeRangeChanged(handle));
        Ok(())
    }

    /// Fires only when the flag actually changes.
    pub fn set_animation_paused(&mut self, handle: AnimationHandle, paused: bool) -> Result<()> {
        let anim = self.animation_mut(handle)?;
        if anim.paused == paused {
            return Ok(());
        }
        anim.paused = paused;
        self.push_event(DataEvent::AnimationPauseChanged(handle, paused));
        Ok(())
    }

    pub fn set_animation_properties(
        &mut self,
        handle: AnimationHandle,
        properties: AnimationProperties,
    ) -> Result<()> {
        if !(properties.speed > 0.0 && properties.speed.is_finite()) {
            log::error!("rejecting playback speed {} for {handle:?}", properties.speed);
            return Err(AnimationError::InvalidPlaybackSpeed {
                speed: properties.speed,
            });
        }
        let anim = self.animation_mut(handle)?;
        anim.speed = properties.speed;
        anim.loop_duration = properties.loop_duration;
        anim.flags = properties.flags;
        self.push_event(DataEvent::AnimationPropertiesChanged(handle));
        Ok(())
    }
}
