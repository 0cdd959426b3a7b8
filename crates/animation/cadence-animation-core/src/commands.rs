//! Serializable operation log.
//!
//! Hosts that receive operations over a trust boundary (network sync,
//! recorded sessions) deserialize [`Command`]s and feed them through
//! [`AnimationSystem::apply`]. Handle allocation is deterministic, so two
//! systems replaying the same log hand out the same handles and end in the
//! same state.

use serde::{Deserialize, Serialize};

use crate::binding::{BindingTarget, DataBinding};
use crate::error::Result;
use crate::ids::{AnimationHandle, DataBindHandle, InstanceHandle, SplineHandle};
use crate::interp::InterpolationType;
use crate::spline::{KeyShape, SplineKey};
use crate::store::AnimationProperties;
use crate::system::AnimationSystem;
use crate::time::{AnimationTime, SplineTimeStamp, TimeRange};
use crate::value::{ValueKind, VectorComponent};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Command {
    AllocateSpline {
        key_shape: KeyShape,
        value_kind: ValueKind,
    },
    SetSplineKey {
        spline: SplineHandle,
        timestamp: SplineTimeStamp,
        key: SplineKey,
    },
    RemoveSplineKey {
        spline: SplineHandle,
        index: usize,
    },
    RemoveSplineKeys {
        spline: SplineHandle,
    },
    RemoveSpline {
        spline: SplineHandle,
    },
    AllocateDataBinding {
        binding: DataBinding,
    },
    RemoveDataBinding {
        binding: DataBindHandle,
    },
    AllocateInstance {
        spline: SplineHandle,
        interpolation: InterpolationType,
        #[serde(default)]
        component: VectorComponent,
    },
    AddDataBindingToInstance {
        instance: InstanceHandle,
        binding: DataBindHandle,
    },
    RemoveInstance {
        instance: InstanceHandle,
    },
    AllocateAnimation {
        instance: InstanceHandle,
    },
    RemoveAnimation {
        animation: AnimationHandle,
    },
    SetAnimationTimeRange {
        animation: AnimationHandle,
        range: TimeRange,
    },
    SetAnimationPaused {
        animation: AnimationHandle,
        paused: bool,
    },
    SetAnimationProperties {
        animation: AnimationHandle,
        properties: AnimationProperties,
    },
    SetAnimationStartTime {
        animation: AnimationHandle,
        start: AnimationTime,
    },
    SetAnimationStopTime {
        animation: AnimationHandle,
        stop: AnimationTime,
    },
    StopAnimationAndRollback {
        animation: AnimationHandle,
    },
    AdvanceTime {
        time: AnimationTime,
    },
}

/// What a successfully applied command produced.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    Spline(SplineHandle),
    DataBinding(DataBindHandle),
    Instance(InstanceHandle),
    Animation(AnimationHandle),
    KeyIndex(usize),
}

/// Parse a JSON array of commands.
pub fn parse_commands_json(json: &str) -> Result<Vec<Command>> {
    Ok(serde_json::from_str(json)?)
}

impl<T: BindingTarget> AnimationSystem<T> {
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome> {
        use CommandOutcome::Done;
        let outcome = match command {
            Command::AllocateSpline {
                key_shape,
                value_kind,
            } => CommandOutcome::Spline(self.allocate_spline(key_shape, value_kind)),
            Command::SetSplineKey {
                spline,
                timestamp,
                key,
            } => CommandOutcome::KeyIndex(self.set_spline_key(spline, timestamp, key)?),
            Command::RemoveSplineKey { spline, index } => {
                self.remove_spline_key(spline, index)?;
                Done
            }
            Command::RemoveSplineKeys { spline } => {
                self.remove_spline_keys(spline)?;
                Done
            }
            Command::RemoveSpline { spline } => {
                self.remove_spline(spline)?;
                Done
            }
            Command::AllocateDataBinding { binding } => {
                CommandOutcome::DataBinding(self.allocate_data_binding(binding))
            }
            Command::RemoveDataBinding { binding } => {
                self.remove_data_binding(binding)?;
                Done
            }
            Command::AllocateInstance {
                spline,
                interpolation,
                component,
            } => CommandOutcome::Instance(self.allocate_instance(spline, interpolation, component)?),
            Command::AddDataBindingToInstance { instance, binding } => {
                self.add_data_binding_to_instance(instance, binding)?;
                Done
            }
            Command::RemoveInstance { instance } => {
                self.remove_instance(instance)?;
                Done
            }
            Command::AllocateAnimation { instance } => {
                CommandOutcome::Animation(self.allocate_animation(instance)?)
            }
            Command::RemoveAnimation { animation } => {
                self.remove_animation(animation)?;
                Done
            }
            Command::SetAnimationTimeRange { animation, range } => {
                self.set_animation_time_range(animation, range)?;
                Done
            }
            Command::SetAnimationPaused { animation, paused } => {
                self.set_animation_paused(animation, paused)?;
                Done
            }
            Command::SetAnimationProperties {
                animation,
                properties,
            } => {
                self.set_animation_properties(animation, properties)?;
                Done
            }
            Command::SetAnimationStartTime { animation, start } => {
                self.set_animation_start_time(animation, start)?;
                Done
            }
            Command::SetAnimationStopTime { animation, stop } => {
                self.set_animation_stop_time(animation, stop)?;
                Done
            }
            Command::StopAnimationAndRollback { animation } => {
                self.stop_animation_and_rollback(animation)?;
                Done
            }
            Command::AdvanceTime { time } => {
                self.set_time(time);
                Done
            }
        };
        Ok(outcome)
    }

    /// Apply in order; stops at the first failing command.
    pub fn apply_all<I>(&mut self, commands: I) -> Result<Vec<CommandOutcome>>
    where
        I: IntoIterator<Item = Command>,
    {
        commands.into_iter().map(|c| self.apply(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingAddress, PropertyTable};
    use crate::error::{AnimationError, EntityKind};
    use crate::value::Value;

    #[test]
    fn allocations_report_handles() {
        let mut system: AnimationSystem<PropertyTable> = AnimationSystem::default();
        let out = system
            .apply_all([
                Command::AllocateSpline {
                    key_shape: KeyShape::Basic,
                    value_kind: ValueKind::Int32,
                },
                Command::SetSplineKey {
                    spline: SplineHandle::new(0, 0),
                    timestamp: 5,
                    key: SplineKey::basic(Value::Int32(2)),
                },
                Command::AllocateDataBinding {
                    binding: DataBinding::new(BindingAddress::global(3), ValueKind::Int32),
                },
            ])
            .unwrap();
        assert_eq!(
            out,
            vec![
                CommandOutcome::Spline(SplineHandle::new(0, 0)),
                CommandOutcome::KeyIndex(0),
                CommandOutcome::DataBinding(DataBindHandle::new(0, 0)),
            ]
        );
    }

    #[test]
    fn unknown_handle_is_an_error_not_a_panic() {
        let mut system: AnimationSystem<PropertyTable> = AnimationSystem::default();
        let err = system
            .apply(Command::SetAnimationPaused {
                animation: AnimationHandle::new(4, 1),
                paused: true,
            })
            .unwrap_err();
        assert_eq!(
            err,
            AnimationError::EntityNotFound {
                kind: EntityKind::Animation,
                index: 4,
                generation: 1
            }
        );
    }

    #[test]
    fn parses_json_log() {
        let json = r#"[
            {"AllocateSpline": {"key_shape": "Basic", "value_kind": "Float"}},
            {"SetSplineKey": {"spline": {"index": 0}, "timestamp": 10,
                              "key": {"value": {"type": "Float", "data": 1.5}}}},
            {"AdvanceTime": {"time": 100}}
        ]"#;
        let commands = parse_commands_json(json).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[1],
            Command::SetSplineKey {
                spline: SplineHandle::new(0, 0),
                timestamp: 10,
                key: SplineKey::basic(Value::Float(1.5)),
            }
        );
    }
}
