//! Cadence Animation Core (engine-agnostic)
//!
//! Keyframe animation engine driven by an externally supplied time cursor:
//! - `store`: handle-indexed splines, data bindings, instances, animations
//! - `scheduler`: pending/active queues ordered by start/stop time
//! - `sampling` + `interp`: cached segment lookup and step/linear/bezier
//!   evaluation
//! - `dispatch`: writes evaluated values through host bindings
//! - `system`: the facade tying them together, with listener fan-out
//!
//! Everything runs synchronously on the caller's thread; identical operation
//! sequences produce identical writes.

pub mod binding;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod ids;
pub mod interp;
pub mod notifier;
pub mod sampling;
pub mod scheduler;
pub mod sequence;
pub mod spline;
pub mod store;
pub mod system;
pub mod time;
pub mod value;

// Re-exports for hosts and adapters
pub use binding::{BindingAddress, BindingHandles, BindingTarget, DataBinding, PropertyTable};
pub use commands::{parse_commands_json, Command, CommandOutcome};
pub use config::{CapacityHints, Config, ProcessingMode};
pub use dispatch::{local_spline_time, BoundaryDispatcher, Dispatcher, FullDispatcher};
pub use error::{AnimationError, EntityKind, Result};
pub use events::{DataEvent, LifecycleEvent};
pub use ids::{AnimationHandle, DataBindHandle, Handle, InstanceHandle, Pool, SplineHandle};
pub use interp::InterpolationType;
pub use notifier::{ChangeNotifier, SubscriptionId};
pub use sampling::{sample_spline, Segment, SegmentLocator};
pub use scheduler::{ScheduleState, Scheduler};
pub use sequence::{AnimationSequence, SequenceItem};
pub use spline::{KeyShape, Spline, SplineKey, Tangents, Vec2};
pub use store::{Animation, AnimationFlags, AnimationInstance, AnimationProperties, EntityStore};
pub use system::AnimationSystem;
pub use time::{AnimationTime, SplineTimeStamp, TimeRange, LOOPING_LENGTH_MULTIPLIER};
pub use value::{is_binding_compatible, Value, ValueKind, VectorComponent};
