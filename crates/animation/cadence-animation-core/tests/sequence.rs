use approx::assert_abs_diff_eq;

use cadence_animation_core::{
    AnimationError, AnimationHandle, AnimationProperties, AnimationSequence, AnimationSystem,
    BindingAddress, DataBinding, InterpolationType, KeyShape, PropertyTable, SplineKey, TimeRange,
    Value, ValueKind, VectorComponent,
};

/// Ramp 0..100 over spline time 0..100, bound to `property`.
fn ramp(system: &mut AnimationSystem<PropertyTable>, property: u32) -> AnimationHandle {
    let spline = system.allocate_spline(KeyShape::Basic, ValueKind::Float);
    system
        .set_spline_key(spline, 0, SplineKey::basic(Value::Float(0.0)))
        .unwrap();
    system
        .set_spline_key(spline, 100, SplineKey::basic(Value::Float(100.0)))
        .unwrap();
    let inst = system
        .allocate_instance(spline, InterpolationType::Linear, VectorComponent::All)
        .unwrap();
    let bind = system.allocate_data_binding(DataBinding::new(
        BindingAddress::global(property),
        ValueKind::Float,
    ));
    system.add_data_binding_to_instance(inst, bind).unwrap();
    system.allocate_animation(inst).unwrap()
}

fn read(system: &AnimationSystem<PropertyTable>, property: u32) -> f32 {
    match system.target().get(&BindingAddress::global(property)) {
        Some(Value::Float(v)) => v,
        other => panic!("property {property}: {other:?}"),
    }
}

/// it should place members relative to the sequence start
#[test]
fn start_places_members_on_the_timeline() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let a = ramp(&mut system, 1);
    let b = ramp(&mut system, 2);

    let mut seq = AnimationSequence::new();
    seq.add_animation(&system, a, 0, None).unwrap();
    seq.add_animation(&system, b, 50, Some(250)).unwrap();
    assert_eq!(seq.num_animations(), 2);
    assert_eq!(seq.item(a).map(|i| (i.start, i.stop)), Some((0, 100)));
    assert_eq!(seq.sequence_stop_time(), 250);
    assert!(!seq.is_active(&system));

    seq.start_at(&mut system, 1000).unwrap();
    assert_eq!(seq.start_time(), Some(1000));
    assert_eq!(system.animation(a).unwrap().range, TimeRange::new(1000, 1100));
    assert_eq!(system.animation(b).unwrap().range, TimeRange::new(1050, 1250));

    system.set_time(1090);
    assert!(seq.is_active(&system));
    assert_abs_diff_eq!(read(&system, 1), 90.0, epsilon = 1e-4);
    assert_abs_diff_eq!(read(&system, 2), 20.0, epsilon = 1e-4);

    system.set_time(1300);
    assert!(!seq.is_active(&system));
    assert_abs_diff_eq!(read(&system, 1), 100.0, epsilon = 1e-4);
    assert_abs_diff_eq!(read(&system, 2), 100.0, epsilon = 1e-4);
}

/// it should start relative to the current time and in reverse on request
#[test]
fn offset_and_reverse_start() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let a = ramp(&mut system, 1);
    let mut seq = AnimationSequence::new();
    seq.add_animation(&system, a, 0, None).unwrap();

    system.set_time(500);
    seq.start(&mut system, 20).unwrap();
    assert_eq!(system.animation(a).unwrap().range, TimeRange::new(520, 620));

    seq.start_reverse_at(&mut system, 700).unwrap();
    assert!(system.animation(a).unwrap().flags.reverse);
    system.set_time(725);
    assert_abs_diff_eq!(read(&system, 1), 75.0, epsilon = 1e-4);
}

/// it should stop every member at the given time while running
#[test]
fn stop_at_finishes_members() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let a = ramp(&mut system, 1);
    let b = ramp(&mut system, 2);
    let mut seq = AnimationSequence::new();
    seq.add_animation(&system, a, 0, None).unwrap();
    seq.add_animation(&system, b, 0, Some(400)).unwrap();

    // not started yet: ignored
    seq.stop_at(&mut system, 10).unwrap();
    assert_eq!(system.animation(a).unwrap().range, TimeRange::unset());

    seq.start_at(&mut system, 0).unwrap();
    system.set_time(30);
    seq.stop_at(&mut system, 30).unwrap();
    assert!(!system.has_active_animations());
    assert!(!seq.is_active(&system));
}

/// it should keep its position when re-timed while running
#[test]
fn playback_speed_keeps_position() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let a = ramp(&mut system, 1);
    let mut seq = AnimationSequence::new();
    seq.add_animation(&system, a, 0, None).unwrap();

    seq.start_at(&mut system, 0).unwrap();
    system.set_time(40);
    assert_abs_diff_eq!(read(&system, 1), 40.0, epsilon = 1e-4);

    seq.set_playback_speed(&mut system, 2.0).unwrap();
    assert_eq!(seq.playback_speed(), 2.0);
    assert_eq!(seq.item(a).map(|i| (i.start, i.stop)), Some((0, 100)));
    assert_eq!(seq.start_time(), Some(20));
    assert_eq!(system.animation(a).unwrap().range, TimeRange::new(20, 120));
    assert_eq!(system.animation(a).unwrap().speed, 2.0);
    assert!(system.is_animation_active(a));

    system.set_time(45);
    assert_abs_diff_eq!(read(&system, 1), 50.0, epsilon = 1e-4);
    system.set_time(80);
    assert_abs_diff_eq!(read(&system, 1), 100.0, epsilon = 1e-4);

    assert_eq!(
        seq.set_playback_speed(&mut system, -1.0),
        Err(AnimationError::InvalidPlaybackSpeed { speed: -1.0 })
    );
}

/// it should play members at the sequence speed inside their placement
#[test]
fn half_speed_sequence_plays_members_slower() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let a = ramp(&mut system, 1);
    let mut seq = AnimationSequence::new();
    seq.set_playback_speed(&mut system, 0.5).unwrap();
    seq.add_animation(&system, a, 0, None).unwrap();
    assert_eq!(seq.item(a).map(|i| (i.start, i.stop)), Some((0, 100)));

    seq.start_at(&mut system, 0).unwrap();
    system.set_time(50);
    assert_abs_diff_eq!(read(&system, 1), 25.0, epsilon = 1e-4);
}

/// it should clamp placements at the end of the timeline instead of overflowing
#[test]
fn huge_placements_saturate() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let spline = system.allocate_spline(KeyShape::Basic, ValueKind::Float);
    system
        .set_spline_key(spline, 0, SplineKey::basic(Value::Float(0.0)))
        .unwrap();
    system
        .set_spline_key(spline, 4_000_000_000, SplineKey::basic(Value::Float(1.0)))
        .unwrap();
    let inst = system
        .allocate_instance(spline, InterpolationType::Linear, VectorComponent::All)
        .unwrap();
    let a = system.allocate_animation(inst).unwrap();
    let mut looping = AnimationProperties::default();
    looping.flags.looping = true;
    system.set_animation_properties(a, looping).unwrap();

    let mut seq = AnimationSequence::new();
    seq.set_playback_speed(&mut system, 1e-6).unwrap();
    seq.add_animation(&system, a, u64::MAX - 10, None).unwrap();
    assert_eq!(
        seq.item(a).map(|i| (i.start, i.stop)),
        Some((u64::MAX - 10, u64::MAX))
    );

    seq.add_animation(&system, a, 5, None).unwrap();
    system.set_time(100);
    seq.start(&mut system, u64::MAX).unwrap();
    assert_eq!(seq.start_time(), Some(u64::MAX));
    assert_eq!(
        system.animation(a).unwrap().range,
        TimeRange::new(u64::MAX, u64::MAX)
    );
}

/// it should apply looping and relative flags to started members
#[test]
fn member_flags_follow_the_sequence() {
    let mut system = AnimationSystem::with_target(PropertyTable::new());
    let a = ramp(&mut system, 1);
    let mut seq = AnimationSequence::new();
    seq.add_animation(&system, a, 0, Some(1000)).unwrap();

    // not running: recorded only
    seq.set_animation_looping(&mut system, a, 40).unwrap();
    assert!(!system.animation(a).unwrap().flags.looping);

    seq.start_at(&mut system, 0).unwrap();
    let anim = system.animation(a).unwrap();
    assert!(anim.flags.looping);
    assert_eq!(anim.loop_duration, 40);

    system.set_time(50);
    assert_abs_diff_eq!(read(&system, 1), 10.0, epsilon = 1e-4);

    seq.set_animation_relative(&mut system, a, true).unwrap();
    assert!(system.animation(a).unwrap().flags.relative);

    assert!(seq.remove_animation(a));
    assert!(!seq.remove_animation(a));
    assert!(seq
        .set_animation_relative(&mut system, a, false)
        .is_err());
}

/// it should reject handles the system does not know
#[test]
fn unknown_member_is_an_error() {
    let system = AnimationSystem::with_target(PropertyTable::new());
    let mut seq = AnimationSequence::new();
    assert!(matches!(
        seq.add_animation(&system, AnimationHandle::new(3, 0), 0, Some(10)),
        Err(AnimationError::EntityNotFound { .. })
    ));
    assert!(!seq.contains(AnimationHandle::new(3, 0)));
}
