//! Time-cursor scheduler.
//!
//! Tracks animations as Pending (ordered by start) or Active (ordered by
//! stop). Entries with equal times keep insertion order. The scheduler only
//! holds handles plus cached range/instance/spline data; everything else is
//! resolved through the [`EntityStore`] on demand.
//!
//! Lifecycle events are pushed into an outbox and drained by the owning
//! system, in the order they were produced.

use hashbrown::HashMap;
use serde::Serialize;

use crate::events::{DataEvent, LifecycleEvent};
use crate::ids::{AnimationHandle, InstanceHandle, SplineHandle};
use crate::store::EntityStore;
use crate::time::AnimationTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ScheduleState {
    Pending,
    Active,
}

#[derive(Clone, Copy, Debug)]
struct Tracked {
    state: ScheduleState,
    start: AnimationTime,
    stop: AnimationTime,
    instance: InstanceHandle,
    spline: Option<SplineHandle>,
}

#[derive(Clone, Copy, Debug)]
struct QueueEntry {
    time: AnimationTime,
    animation: AnimationHandle,
}

/// Stable ordered insert: after every entry with an equal time.
fn insert_ordered(queue: &mut Vec<QueueEntry>, entry: QueueEntry) {
    let at = queue.partition_point(|e| e.time <= entry.time);
    queue.insert(at, entry);
}

fn remove_entry(queue: &mut Vec<QueueEntry>, animation: AnimationHandle) {
    if let Some(pos) = queue.iter().position(|e| e.animation == animation) {
        queue.remove(pos);
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    time: AnimationTime,
    pending: Vec<QueueEntry>,
    active: Vec<QueueEntry>,
    tracked: HashMap<AnimationHandle, Tracked>,
    events: Vec<LifecycleEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(animations: usize) -> Self {
        Self {
            time: 0,
            pending: Vec::with_capacity(animations),
            active: Vec::with_capacity(animations),
            tracked: HashMap::with_capacity(animations),
            events: Vec::new(),
        }
    }

    /// Current time cursor.
    #[inline]
    pub fn time(&self) -> AnimationTime {
        self.time
    }

    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn state(&self, animation: AnimationHandle) -> Option<ScheduleState> {
        self.tracked.get(&animation).map(|t| t.state)
    }

    #[inline]
    pub fn is_tracked(&self, animation: AnimationHandle) -> bool {
        self.tracked.contains_key(&animation)
    }

    #[inline]
    pub fn is_active(&self, animation: AnimationHandle) -> bool {
        self.state(animation) == Some(ScheduleState::Active)
    }

    #[inline]
    pub fn is_pending(&self, animation: AnimationHandle) -> bool {
        self.state(animation) == Some(ScheduleState::Pending)
    }

    /// Active animations by ascending stop time.
    pub fn active(&self) -> impl Iterator<Item = AnimationHandle> + '_ {
        self.active.iter().map(|e| e.animation)
    }

    /// Pending animations by ascending start time.
    pub fn pending(&self) -> impl Iterator<Item = AnimationHandle> + '_ {
        self.pending.iter().map(|e| e.animation)
    }

    #[inline]
    pub fn num_active(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Cached `(start, stop)` of a tracked animation.
    pub fn tracked_range(&self, animation: AnimationHandle) -> Option<(AnimationTime, AnimationTime)> {
        self.tracked.get(&animation).map(|t| (t.start, t.stop))
    }

    /// Start tracking an animation against the current cursor.
    ///
    /// Unset/empty ranges and ranges already over stay untracked and fire
    /// nothing. A range covering the cursor activates immediately with
    /// `Started`. Already tracked animations are left as they are.
    pub fn enqueue(&mut self, animation: AnimationHandle, store: &EntityStore) -> Option<ScheduleState> {
        if let Some(state) = self.state(animation) {
            return Some(state);
        }
        let Some(anim) = store.animation(animation) else {
            log::warn!("enqueue: {animation:?} does not resolve");
            return None;
        };
        let Some((start, stop)) = anim.range.bounds() else {
            log::debug!("{animation:?} has no valid range; not tracked");
            return None;
        };
        if self.time >= stop {
            log::debug!("{animation:?} already over at {}; not tracked", self.time);
            return None;
        }

        let state = if start <= self.time {
            ScheduleState::Active
        } else {
            ScheduleState::Pending
        };
        let tracked = Tracked {
            state,
            start,
            stop,
            instance: anim.instance,
            spline: store.instance(anim.instance).map(|i| i.spline),
        };
        match state {
            ScheduleState::Active => insert_ordered(
                &mut self.active,
                QueueEntry {
                    time: stop,
                    animation,
                },
            ),
            ScheduleState::Pending => insert_ordered(
                &mut self.pending,
                QueueEntry {
                    time: start,
                    animation,
                },
            ),
        }
        self.tracked.insert(animation, tracked);
        log::debug!("{animation:?} enqueued as {state:?} [{start}, {stop})");
        if state == ScheduleState::Active {
            self.events.push(LifecycleEvent::Started {
                animation,
                time: start,
            });
        }
        Some(state)
    }

    /// Stop tracking without firing events. Returns the state it was in.
    pub fn dequeue(&mut self, animation: AnimationHandle) -> Option<ScheduleState> {
        let tracked = self.tracked.remove(&animation)?;
        match tracked.state {
            ScheduleState::Active => remove_entry(&mut self.active, animation),
            ScheduleState::Pending => remove_entry(&mut self.pending, animation),
        }
        Some(tracked.state)
    }

    /// Move the cursor forward. Times at or before the cursor are ignored.
    pub fn advance_time(&mut self, time: AnimationTime) {
        if time <= self.time {
            return;
        }
        self.time = time;

        let due = self.active.partition_point(|e| e.time <= time);
        for entry in self.active.drain(..due) {
            self.tracked.remove(&entry.animation);
            log::debug!("{:?} finished at {}", entry.animation, entry.time);
            self.events.push(LifecycleEvent::Finished {
                animation: entry.animation,
                time: entry.time,
            });
        }

        let due = self.pending.partition_point(|e| e.time <= time);
        let starting: Vec<QueueEntry> = self.pending.drain(..due).collect();
        for entry in starting {
            let Some(tracked) = self.tracked.get_mut(&entry.animation) else {
                continue;
            };
            if tracked.stop > time {
                tracked.state = ScheduleState::Active;
                insert_ordered(
                    &mut self.active,
                    QueueEntry {
                        time: tracked.stop,
                        animation: entry.animation,
                    },
                );
                log::debug!("{:?} started at {}", entry.animation, tracked.start);
                self.events.push(LifecycleEvent::Started {
                    animation: entry.animation,
                    time: tracked.start,
                });
            } else {
                // skipped over entirely within one advance
                log::debug!("{:?} skipped: [{}, {}) passed", entry.animation, tracked.start, tracked.stop);
                self.tracked.remove(&entry.animation);
            }
        }

        self.events.push(LifecycleEvent::TimeChanged { time });
    }

    /// React to a store mutation.
    pub fn handle_data_event(&mut self, event: &DataEvent, store: &EntityStore) {
        match *event {
            DataEvent::SplineChanged(spline) => {
                for animation in self.tracked_in_order() {
                    let uses_spline = self
                        .tracked
                        .get(&animation)
                        .is_some_and(|t| t.spline == Some(spline));
                    if uses_spline {
                        self.events
                            .push(LifecycleEvent::PropertiesChanged { animation });
                    }
                }
            }
            DataEvent::AnimationInstanceChanged(instance) => {
                let spline = store.instance(instance).map(|i| i.spline);
                for animation in self.tracked_in_order() {
                    let Some(tracked) = self.tracked.get_mut(&animation) else {
                        continue;
                    };
                    if tracked.instance == instance {
                        if spline.is_some() {
                            tracked.spline = spline;
                        }
                        self.events
                            .push(LifecycleEvent::PropertiesChanged { animation });
                    }
                }
            }
            DataEvent::AnimationPropertiesChanged(animation) => {
                let Some(tracked) = self.tracked.get_mut(&animation) else {
                    return;
                };
                if let Some(anim) = store.animation(animation) {
                    tracked.instance = anim.instance;
                    if let Some(inst) = store.instance(anim.instance) {
                        tracked.spline = Some(inst.spline);
                    }
                }
                self.events
                    .push(LifecycleEvent::PropertiesChanged { animation });
            }
            DataEvent::AnimationPauseChanged(animation, paused) => {
                if !self.is_active(animation) {
                    return;
                }
                let time = self.time;
                self.events.push(if paused {
                    LifecycleEvent::Paused { animation, time }
                } else {
                    LifecycleEvent::Resumed { animation, time }
                });
            }
            DataEvent::AnimationTimeRangeChanged(animation) => {
                self.on_time_range_changed(animation, store);
            }
        }
    }

    /// Range change rules:
    /// - untracked or pending: (re-)enqueue against the new range
    /// - active, new range still covers the cursor: reposition by the new
    ///   stop time and fire `PropertiesChanged`
    /// - active, new range starts in the future: `Finished` now, then pending
    /// - active, new range over or invalid: `Finished` now, untracked
    ///
    /// An animation that was never started is never reported finished, and a
    /// started one always gets exactly one `Finished`.
    fn on_time_range_changed(&mut self, animation: AnimationHandle, store: &EntityStore) {
        let Some(state) = self.state(animation) else {
            self.enqueue(animation, store);
            return;
        };
        if state == ScheduleState::Pending {
            self.dequeue(animation);
            self.enqueue(animation, store);
            return;
        }

        let now = self.time;
        let bounds = store.animation(animation).and_then(|a| a.range.bounds());
        match bounds {
            Some((start, stop)) if start <= now && now < stop => {
                remove_entry(&mut self.active, animation);
                if let Some(tracked) = self.tracked.get_mut(&animation) {
                    tracked.start = start;
                    tracked.stop = stop;
                }
                insert_ordered(
                    &mut self.active,
                    QueueEntry {
                        time: stop,
                        animation,
                    },
                );
                self.events
                    .push(LifecycleEvent::PropertiesChanged { animation });
            }
            Some((_, stop)) if now < stop => {
                self.dequeue(animation);
                self.events
                    .push(LifecycleEvent::Finished { animation, time: now });
                self.enqueue(animation, store);
            }
            _ => {
                self.dequeue(animation);
                self.events
                    .push(LifecycleEvent::Finished { animation, time: now });
            }
        }
    }

    /// Tracked animations: active by stop, then pending by start.
    fn tracked_in_order(&self) -> Vec<AnimationHandle> {
        self.active
            .iter()
            .chain(self.pending.iter())
            .map(|e| e.animation)
            .collect()
    }
}
