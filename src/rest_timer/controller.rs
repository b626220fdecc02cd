use std::time::Instant;

use tracing::debug;

use super::RestTimer;
use crate::model::{ExerciseItem, SetRef};
use crate::tree;

/// Identifies the tick schedule of one timer. Starting a new timer
/// invalidates every handle handed out before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Started(SetRef),
    /// Replaced or interrupted before reaching zero; its rest counts as taken
    ForceCompleted(SetRef),
    /// Reached zero; any popup showing it should close
    Expired(SetRef),
    /// Dropped without marking the rest as taken
    Cancelled(SetRef),
}

/// Owns the single active rest timer and keeps it consistent with the sets
/// in the tree. Every method returns the (possibly unchanged) tree.
#[derive(Debug, Default)]
pub struct RestTimerController {
    active: Option<RestTimer>,
    generation: u64,
    events: Vec<TimerEvent>,
}

fn mark_rest_completed(items: &[ExerciseItem], set: &SetRef) -> Vec<ExerciseItem> {
    tree::update_set(items, set, |mut s| {
        s.rest_timer_completed = true;
        s
    })
}

impl RestTimerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&RestTimer> {
        self.active.as_ref()
    }

    /// Handle for the currently scheduled tick, if a timer is live
    pub fn handle(&self) -> Option<TickHandle> {
        self.active.as_ref().map(|_| TickHandle(self.generation))
    }

    pub fn take_events(&mut self) -> Vec<TimerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Starts a countdown for `set`. A timer already running or paused is
    /// force-completed first.
    pub fn start(
        &mut self,
        items: &[ExerciseItem],
        set: &SetRef,
        seconds: u32,
        now: Instant,
    ) -> Vec<ExerciseItem> {
        if seconds == 0 || tree::find_set(items, set).is_none() {
            debug!(set_id = %set.set_id, seconds, "rest timer not started");
            return items.to_vec();
        }
        let items = self.force_complete(items);
        self.generation += 1;
        self.active = Some(RestTimer::start(set.clone(), seconds, now));
        self.events.push(TimerEvent::Started(set.clone()));
        items
    }

    fn force_complete(&mut self, items: &[ExerciseItem]) -> Vec<ExerciseItem> {
        match self.active.take() {
            Some(old) => {
                let set = old.set_ref();
                debug!(set_id = %set.set_id, "force-completing rest timer");
                self.events.push(TimerEvent::ForceCompleted(set.clone()));
                mark_rest_completed(items, &set)
            }
            None => items.to_vec(),
        }
    }

    /// Scheduler callback. Ticks from a superseded schedule are ignored.
    pub fn tick(
        &mut self,
        items: &[ExerciseItem],
        handle: TickHandle,
        now: Instant,
    ) -> Vec<ExerciseItem> {
        if self.handle() != Some(handle) {
            return items.to_vec();
        }
        let Some(timer) = self.active.take() else {
            return items.to_vec();
        };
        match timer.tick(now) {
            Some(next) => {
                self.active = Some(next);
                items.to_vec()
            }
            None => {
                let set = timer.set_ref();
                debug!(set_id = %set.set_id, "rest timer expired");
                self.events.push(TimerEvent::Expired(set.clone()));
                mark_rest_completed(items, &set)
            }
        }
    }

    pub fn pause(&mut self, now: Instant) {
        self.active = self.active.take().map(|t| t.pause(now));
    }

    pub fn resume(&mut self, now: Instant) {
        self.active = self.active.take().map(|t| t.resume(now));
    }

    pub fn adjust(&mut self, delta_seconds: i32, now: Instant) {
        self.active = self.active.take().map(|t| t.adjust(delta_seconds, now));
    }

    /// Drops the active timer without marking its rest as taken
    pub fn cancel(&mut self) {
        if let Some(t) = self.active.take() {
            self.events.push(TimerEvent::Cancelled(t.set_ref()));
        }
    }

    fn cancel_if_refers_to(&mut self, set: &SetRef) {
        if self.active.as_ref().is_some_and(|t| t.refers_to(set)) {
            self.cancel();
        }
    }

    /// Marks a set completed. A timer running for another set is
    /// force-completed, and the set's own rest period starts a new one when
    /// `auto_start` is on.
    pub fn complete_set(
        &mut self,
        items: &[ExerciseItem],
        set: &SetRef,
        auto_start: bool,
        now: Instant,
    ) -> Vec<ExerciseItem> {
        let Some(current) = tree::find_set(items, set) else {
            return items.to_vec();
        };
        if current.completed {
            return items.to_vec();
        }
        let rest = current.rest_seconds();

        let items = tree::update_set(items, set, |mut s| {
            s.completed = true;
            s
        });
        if self.active.as_ref().is_some_and(|t| t.refers_to(set)) {
            // the timer was opened for this very set ahead of time; let it run
            return items;
        }
        let items = self.force_complete(&items);
        match rest {
            Some(seconds) if auto_start => self.start(&items, set, seconds, now),
            _ => items,
        }
    }

    /// Un-completes a set, dropping its timer without counting the rest
    pub fn uncomplete_set(&mut self, items: &[ExerciseItem], set: &SetRef) -> Vec<ExerciseItem> {
        if !tree::find_set(items, set).is_some_and(|s| s.completed) {
            return items.to_vec();
        }
        self.cancel_if_refers_to(set);
        tree::toggle_set_completed(items, set)
    }

    pub fn toggle_set(
        &mut self,
        items: &[ExerciseItem],
        set: &SetRef,
        auto_start: bool,
        now: Instant,
    ) -> Vec<ExerciseItem> {
        match tree::find_set(items, set) {
            Some(s) if s.completed => self.uncomplete_set(items, set),
            Some(_) => self.complete_set(items, set, auto_start, now),
            None => items.to_vec(),
        }
    }

    /// Sets (or with zero, removes) a set's rest period
    pub fn set_rest_period(
        &mut self,
        items: &[ExerciseItem],
        set: &SetRef,
        seconds: u32,
    ) -> Vec<ExerciseItem> {
        if seconds == 0 {
            return self.remove_rest_period(items, set);
        }
        tree::update_set(items, set, |mut s| {
            s.rest_period_seconds = Some(seconds);
            s
        })
    }

    pub fn remove_rest_period(
        &mut self,
        items: &[ExerciseItem],
        set: &SetRef,
    ) -> Vec<ExerciseItem> {
        if tree::find_set(items, set).is_none() {
            return items.to_vec();
        }
        self.cancel_if_refers_to(set);
        tree::update_set(items, set, |mut s| {
            s.rest_period_seconds = None;
            s.rest_timer_completed = false;
            s
        })
    }

    pub fn delete_set(&mut self, items: &[ExerciseItem], set: &SetRef) -> Vec<ExerciseItem> {
        self.cancel_if_refers_to(set);
        tree::delete_set(items, set)
    }

    /// Deletes an exercise or group, dropping a timer that pointed into it
    pub fn delete_exercise(&mut self, items: &[ExerciseItem], id: &str) -> Vec<ExerciseItem> {
        let out = tree::delete(items, id);
        if let Some(t) = &self.active {
            if tree::find_set(&out, &t.set_ref()).is_none() {
                self.cancel();
            }
        }
        out
    }
}
