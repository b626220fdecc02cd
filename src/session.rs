//! The controller a workout screen drives.
//!
//! `WorkoutSession` owns the workout plus the three pieces of ephemeral state
//! the screen needs (grouping selection, drag, rest timer) and hands every
//! committed tree to the `on_update` callback. No-ops, cancellations and drag
//! motion never reach the callback.

use std::time::Instant;

use tracing::trace;

use crate::config::Config;
use crate::drag::{from_flat_drag_list, DragEffect, DragItem, DragSession, LayoutSnapshot, Point};
use crate::grouping::{self, GroupingState};
use crate::model::{DropSetType, Exercise, ExerciseItem, GroupType, Note, Set, SetRef, Workout};
use crate::rest_timer::{RestTimer, RestTimerController, TickHandle, TimerEvent};
use crate::runtime::{SessionEvent, TimerCommand};
use crate::tree;

pub type UpdateCallback = Box<dyn FnMut(&Workout)>;

pub struct WorkoutSession {
    workout: Workout,
    config: Config,
    grouping: GroupingState,
    drag: DragSession,
    timer: RestTimerController,
    on_update: Option<UpdateCallback>,
}

impl std::fmt::Debug for WorkoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkoutSession")
            .field("workout", &self.workout.id)
            .field("grouping", &self.grouping)
            .field("drag", self.drag.phase())
            .field("timer", &self.timer.active())
            .finish()
    }
}

impl WorkoutSession {
    pub fn new(workout: Workout, config: Config) -> Self {
        Self {
            workout,
            config,
            grouping: GroupingState::default(),
            drag: DragSession::new(),
            timer: RestTimerController::new(),
            on_update: None,
        }
    }

    pub fn on_update(mut self, f: impl FnMut(&Workout) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn workout(&self) -> &Workout {
        &self.workout
    }

    pub fn into_workout(self) -> Workout {
        self.workout
    }

    pub fn items(&self) -> &[ExerciseItem] {
        &self.workout.exercises
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grouping(&self) -> &GroupingState {
        &self.grouping
    }

    pub fn drag(&self) -> &DragSession {
        &self.drag
    }

    pub fn rest_timer(&self) -> Option<&RestTimer> {
        self.timer.active()
    }

    pub fn tick_handle(&self) -> Option<TickHandle> {
        self.timer.handle()
    }

    pub fn take_timer_events(&mut self) -> Vec<TimerEvent> {
        self.timer.take_events()
    }

    /// Swaps in a new tree. Returns false, without notifying, when it equals
    /// the current one.
    fn commit(&mut self, next: Vec<ExerciseItem>) -> bool {
        if next == self.workout.exercises {
            trace!("no change, nothing committed");
            return false;
        }
        self.workout.exercises = next;
        self.notify();
        true
    }

    fn notify(&mut self) {
        if let Some(cb) = self.on_update.as_mut() {
            cb(&self.workout);
        }
    }

    // ---- tree edits ----

    pub fn add_exercise(&mut self, exercise: Exercise) -> String {
        let id = exercise.instance_id.clone();
        let next = tree::add_exercise(self.items(), exercise);
        self.commit(next);
        id
    }

    pub fn add_exercise_to_group(&mut self, group_id: &str, exercise: Exercise) -> bool {
        let next = tree::add_exercise_to_group(self.items(), group_id, exercise);
        self.commit(next)
    }

    pub fn update_exercise<F>(&mut self, instance_id: &str, f: F) -> bool
    where
        F: FnOnce(Exercise) -> Exercise,
    {
        let next = tree::update(self.items(), instance_id, f);
        self.commit(next)
    }

    /// Deletes an exercise, or a whole group when `id` names one
    pub fn delete(&mut self, id: &str) -> bool {
        let next = self.timer.delete_exercise(&self.workout.exercises, id);
        self.commit(next)
    }

    pub fn duplicate(&mut self, instance_id: &str) -> bool {
        let next = tree::duplicate(self.items(), instance_id);
        self.commit(next)
    }

    /// Appends a set; a set without a rest period gets the configured default
    pub fn add_set(&mut self, exercise_id: &str, mut set: Set) -> Option<SetRef> {
        if set.rest_period_seconds.is_none() && self.config.default_rest_seconds > 0 {
            set.rest_period_seconds = Some(self.config.default_rest_seconds);
        }
        let set_ref = SetRef::new(exercise_id, set.id.clone());
        let next = tree::add_set(self.items(), exercise_id, set);
        self.commit(next).then_some(set_ref)
    }

    pub fn update_set<F>(&mut self, set: &SetRef, f: F) -> bool
    where
        F: FnOnce(Set) -> Set,
    {
        let next = tree::update_set(self.items(), set, f);
        self.commit(next)
    }

    pub fn delete_set(&mut self, set: &SetRef) -> bool {
        let next = self.timer.delete_set(&self.workout.exercises, set);
        self.commit(next)
    }

    pub fn toggle_set_completed(&mut self, set: &SetRef, now: Instant) -> bool {
        let auto_start = self.config.auto_start_rest_timer;
        let next = self
            .timer
            .toggle_set(&self.workout.exercises, set, auto_start, now);
        self.commit(next)
    }

    pub fn set_rest_period(&mut self, set: &SetRef, seconds: u32) -> bool {
        let next = self
            .timer
            .set_rest_period(&self.workout.exercises, set, seconds);
        self.commit(next)
    }

    pub fn add_note(&mut self, text: impl Into<String>) {
        self.workout.session_notes.push(Note::new(text));
        self.notify();
    }

    pub fn finish(&mut self) {
        if self.workout.ended_at.is_some() {
            return;
        }
        self.timer.cancel();
        self.workout.finish();
        self.notify();
    }

    // ---- rest timer ----

    pub fn start_rest_timer(&mut self, set: &SetRef, seconds: u32, now: Instant) {
        let next = self.timer.start(&self.workout.exercises, set, seconds, now);
        self.commit(next);
    }

    pub fn tick(&mut self, handle: TickHandle, now: Instant) {
        let next = self.timer.tick(&self.workout.exercises, handle, now);
        self.commit(next);
    }

    /// Ticks whatever timer is live, if any
    pub fn tick_active(&mut self, now: Instant) {
        if let Some(handle) = self.timer.handle() {
            self.tick(handle, now);
        }
    }

    pub fn pause_rest_timer(&mut self, now: Instant) {
        self.timer.pause(now);
    }

    pub fn resume_rest_timer(&mut self, now: Instant) {
        self.timer.resume(now);
    }

    pub fn toggle_rest_pause(&mut self, now: Instant) {
        match self.timer.active().map(|t| t.is_paused) {
            Some(true) => self.timer.resume(now),
            Some(false) => self.timer.pause(now),
            None => {}
        }
    }

    /// Moves the timer by `steps` configured adjustment steps
    pub fn adjust_rest_timer(&mut self, steps: i32, now: Instant) {
        let delta = steps.saturating_mul(self.config.adjust_step());
        self.timer.adjust(delta, now);
    }

    pub fn cancel_rest_timer(&mut self) {
        self.timer.cancel();
    }

    /// Ends the rest early; it counts as taken
    pub fn skip_rest_timer(&mut self) {
        let Some(set) = self.timer.active().map(RestTimer::set_ref) else {
            return;
        };
        self.timer.cancel();
        let next = tree::update_set(self.items(), &set, |mut s| {
            s.rest_timer_completed = true;
            s
        });
        self.commit(next);
    }

    // ---- grouping ----

    pub fn begin_new_dropset(&mut self, exercise_id: &str) {
        self.grouping.begin_new_dropset(exercise_id);
    }

    pub fn begin_edit_dropset(&mut self, exercise_id: &str, drop_set_id: &str) -> bool {
        self.grouping
            .begin_edit_dropset(&self.workout.exercises, exercise_id, drop_set_id)
    }

    pub fn begin_new_group(&mut self, group_type: GroupType) {
        self.grouping.begin_new_group(group_type);
    }

    pub fn begin_edit_group(&mut self, group_id: &str) -> bool {
        self.grouping
            .begin_edit_group(&self.workout.exercises, group_id)
    }

    pub fn toggle_selection(&mut self, id: &str) -> bool {
        self.grouping.toggle(&self.workout.exercises, id)
    }

    pub fn set_dropset_type(&mut self, kind: Option<DropSetType>) {
        self.grouping.set_dropset_type(kind);
    }

    pub fn set_group_type(&mut self, group_type: GroupType) {
        self.grouping.set_group_type(group_type);
    }

    pub fn commit_selection(&mut self) -> bool {
        match self.grouping.commit(&self.workout.exercises) {
            Some(next) => self.commit(next),
            None => false,
        }
    }

    pub fn commit_selection_into(&mut self, target_drop_set_id: &str) -> bool {
        match self
            .grouping
            .commit_into_dropset(&self.workout.exercises, target_drop_set_id)
        {
            Some(next) => self.commit(next),
            None => false,
        }
    }

    pub fn cancel_selection(&mut self) {
        self.grouping.cancel();
    }

    pub fn ungroup(&mut self, group_id: &str) -> bool {
        let next = grouping::ungroup(self.items(), group_id);
        self.commit(next)
    }

    pub fn dissolve_dropset(&mut self, exercise_id: &str, drop_set_id: &str) -> bool {
        let next = grouping::dissolve_dropset(self.items(), exercise_id, drop_set_id);
        self.commit(next)
    }

    // ---- drag ----

    pub fn flat_items(&self) -> Vec<DragItem> {
        self.drag.flat_items(self.items())
    }

    pub fn press(&mut self, key: impl Into<String>, at: Point) {
        self.drag.press(key, at);
    }

    pub fn long_press_exercise(&mut self, instance_id: &str) -> Vec<DragEffect> {
        self.drag.long_press_exercise(instance_id)
    }

    pub fn long_press_group(&mut self, group_id: &str) -> Vec<DragEffect> {
        self.drag.long_press_group(&self.workout.exercises, group_id)
    }

    pub fn layout_settled(&mut self, layout: &LayoutSnapshot) -> Vec<DragEffect> {
        self.drag.layout_settled(&self.workout.exercises, layout)
    }

    pub fn pointer_moved(&mut self, at: Point) {
        self.drag.pointer_moved(at);
    }

    pub fn drop(&mut self, new_order: &[DragItem]) -> bool {
        match self.drag.drop(new_order) {
            Some(next) => self.commit(next),
            None => false,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Commits a reordered flat list directly, for keyboard moves with no
    /// gesture behind them
    pub fn reorder(&mut self, new_order: &[DragItem]) -> bool {
        if !self.drag.is_idle() {
            return false;
        }
        self.commit(from_flat_drag_list(new_order))
    }

    // ---- runner events ----

    /// Applies one runner event to the rest timer. Returns false once no
    /// timer is live.
    pub fn handle_event(&mut self, event: &SessionEvent, now: Instant) -> bool {
        match event {
            SessionEvent::Tick => self.tick_active(now),
            SessionEvent::Timer(cmd) => match cmd {
                TimerCommand::TogglePause => self.toggle_rest_pause(now),
                TimerCommand::Add => self.adjust_rest_timer(1, now),
                TimerCommand::Subtract => self.adjust_rest_timer(-1, now),
                TimerCommand::Skip => self.skip_rest_timer(),
                TimerCommand::Quit => self.cancel_rest_timer(),
            },
            SessionEvent::Key(_) => {}
        }
        self.timer.active().is_some()
    }
}
