use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use prosthetic_core::input::{FingerState, FingerUpdate, InputMode};
use prosthetic_core::platform::ElementId;
use prosthetic_core::types::Point;
use serde::Serialize;

use crate::error::{HandError, MotionError};
use crate::movement::{Easing, Movement};

/// Hand-scoped finger identifier, assigned in growth order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize)]
pub struct FingerId(u32);

impl FingerId {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for FingerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Net effect of one tick on one finger.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Idle,
    Move,
    Down,
    Up,
}

/// Per-tick report of a single finger.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub finger: FingerId,
    pub mode: InputMode,
    pub state: FingerState,
    /// Touch target captured on press; always `None` for mouse and pointer fingers.
    pub target: Option<ElementId>,
}

/// Notifications a finger sends to the hand that grew it.
pub(crate) trait FingerObserver: Send + Sync {
    /// Fails when the hand no longer accepts input.
    fn ensure_accepting(&self, finger: FingerId) -> Result<(), HandError>;
    fn now(&self) -> Duration;
    fn finger_is_busy(&self, finger: FingerId);
    fn finger_is_idle(&self, finger: FingerId);
}

#[derive(Debug)]
struct Scheduled {
    movement: Movement,
    until: Duration,
}

/// Outcome of one tick for one finger, computed before it is applied.
#[derive(Debug)]
pub(crate) struct Staged {
    completed: usize,
    state: FingerState,
    queue_start: Duration,
    target: Option<ElementId>,
    pub(crate) transition: Option<Transition>,
}

/// Movement queue and state of a single finger.
#[derive(Debug)]
pub(crate) struct Timeline {
    id: FingerId,
    mode: InputMode,
    state: FingerState,
    /// State the finger will have once every queued movement has run.
    pending: FingerState,
    queue: VecDeque<Scheduled>,
    /// Start of the head movement.
    queue_start: Duration,
    /// Completion time of the last queued movement.
    queue_end: Duration,
    target: Option<ElementId>,
}

impl Timeline {
    pub(crate) fn new(id: FingerId, mode: InputMode, state: FingerState, now: Duration) -> Self {
        Self {
            id,
            mode,
            state,
            pending: state,
            queue: VecDeque::new(),
            queue_start: now,
            queue_end: now,
            target: None,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn next_completion(&self) -> Option<Duration> {
        self.queue.front().map(|head| head.until)
    }

    /// Queue end, or `now` for an idle finger.
    pub(crate) fn queue_end_from(&self, now: Duration) -> Duration {
        if self.is_idle() { now } else { self.queue_end }
    }

    pub(crate) fn enqueue(&mut self, movement: Movement, now: Duration) -> Result<(), MotionError> {
        if !movement.final_state().is_finite() {
            return Err(MotionError::NonFiniteState);
        }
        let base = self.queue_end_from(now);
        let until = base.checked_add(movement.duration()).ok_or(MotionError::Overflow)?;

        if self.is_idle() {
            self.queue_start = now;
        }
        self.pending = self.pending.with(movement.final_state());
        self.queue.push_back(Scheduled { movement, until });
        self.queue_end = until;
        Ok(())
    }

    /// Drops every queued movement. A pressed finger is released right away.
    pub(crate) fn reset(&mut self, now: Duration) {
        self.queue.clear();
        self.pending = self.state;
        self.queue_start = now;
        self.queue_end = now;
        if self.state.down {
            self.pending.down = false;
            self.queue.push_back(Scheduled {
                movement: Movement::instant(FingerUpdate::new().down(false)),
                until: now,
            });
        }
    }

    /// Resolves the queue against `now` and commits the result.
    #[cfg(test)]
    pub(crate) fn advance(
        &mut self,
        now: Duration,
        single_step: bool,
        resolve: &dyn Fn(Point) -> Result<ElementId, HandError>,
    ) -> Result<Option<Transition>, HandError> {
        let staged = self.stage(now, single_step, resolve)?;
        let transition = staged.transition.clone();
        self.commit(staged);
        Ok(transition)
    }

    /// Works out what a tick at `now` does to this finger without touching the
    /// timeline. Nothing changes when resolving the touch target fails.
    ///
    /// A movement that flips the pressed flag ends resolution for this tick, so
    /// presses and releases are never merged with each other or with later moves.
    pub(crate) fn stage(
        &self,
        now: Duration,
        single_step: bool,
        resolve: &dyn Fn(Point) -> Result<ElementId, HandError>,
    ) -> Result<Staged, HandError> {
        let previous = self.state;
        let mut state = previous;
        let mut queue_start = self.queue_start;
        let mut completed = 0;
        let mut changed = false;
        let mut exhausted = false;

        for head in &self.queue {
            if head.until > now {
                break;
            }
            let update = head.movement.final_state();
            changed |= update.differs_from(&state);
            update.apply_to(&mut state);
            queue_start = head.until;
            completed += 1;
            if single_step || state.down != previous.down {
                exhausted = true;
                break;
            }
        }

        if !exhausted && let Some(head) = self.queue.get(completed) {
            let elapsed = now.saturating_sub(queue_start);
            if let Some(update) = head.movement.interpolate(elapsed)
                && update.differs_from(&state)
            {
                update.apply_to(&mut state);
                changed = true;
            }
        }

        let kind = match (previous.down, state.down) {
            (false, true) => TransitionKind::Down,
            (true, false) => TransitionKind::Up,
            _ if changed => TransitionKind::Move,
            _ => TransitionKind::Idle,
        };

        let (target, next_target) = if self.mode == InputMode::Touch {
            match kind {
                TransitionKind::Down => {
                    let element = resolve(state.position())?;
                    (Some(element), Some(element))
                }
                TransitionKind::Up => (self.target, None),
                TransitionKind::Move | TransitionKind::Idle => (self.target, self.target),
            }
        } else {
            (None, None)
        };

        let transition = (self.mode != InputMode::Touch || target.is_some())
            .then(|| Transition { kind, finger: self.id, mode: self.mode, state, target });
        Ok(Staged { completed, state, queue_start, target: next_target, transition })
    }

    pub(crate) fn commit(&mut self, staged: Staged) {
        self.queue.drain(..staged.completed);
        self.state = staged.state;
        self.queue_start = staged.queue_start;
        self.target = staged.target;
    }

    #[cfg(test)]
    fn untils(&self) -> Vec<Duration> {
        self.queue.iter().map(|scheduled| scheduled.until).collect()
    }
}

/// Handle to a finger grown by a [`Hand`](crate::Hand).
///
/// Every queueing method returns `&Self` so calls chain with `?`:
///
/// ```ignore
/// mouse.wait(ms(25))?.move_to(1.0, 50.0, ms(500))?.down()?.move_by(400.0, 0.0, ms(500))?.up()?;
/// ```
#[derive(Clone)]
pub struct Finger {
    id: FingerId,
    mode: InputMode,
    timeline: Arc<Mutex<Timeline>>,
    owner: Weak<dyn FingerObserver>,
}

impl Finger {
    pub(crate) fn new(timeline: Timeline, owner: Weak<dyn FingerObserver>) -> Self {
        Self { id: timeline.id, mode: timeline.mode, timeline: Arc::new(Mutex::new(timeline)), owner }
    }

    pub fn id(&self) -> FingerId {
        self.id
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// State as of the last tick.
    pub fn state(&self) -> FingerState {
        self.lock().state
    }

    /// State once every queued movement has run.
    pub fn pending_state(&self) -> FingerState {
        self.lock().pending
    }

    /// Completion time of the head movement, `None` when idle.
    pub fn next_completion(&self) -> Option<Duration> {
        self.lock().next_completion()
    }

    /// Completion time of the last queued movement, `None` when idle.
    pub fn queue_end(&self) -> Option<Duration> {
        let timeline = self.lock();
        (!timeline.is_idle()).then_some(timeline.queue_end)
    }

    /// Queues an arbitrary movement.
    pub fn enqueue(&self, movement: Movement) -> Result<&Self, HandError> {
        self.schedule(|_, _| Ok(movement))
    }

    pub fn wait(&self, duration: Duration) -> Result<&Self, HandError> {
        self.enqueue(Movement::wait(duration))
    }

    /// Waits until the absolute host timestamp `at`; no-op if the queue already
    /// runs past it.
    pub fn wait_until(&self, at: Duration) -> Result<&Self, HandError> {
        self.schedule(|timeline, now| {
            Ok(Movement::wait(at.saturating_sub(timeline.queue_end_from(now))))
        })
    }

    pub fn down(&self) -> Result<&Self, HandError> {
        self.update(FingerUpdate::new().down(true))
    }

    /// Presses once `delay` has elapsed.
    pub fn down_after(&self, delay: Duration) -> Result<&Self, HandError> {
        self.update_after(FingerUpdate::new().down(true), delay)
    }

    pub fn up(&self) -> Result<&Self, HandError> {
        self.update(FingerUpdate::new().down(false))
    }

    pub fn up_after(&self, delay: Duration) -> Result<&Self, HandError> {
        self.update_after(FingerUpdate::new().down(false), delay)
    }

    /// Changes attributes such as pressure or tilt without moving.
    pub fn update(&self, update: FingerUpdate) -> Result<&Self, HandError> {
        self.enqueue(Movement::instant(update))
    }

    pub fn update_after(&self, update: FingerUpdate, delay: Duration) -> Result<&Self, HandError> {
        self.enqueue(Movement::hold(update, delay))
    }

    pub fn move_to(&self, x: f64, y: f64, duration: Duration) -> Result<&Self, HandError> {
        self.move_to_with(x, y, duration, Easing::Linear)
    }

    pub fn move_to_with(
        &self,
        x: f64,
        y: f64,
        duration: Duration,
        easing: Easing,
    ) -> Result<&Self, HandError> {
        self.schedule(|timeline, _| {
            Movement::line(timeline.pending.position(), Point::new(x, y), duration, easing)
        })
    }

    pub fn move_by(&self, dx: f64, dy: f64, duration: Duration) -> Result<&Self, HandError> {
        self.move_by_with(dx, dy, duration, Easing::Linear)
    }

    pub fn move_by_with(
        &self,
        dx: f64,
        dy: f64,
        duration: Duration,
        easing: Easing,
    ) -> Result<&Self, HandError> {
        self.schedule(|timeline, _| {
            let from = timeline.pending.position();
            Movement::line(from, from.offset(dx, dy), duration, easing)
        })
    }

    /// Drops every queued movement and lifts the finger if it is pressed.
    pub fn reset(&self) -> Result<&Self, HandError> {
        let owner = self.owner()?;
        owner.ensure_accepting(self.id)?;
        let now = owner.now();
        let (was_idle, is_idle) = {
            let mut timeline = self.lock();
            let was_idle = timeline.is_idle();
            timeline.reset(now);
            (was_idle, timeline.is_idle())
        };
        notify(owner.as_ref(), self.id, was_idle, is_idle);
        Ok(self)
    }

    fn schedule(
        &self,
        build: impl FnOnce(&Timeline, Duration) -> Result<Movement, MotionError>,
    ) -> Result<&Self, HandError> {
        let owner = self.owner()?;
        owner.ensure_accepting(self.id)?;
        let now = owner.now();
        let became_busy = {
            let mut timeline = self.lock();
            let was_idle = timeline.is_idle();
            let movement = build(&timeline, now)?;
            timeline.enqueue(movement, now)?;
            was_idle
        };
        if became_busy {
            owner.finger_is_busy(self.id);
        }
        Ok(self)
    }

    fn owner(&self) -> Result<Arc<dyn FingerObserver>, HandError> {
        self.owner.upgrade().ok_or(HandError::OwnerReleased(self.id))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn notify(owner: &dyn FingerObserver, finger: FingerId, was_idle: bool, is_idle: bool) {
    match (was_idle, is_idle) {
        (true, false) => owner.finger_is_busy(finger),
        (false, true) => owner.finger_is_idle(finger),
        _ => {}
    }
}

impl std::fmt::Debug for Finger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finger").field("id", &self.id).field("mode", &self.mode).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosthetic_core::platform::{PlatformError, PlatformErrorKind};
    use rstest::rstest;

    const ROOT: ElementId = ElementId::new(0);
    const BUTTON: ElementId = ElementId::new(7);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn resolve_button(_: Point) -> Result<ElementId, HandError> {
        Ok(BUTTON)
    }

    fn timeline(mode: InputMode) -> Timeline {
        let state = FingerState { pointer_kind: mode.default_pointer_kind(), ..FingerState::default() };
        Timeline::new(FingerId::new(0), mode, state, Duration::ZERO)
    }

    fn line(from: (f64, f64), to: (f64, f64), duration: u64) -> Movement {
        Movement::line(from.into(), to.into(), ms(duration), Easing::Linear).unwrap()
    }

    fn kind_at(timeline: &mut Timeline, now: u64, single_step: bool) -> TransitionKind {
        timeline.advance(ms(now), single_step, &resolve_button).unwrap().unwrap().kind
    }

    #[rstest]
    fn enqueue_chains_movements_back_to_back() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::wait(ms(25)), ms(3)).unwrap();
        timeline.enqueue(line((0.0, 0.0), (10.0, 0.0), 100), ms(10)).unwrap();
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(11)).unwrap();

        assert_eq!(timeline.untils(), vec![ms(28), ms(128), ms(128)]);
        assert_eq!(timeline.next_completion(), Some(ms(28)));
        assert!(timeline.pending.down);
        assert_eq!(timeline.pending.x, 10.0);
        assert!(!timeline.state.down);
    }

    #[rstest]
    fn idle_queue_re_anchors_at_now() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::wait(ms(10)), ms(0)).unwrap();
        timeline.advance(ms(10), false, &resolve_button).unwrap();
        assert!(timeline.is_idle());

        timeline.enqueue(Movement::wait(ms(10)), ms(50)).unwrap();
        assert_eq!(timeline.untils(), vec![ms(60)]);
    }

    #[rstest]
    fn enqueue_rejects_overflow_without_mutating() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::wait(ms(10)), ms(0)).unwrap();
        let err = timeline.enqueue(Movement::wait(Duration::MAX), ms(0)).unwrap_err();

        assert_eq!(err, MotionError::Overflow);
        assert_eq!(timeline.untils(), vec![ms(10)]);
    }

    #[rstest]
    fn enqueue_rejects_non_finite_updates() {
        let mut timeline = timeline(InputMode::Mouse);
        let movement = Movement::instant(FingerUpdate::new().pressure(f64::NAN));
        assert_eq!(timeline.enqueue(movement, ms(0)), Err(MotionError::NonFiniteState));
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn interpolation_reports_moves_until_completion() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(line((0.0, 0.0), (100.0, 0.0), 100), ms(0)).unwrap();

        assert_eq!(kind_at(&mut timeline, 0, false), TransitionKind::Idle);
        assert_eq!(kind_at(&mut timeline, 50, false), TransitionKind::Move);
        assert_eq!(timeline.state.x, 50.0);
        assert_eq!(kind_at(&mut timeline, 50, false), TransitionKind::Idle);
        assert_eq!(kind_at(&mut timeline, 120, false), TransitionKind::Move);
        assert_eq!(timeline.state.x, 100.0);
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn press_beats_move_in_the_same_tick() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(line((0.0, 0.0), (30.0, 0.0), 10), ms(0)).unwrap();
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(0)).unwrap();

        let transition = timeline.advance(ms(40), false, &resolve_button).unwrap().unwrap();
        assert_eq!(transition.kind, TransitionKind::Down);
        assert_eq!(transition.state.position(), Point::new(30.0, 0.0));
    }

    #[rstest]
    fn press_flip_stops_resolution_for_the_tick() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(0)).unwrap();
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(false)), ms(0)).unwrap();

        assert_eq!(kind_at(&mut timeline, 5, false), TransitionKind::Down);
        assert_eq!(kind_at(&mut timeline, 5, false), TransitionKind::Up);
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn single_step_resolves_one_change_per_tick() {
        let mut timeline = timeline(InputMode::Pointer);
        timeline.enqueue(Movement::instant(FingerUpdate::new().pressure(0.3)), ms(0)).unwrap();
        timeline.enqueue(Movement::instant(FingerUpdate::new().pressure(0.7)), ms(0)).unwrap();

        assert_eq!(kind_at(&mut timeline, 0, true), TransitionKind::Move);
        assert_eq!(timeline.state.pressure, 0.3);
        assert_eq!(kind_at(&mut timeline, 0, true), TransitionKind::Move);
        assert_eq!(timeline.state.pressure, 0.7);
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn full_step_coalesces_attribute_updates() {
        let mut timeline = timeline(InputMode::Pointer);
        timeline.enqueue(Movement::instant(FingerUpdate::new().pressure(0.3)), ms(0)).unwrap();
        timeline.enqueue(Movement::instant(FingerUpdate::new().pressure(0.7)), ms(0)).unwrap();

        assert_eq!(kind_at(&mut timeline, 0, false), TransitionKind::Move);
        assert_eq!(timeline.state.pressure, 0.7);
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn waits_do_not_report_moves() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::wait(ms(25)), ms(0)).unwrap();
        assert_eq!(kind_at(&mut timeline, 20, false), TransitionKind::Idle);
        assert_eq!(kind_at(&mut timeline, 40, false), TransitionKind::Idle);
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn touch_captures_target_on_press_and_drops_it_after_release() {
        let mut timeline = timeline(InputMode::Touch);
        assert!(timeline.advance(ms(0), false, &resolve_button).unwrap().is_none());

        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(0)).unwrap();
        let down = timeline.advance(ms(0), false, &resolve_button).unwrap().unwrap();
        assert_eq!((down.kind, down.target), (TransitionKind::Down, Some(BUTTON)));

        let idle = timeline.advance(ms(1), false, &|_| Ok(ROOT)).unwrap().unwrap();
        assert_eq!((idle.kind, idle.target), (TransitionKind::Idle, Some(BUTTON)));

        timeline.enqueue(Movement::instant(FingerUpdate::new().down(false)), ms(2)).unwrap();
        let up = timeline.advance(ms(2), false, &resolve_button).unwrap().unwrap();
        assert_eq!((up.kind, up.target), (TransitionKind::Up, Some(BUTTON)));

        timeline.enqueue(line((0.0, 0.0), (5.0, 5.0), 0), ms(3)).unwrap();
        assert!(timeline.advance(ms(3), false, &resolve_button).unwrap().is_none());
    }

    #[rstest]
    fn mouse_fingers_never_capture_targets() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(0)).unwrap();
        let down = timeline.advance(ms(0), false, &resolve_button).unwrap().unwrap();
        assert_eq!(down.target, None);
    }

    #[rstest]
    fn failed_target_lookup_keeps_the_press_queued() {
        let mut timeline = timeline(InputMode::Touch);
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(0)).unwrap();
        let miss = |_: Point| -> Result<ElementId, HandError> {
            Err(PlatformError::new(PlatformErrorKind::NoElement, "nothing here").into())
        };

        assert!(timeline.advance(ms(5), false, &miss).is_err());
        assert!(!timeline.state.down);
        assert_eq!(timeline.target, None);
        assert_eq!(timeline.untils(), vec![ms(0)]);

        let down = timeline.advance(ms(10), false, &resolve_button).unwrap().unwrap();
        assert_eq!((down.kind, down.target), (TransitionKind::Down, Some(BUTTON)));
        assert!(timeline.is_idle());
    }

    #[rstest]
    fn reset_releases_a_pressed_finger() {
        let mut timeline = timeline(InputMode::Mouse);
        timeline.enqueue(Movement::instant(FingerUpdate::new().down(true)), ms(0)).unwrap();
        timeline.advance(ms(0), false, &resolve_button).unwrap();
        timeline.enqueue(line((0.0, 0.0), (90.0, 0.0), 300), ms(0)).unwrap();

        timeline.reset(ms(10));
        assert_eq!(timeline.untils(), vec![ms(10)]);
        assert!(!timeline.pending.down);
        assert_eq!(kind_at(&mut timeline, 10, false), TransitionKind::Up);
        assert!(timeline.is_idle());
    }

    #[rstest]
    #[case(vec![(10.0, 0.0), (5.0, -3.0), (-20.0, 8.0)], 30)]
    #[case(vec![(1.0, 1.0); 12], 7)]
    #[case(vec![(400.0, 0.0)], 1000)]
    fn chained_relative_moves_sum_their_deltas(
        #[case] deltas: Vec<(f64, f64)>,
        #[case] step: u64,
    ) {
        let mut timeline = timeline(InputMode::Mouse);
        for (dx, dy) in &deltas {
            let from = timeline.pending.position();
            let movement =
                Movement::line(from, from.offset(*dx, *dy), ms(40), Easing::SmoothStep).unwrap();
            timeline.enqueue(movement, ms(0)).unwrap();
        }

        let mut now = 0;
        let mut previous_untils = timeline.untils();
        while !timeline.is_idle() {
            now += step;
            timeline.advance(ms(now), false, &resolve_button).unwrap();
            let untils = timeline.untils();
            assert!(untils.windows(2).all(|pair| pair[0] <= pair[1]));
            assert!(previous_untils.ends_with(&untils));
            previous_untils = untils;
        }

        let expected_x: f64 = deltas.iter().map(|(dx, _)| dx).sum();
        let expected_y: f64 = deltas.iter().map(|(_, dy)| dy).sum();
        assert_eq!(timeline.state.position(), Point::new(expected_x, expected_y));
    }
}
