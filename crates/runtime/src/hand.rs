use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use prosthetic_core::input::{FingerState, FingerUpdate, InputMode};
use prosthetic_core::platform::{
    ElementId, Host, PlatformError, PlatformErrorKind, ScheduledTask, SyntheticEvent, TimerId,
    hosts,
};
use prosthetic_core::types::Point;
use tracing::{debug, error, trace, warn};

use crate::aggregate::{ComposeContext, Dispatch, TickReport, compose};
use crate::config::{FallbackPolicy, HandConfig};
use crate::error::{HandError, MotionError};
use crate::finger::{Finger, FingerId, FingerObserver, Timeline, Transition, TransitionKind};
use crate::timing::TimingPolicy;

/// Start/stop notification, invoked with the hand whose fingers started or
/// stopped moving.
pub type LifecycleCallback = Arc<dyn Fn(&Hand) + Send + Sync>;

/// Coordinates a set of fingers against one host.
///
/// The hand is idle while every finger's queue is empty. As soon as one finger
/// gets work the hand turns busy, fires its start callback and schedules ticks
/// according to its [`TimingPolicy`]. Each tick advances all fingers in growth
/// order and delivers the resulting events. When the last queue drains the
/// stop callback fires and no further tick is scheduled.
///
/// `Hand` is a cheap handle; clones share the same coordinator. Dropping the
/// last handle revokes any pending tick and releases the fingers.
#[derive(Clone)]
pub struct Hand {
    shared: Arc<HandShared>,
}

/// Builder for a [`Hand`] with lifecycle callbacks.
pub struct HandBuilder {
    host: HostRef,
    config: HandConfig,
    on_start: Option<LifecycleCallback>,
    on_stop: Option<LifecycleCallback>,
}

impl HandBuilder {
    fn new(host: HostRef) -> Self {
        Self { host, config: HandConfig::default(), on_start: None, on_stop: None }
    }

    pub fn config(mut self, config: HandConfig) -> Self {
        self.config = config;
        self
    }

    pub fn timing(mut self, timing: TimingPolicy) -> Self {
        self.config.timing = timing;
        self
    }

    /// Called once per idle to busy edge.
    pub fn on_start(mut self, callback: impl Fn(&Hand) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(callback));
        self
    }

    /// Called once per busy to idle edge.
    pub fn on_stop(mut self, callback: impl Fn(&Hand) + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Hand {
        debug!(host = self.host.name(), timing = %self.config.timing, "creating hand");
        let shared = Arc::new_cyclic(|self_ref| HandShared {
            config: self.config,
            host: self.host,
            on_start: self.on_start,
            on_stop: self.on_stop,
            self_ref: self_ref.clone(),
            state: Mutex::new(HandState::default()),
        });
        Hand { shared }
    }
}

impl Hand {
    pub fn new(host: Arc<dyn Host>, config: HandConfig) -> Self {
        Self::builder(host).config(config).build()
    }

    pub fn builder(host: Arc<dyn Host>) -> HandBuilder {
        HandBuilder::new(HostRef::Shared(host))
    }

    /// Builder bound to the first host registered through `register_host!`.
    pub fn builder_for_registered_host() -> Result<HandBuilder, HandError> {
        let host = hosts().next().ok_or(HandError::MissingHost)?;
        Ok(HandBuilder::new(HostRef::Static(host)))
    }

    pub fn with_registered_host(config: HandConfig) -> Result<Self, HandError> {
        Ok(Self::builder_for_registered_host()?.config(config).build())
    }

    pub fn config(&self) -> &HandConfig {
        &self.shared.config
    }

    pub fn host_name(&self) -> &'static str {
        self.shared.host.name()
    }

    /// Current host time.
    pub fn now(&self) -> Duration {
        self.shared.host.now()
    }

    /// Adds a finger in `mode`, starting from the mode's default state with
    /// `overrides` applied.
    pub fn grow_finger(&self, mode: InputMode, overrides: FingerUpdate) -> Result<Finger, HandError> {
        if !overrides.is_finite() {
            return Err(MotionError::NonFiniteState.into());
        }
        let state = FingerState { pointer_kind: mode.default_pointer_kind(), ..FingerState::default() }
            .with(&overrides);
        let now = self.shared.host.now();

        let mut hand = self.shared.lock();
        if hand.released {
            return Err(HandError::ShutDown);
        }
        let id = FingerId::new(hand.next_id);
        hand.next_id = hand.next_id.checked_add(1).ok_or(MotionError::Overflow)?;
        let owner: Weak<dyn FingerObserver> = self.shared.self_ref.clone();
        let finger = Finger::new(Timeline::new(id, mode, state, now), owner);
        if mode == InputMode::Pointer && hand.primary_pointer.is_none() {
            hand.primary_pointer = Some(id);
        }
        hand.fingers.push(finger.clone());
        debug!(finger = %id, %mode, "grew finger");
        Ok(finger)
    }

    /// Fingers in growth order.
    pub fn fingers(&self) -> Vec<Finger> {
        self.shared.lock().fingers.clone()
    }

    pub fn is_idle(&self) -> bool {
        self.shared.lock().idle
    }

    /// Lines up every finger: each one waits until the latest queue end among
    /// all fingers (or now, when all are idle) plus `extra`. Movements queued
    /// afterwards start at the same instant on every finger.
    pub fn sync(&self, extra: Duration) -> Result<(), HandError> {
        let fingers = self.fingers();
        let now = self.shared.host.now();
        let latest = fingers.iter().filter_map(Finger::queue_end).fold(now, Duration::max);
        let target = latest.checked_add(extra).ok_or(MotionError::Overflow)?;
        for finger in &fingers {
            finger.wait_until(target)?;
        }
        debug!(fingers = fingers.len(), target = ?target, "synchronized fingers");
        Ok(())
    }

    /// Advances every finger to `now` and delivers the resulting events.
    ///
    /// Ticks are normally driven by the host scheduler. Calling this directly
    /// steps a hand manually, mostly in tests. A failing tick faults the
    /// hand, see [`Hand::take_fault`].
    pub fn dispatch_tick(&self, now: Duration) -> Result<TickReport, HandError> {
        self.shared.tick(now, true)
    }

    /// Returns and clears the error that faulted the hand. Input is refused
    /// while a fault is pending; once taken, ticking resumes if fingers still
    /// have work.
    pub fn take_fault(&self) -> Option<HandError> {
        let mut hand = self.shared.lock();
        let fault = hand.fault.take()?;
        self.shared.schedule_next(&mut hand);
        Some(fault)
    }

    /// Revokes the pending tick and stops accepting input. Fingers report
    /// [`HandError::OwnerReleased`] afterwards and [`Hand::dispatch_tick`]
    /// fails with [`HandError::ShutDown`].
    pub fn shutdown(&self) {
        let mut hand = self.shared.lock();
        if hand.released {
            return;
        }
        hand.released = true;
        self.shared.cancel_pending(&mut hand);
        debug!(host = self.shared.host.name(), "hand shut down");
    }
}

impl Debug for Hand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hand = self.shared.lock();
        f.debug_struct("Hand")
            .field("host", &self.shared.host.name())
            .field("config", &self.shared.config)
            .field("fingers", &hand.fingers.len())
            .field("idle", &hand.idle)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum HostRef {
    Static(&'static dyn Host),
    Shared(Arc<dyn Host>),
}

impl Deref for HostRef {
    type Target = dyn Host;

    fn deref(&self) -> &Self::Target {
        match self {
            HostRef::Static(host) => *host,
            HostRef::Shared(host) => host.as_ref(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Edge {
    Started,
    Stopped,
}

struct PendingTick {
    timer: TimerId,
    token: u64,
    /// Completion time the tick was scheduled for, minimal policy only.
    due: Option<Duration>,
}

struct HandState {
    fingers: Vec<Finger>,
    busy: BTreeSet<FingerId>,
    next_id: u32,
    primary_pointer: Option<FingerId>,
    idle: bool,
    scheduled: Option<PendingTick>,
    next_token: u64,
    /// Edges are settled once the running tick finishes.
    ticking: bool,
    fault: Option<HandError>,
    released: bool,
}

impl Default for HandState {
    fn default() -> Self {
        Self {
            fingers: Vec::new(),
            busy: BTreeSet::new(),
            next_id: 0,
            primary_pointer: None,
            idle: true,
            scheduled: None,
            next_token: 0,
            ticking: false,
            fault: None,
            released: false,
        }
    }
}

impl HandState {
    /// Brings the idle flag in line with the busy set and reports the edge.
    fn settle(&mut self) -> Option<Edge> {
        let idle = self.busy.is_empty();
        if idle == self.idle {
            return None;
        }
        self.idle = idle;
        Some(if idle { Edge::Stopped } else { Edge::Started })
    }
}

struct HandShared {
    config: HandConfig,
    host: HostRef,
    on_start: Option<LifecycleCallback>,
    on_stop: Option<LifecycleCallback>,
    self_ref: Weak<HandShared>,
    state: Mutex<HandState>,
}

impl HandShared {
    fn lock(&self) -> MutexGuard<'_, HandState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self, now: Duration, reschedule: bool) -> Result<TickReport, HandError> {
        let (fingers, primary_pointer) = {
            let mut hand = self.lock();
            if hand.released {
                return Err(HandError::ShutDown);
            }
            if let Some(fault) = &hand.fault {
                return Err(HandError::Faulted(fault.to_string()));
            }
            hand.ticking = true;
            (hand.fingers.clone(), hand.primary_pointer)
        };

        let result = self.resolve_tick(now, &fingers, primary_pointer);

        let edge = {
            let mut hand = self.lock();
            hand.ticking = false;
            if let Err(err) = &result {
                hand.fault = Some(err.clone());
            }
            let edge = hand.settle();
            if edge == Some(Edge::Stopped) {
                self.cancel_pending(&mut hand);
            } else if reschedule {
                self.schedule_next(&mut hand);
            }
            edge
        };
        self.announce(edge);
        result
    }

    /// Stages every finger under its lock and composes the events. Timelines
    /// are only committed once targets and events resolved, so a failing tick
    /// leaves every finger as it was and a later tick retries the same work.
    fn resolve_tick(
        &self,
        now: Duration,
        fingers: &[Finger],
        primary_pointer: Option<FingerId>,
    ) -> Result<TickReport, HandError> {
        let single_step = self.config.timing.resolves_single_step();
        let resolve = |point: Point| self.resolve_target(point);

        let (mut transitions, composed, drained) = {
            let mut timelines: Vec<_> = fingers.iter().map(Finger::lock).collect();
            let mut staged = Vec::with_capacity(timelines.len());
            for timeline in &timelines {
                staged.push(timeline.stage(now, single_step, &resolve)?);
            }

            let transitions: Vec<Transition> =
                staged.iter().filter_map(|step| step.transition.clone()).collect();
            let context = ComposeContext {
                now,
                root: self.host.root(),
                primary_pointer,
                touch_end_target: self.config.touch_end_target,
                resolve: &resolve,
            };
            let composed = compose(&transitions, &context)?;

            let mut drained = Vec::new();
            for ((timeline, step), finger) in timelines.iter_mut().zip(staged).zip(fingers) {
                let was_idle = timeline.is_idle();
                timeline.commit(step);
                if !was_idle && timeline.is_idle() {
                    drained.push(finger.id());
                }
            }
            (transitions, composed, drained)
        };
        for finger in drained {
            self.finger_is_idle(finger);
        }

        let mut dispatched = Vec::new();
        for Dispatch { target, event } in composed {
            if let Some(target) = self.deliver(target, &event)? {
                dispatched.push(Dispatch { target, event });
            }
        }

        transitions.retain(|transition| transition.kind != TransitionKind::Idle);
        for transition in &transitions {
            trace!(
                finger = %transition.finger,
                kind = ?transition.kind,
                x = transition.state.x,
                y = transition.state.y,
                at = ?now,
                "finger transition"
            );
        }
        Ok(TickReport { at: now, transitions, dispatched })
    }

    fn resolve_target(&self, point: Point) -> Result<ElementId, HandError> {
        if let Some(element) = self.host.element_at(point) {
            return Ok(element);
        }
        match self.config.fallback {
            FallbackPolicy::RootTarget => {
                trace!(x = point.x(), y = point.y(), "no element under contact, using root");
                Ok(self.host.root())
            }
            FallbackPolicy::Abort => Err(PlatformError::new(
                PlatformErrorKind::NoElement,
                format!("nothing under ({}, {})", point.x(), point.y()),
            )
            .into()),
        }
    }

    /// Delivers `event`, returning the element that accepted it.
    fn deliver(
        &self,
        target: ElementId,
        event: &SyntheticEvent,
    ) -> Result<Option<ElementId>, HandError> {
        let err = match self.host.dispatch(target, event) {
            Ok(()) => return Ok(Some(target)),
            Err(err) => err,
        };
        if self.config.fallback == FallbackPolicy::Abort {
            return Err(err.into());
        }

        let root = self.host.root();
        if target != root {
            warn!(
                target = target.get(),
                event = event.type_name(),
                error = %err,
                "dispatch failed, falling back to root"
            );
            if self.host.dispatch(root, event).is_ok() {
                return Ok(Some(root));
            }
        }
        warn!(event = event.type_name(), error = %err, "dropping event the host refused");
        Ok(None)
    }

    /// Schedules the next tick when the hand is busy and nothing is pending.
    /// Under the minimal policy a pending tick is moved forward when a finger
    /// now completes earlier than it was scheduled for.
    fn schedule_next(&self, hand: &mut HandState) {
        if hand.idle || hand.released || hand.fault.is_some() {
            return;
        }
        let policy = self.config.timing;
        let soonest = soonest_completion(&hand.fingers);
        let due = if policy == TimingPolicy::Minimal { soonest } else { None };

        if let Some(current) = hand.scheduled.as_ref().map(|pending| pending.due) {
            match (current, due) {
                (Some(current), Some(earlier)) if earlier < current => self.cancel_pending(hand),
                _ => return,
            }
        }

        let token = hand.next_token;
        hand.next_token += 1;
        let task = self.task(token);
        let timer = match policy {
            TimingPolicy::Interval(interval) => self.host.schedule_after(interval, task),
            TimingPolicy::Frame | TimingPolicy::FastFrame => self.host.schedule_frame(task),
            TimingPolicy::Minimal => {
                let now = self.host.now();
                let delay = soonest.map_or(Duration::ZERO, |at| at.saturating_sub(now));
                self.host.schedule_after(delay, task)
            }
            TimingPolicy::Instant => self.host.schedule_after(Duration::ZERO, task),
        };
        trace!(timer = timer.get(), %policy, "scheduled tick");
        hand.scheduled = Some(PendingTick { timer, token, due });
    }

    fn cancel_pending(&self, hand: &mut HandState) {
        if let Some(pending) = hand.scheduled.take() {
            self.host.cancel(pending.timer);
            trace!(timer = pending.timer.get(), "revoked pending tick");
        }
    }

    fn task(&self, token: u64) -> ScheduledTask {
        let shared = self.self_ref.clone();
        Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.run_scheduled(token);
            }
        })
    }

    fn run_scheduled(&self, token: u64) {
        {
            let mut hand = self.lock();
            match &hand.scheduled {
                Some(pending) if pending.token == token => hand.scheduled = None,
                _ => {
                    trace!(token, "ignoring stale tick");
                    return;
                }
            }
        }

        let result = if self.config.timing == TimingPolicy::Instant {
            self.drain()
        } else {
            self.tick(self.tick_time(), true).map(drop)
        };
        if let Err(err) = result {
            error!(host = self.host.name(), error = %err, "tick failed, hand is faulted");
        }
    }

    /// Instant policy: tick at each successive completion time until the
    /// fingers run dry, without waiting on the host.
    fn drain(&self) -> Result<(), HandError> {
        loop {
            self.tick(self.tick_time(), false)?;
            let hand = self.lock();
            if hand.idle || hand.scheduled.is_some() || hand.fault.is_some() {
                return Ok(());
            }
        }
    }

    fn tick_time(&self) -> Duration {
        if self.config.timing.ticks_at_completion() {
            let fingers = self.lock().fingers.clone();
            if let Some(at) = soonest_completion(&fingers) {
                return at;
            }
        }
        self.host.now()
    }

    fn announce(&self, edge: Option<Edge>) {
        let Some(edge) = edge else { return };
        let Some(shared) = self.self_ref.upgrade() else { return };
        let hand = Hand { shared };
        let callback = match edge {
            Edge::Started => {
                debug!(host = self.host.name(), "movements started");
                &self.on_start
            }
            Edge::Stopped => {
                debug!(host = self.host.name(), "movements stopped");
                &self.on_stop
            }
        };
        if let Some(callback) = callback {
            callback(&hand);
        }
    }
}

impl FingerObserver for HandShared {
    fn ensure_accepting(&self, finger: FingerId) -> Result<(), HandError> {
        let hand = self.lock();
        if hand.released {
            return Err(HandError::OwnerReleased(finger));
        }
        match &hand.fault {
            Some(fault) => Err(HandError::Faulted(fault.to_string())),
            None => Ok(()),
        }
    }

    fn now(&self) -> Duration {
        self.host.now()
    }

    fn finger_is_busy(&self, finger: FingerId) {
        let edge = {
            let mut hand = self.lock();
            hand.busy.insert(finger);
            if hand.ticking {
                return;
            }
            let edge = hand.settle();
            self.schedule_next(&mut hand);
            edge
        };
        self.announce(edge);
    }

    fn finger_is_idle(&self, finger: FingerId) {
        let edge = {
            let mut hand = self.lock();
            hand.busy.remove(&finger);
            if hand.ticking {
                return;
            }
            let edge = hand.settle();
            if edge == Some(Edge::Stopped) {
                self.cancel_pending(&mut hand);
            }
            edge
        };
        self.announce(edge);
    }
}

impl Drop for HandShared {
    fn drop(&mut self) {
        let hand = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = hand.scheduled.take() {
            self.host.cancel(pending.timer);
        }
    }
}

fn soonest_completion(fingers: &[Finger]) -> Option<Duration> {
    fingers.iter().filter_map(Finger::next_completion).min()
}
