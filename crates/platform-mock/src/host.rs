use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use prosthetic_core::platform::{
    Capabilities, Clock, ConstructionStrategy, ElementId, EventSink, HitTester, Host,
    PlatformError, PlatformErrorKind, ScheduledTask, Scheduler, SyntheticEvent, TimerId,
};
use prosthetic_core::types::{Point, Rect};
use tracing::trace;

/// Element returned when no scene rectangle contains a point.
pub const ROOT_ELEMENT: ElementId = ElementId::new(0);

/// Upper bound for [`MockHost::run_until_idle`], guards against tasks that keep
/// rescheduling themselves.
const RUN_LIMIT: usize = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockSettings {
    /// Spacing of display frames; frame callbacks fire on multiples of it.
    pub frame_interval: Duration,
    pub start_time: Duration,
    pub capabilities: Capabilities,
}

impl MockSettings {
    pub const DEFAULT: Self = Self {
        frame_interval: Duration::from_millis(16),
        start_time: Duration::ZERO,
        capabilities: Capabilities::all(),
    };

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_start_time(mut self, start: Duration) -> Self {
        self.start_time = start;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl Default for MockSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One event the mock accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchRecord {
    /// Virtual time of delivery.
    pub at: Duration,
    pub target: ElementId,
    pub strategy: ConstructionStrategy,
    pub event: SyntheticEvent,
}

struct MockState {
    now: Duration,
    next_timer: u64,
    timers: BTreeMap<(Duration, TimerId), ScheduledTask>,
    scene: Vec<(ElementId, Rect)>,
    failing: Vec<ElementId>,
    log: Vec<DispatchRecord>,
}

impl MockState {
    const fn new(start: Duration) -> Self {
        Self {
            now: start,
            next_timer: 1,
            timers: BTreeMap::new(),
            scene: Vec::new(),
            failing: Vec::new(),
            log: Vec::new(),
        }
    }

    fn insert(&mut self, due: Duration, task: ScheduledTask) -> TimerId {
        let id = TimerId::new(self.next_timer);
        self.next_timer += 1;
        self.timers.insert((due, id), task);
        id
    }
}

/// Deterministic host with a manual clock.
pub struct MockHost {
    settings: MockSettings,
    state: Mutex<MockState>,
}

impl MockHost {
    pub const NAME: &'static str = "mock";

    pub const fn new() -> Self {
        Self::with_settings(MockSettings::DEFAULT)
    }

    pub const fn with_settings(settings: MockSettings) -> Self {
        Self { settings, state: Mutex::new(MockState::new(settings.start_time)) }
    }

    pub fn settings(&self) -> &MockSettings {
        &self.settings
    }

    /// Drops timers, scene and log and rewinds the clock to the start time.
    pub fn reset(&self) {
        *self.lock() = MockState::new(self.settings.start_time);
    }

    /// Adds an element on top of the scene and returns its id. Ids start at 1,
    /// [`ROOT_ELEMENT`] is reserved.
    pub fn add_element(&self, bounds: Rect) -> ElementId {
        let mut state = self.lock();
        let id = ElementId::new(state.scene.len() as u64 + 1);
        state.scene.push((id, bounds));
        id
    }

    /// Makes every later dispatch to `element` fail.
    pub fn fail_dispatch_to(&self, element: ElementId) {
        self.lock().failing.push(element);
    }

    /// Moves the clock forward by `delta`, firing due timers on the way.
    /// Returns the number of tasks that ran.
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self.now().saturating_add(delta);
        self.advance_to(target)
    }

    /// Fires every task due at or before `target` in due order, then leaves
    /// the clock at `target`. Tasks scheduled meanwhile run too when due.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due(Some(target)) {
            task();
            ran += 1;
        }
        let mut state = self.lock();
        state.now = state.now.max(target);
        ran
    }

    /// Fires tasks in due order until none remain, jumping the clock to each
    /// due time.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while ran < RUN_LIMIT {
            let Some(task) = self.pop_due(None) else { break };
            task();
            ran += 1;
        }
        ran
    }

    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    /// Recorded dispatches, oldest first.
    pub fn dispatch_log(&self) -> Vec<DispatchRecord> {
        self.lock().log.clone()
    }

    /// Returns the recorded dispatches and clears the log.
    pub fn take_dispatch_log(&self) -> Vec<DispatchRecord> {
        std::mem::take(&mut self.lock().log)
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<ScheduledTask> {
        let mut state = self.lock();
        let &(due, _) = state.timers.keys().next()?;
        if limit.is_some_and(|limit| due > limit) {
            return None;
        }
        let ((due, id), task) = state.timers.pop_first()?;
        state.now = state.now.max(due);
        trace!(timer = id.get(), at = ?state.now, "mock timer fired");
        Some(task)
    }

    fn next_frame(&self, now: Duration) -> Duration {
        let interval = self.settings.frame_interval.as_nanos().max(1);
        let boundary = (now.as_nanos() / interval + 1) * interval;
        u64::try_from(boundary).map_or(Duration::MAX, Duration::from_nanos)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockHost {
    fn now(&self) -> Duration {
        self.lock().now
    }
}

impl Scheduler for MockHost {
    fn schedule_after(&self, delay: Duration, task: ScheduledTask) -> TimerId {
        let mut state = self.lock();
        let due = state.now.saturating_add(delay);
        state.insert(due, task)
    }

    fn schedule_frame(&self, task: ScheduledTask) -> TimerId {
        let mut state = self.lock();
        let due = self.next_frame(state.now);
        state.insert(due, task)
    }

    fn cancel(&self, id: TimerId) {
        self.lock().timers.retain(|&(_, timer), _| timer != id);
    }
}

impl HitTester for MockHost {
    fn element_at(&self, point: Point) -> Option<ElementId> {
        let state = self.lock();
        state.scene.iter().rev().find(|(_, bounds)| bounds.contains(point)).map(|(id, _)| *id)
    }

    fn root(&self) -> ElementId {
        ROOT_ELEMENT
    }
}

impl EventSink for MockHost {
    fn capabilities(&self) -> Capabilities {
        self.settings.capabilities
    }

    fn dispatch(&self, target: ElementId, event: &SyntheticEvent) -> Result<(), PlatformError> {
        let strategy = ConstructionStrategy::select(self.settings.capabilities, event.family());
        if strategy == ConstructionStrategy::Unavailable {
            return Err(PlatformError::new(
                PlatformErrorKind::CapabilityUnavailable,
                format!("mock host cannot construct {} events", event.type_name()),
            ));
        }

        let mut state = self.lock();
        if state.failing.contains(&target) {
            return Err(PlatformError::new(
                PlatformErrorKind::DispatchFailed,
                format!("element {} refused {}", target.get(), event.type_name()),
            ));
        }
        trace!(target = target.get(), event = event.type_name(), ?strategy, "mock dispatch");
        let at = state.now;
        state.log.push(DispatchRecord { at, target, strategy, event: event.clone() });
        Ok(())
    }
}

impl Host for MockHost {
    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosthetic_core::platform::{EventPhase, MouseEventInit};
    use rstest::rstest;
    use std::sync::Arc;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> ScheduledTask {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(label))
    }

    fn mouse_move(x: f64, y: f64) -> SyntheticEvent {
        SyntheticEvent::Mouse(MouseEventInit {
            phase: EventPhase::Move,
            client: Point::new(x, y),
            screen: Point::new(x, y),
            buttons: 0,
            time_stamp: Duration::ZERO,
        })
    }

    #[rstest]
    fn timers_fire_in_due_order() {
        let host = MockHost::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        host.schedule_after(ms(30), recorder(&log, "late"));
        host.schedule_after(ms(10), recorder(&log, "early"));
        host.schedule_frame(recorder(&log, "frame"));

        assert_eq!(host.advance_by(ms(20)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["early", "frame"]);
        assert_eq!(host.now(), ms(20));

        assert_eq!(host.run_until_idle(), 1);
        assert_eq!(host.now(), ms(30));
    }

    #[rstest]
    fn frames_land_on_interval_boundaries() {
        let host = MockHost::with_settings(MockSettings::default().with_start_time(ms(20)));
        let log = Arc::new(Mutex::new(Vec::new()));
        host.schedule_frame(recorder(&log, "frame"));

        assert_eq!(host.advance_to(ms(31)), 0);
        assert_eq!(host.advance_to(ms(32)), 1);
    }

    #[rstest]
    fn cancelled_timers_never_fire() {
        let host = MockHost::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = host.schedule_after(ms(5), recorder(&log, "cancelled"));
        host.cancel(id);
        host.cancel(TimerId::new(999));

        assert_eq!(host.pending_timers(), 0);
        assert_eq!(host.run_until_idle(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[rstest]
    fn hit_testing_prefers_topmost_element() {
        let host = MockHost::new();
        let page = host.add_element(Rect::new(0.0, 0.0, 200.0, 200.0));
        let button = host.add_element(Rect::new(50.0, 50.0, 20.0, 20.0));

        assert_eq!(host.element_at(Point::new(55.0, 55.0)), Some(button));
        assert_eq!(host.element_at(Point::new(10.0, 10.0)), Some(page));
        assert_eq!(host.element_at(Point::new(500.0, 10.0)), None);
        assert_eq!(host.root(), ROOT_ELEMENT);
    }

    #[rstest]
    fn dispatch_records_strategy_and_time() {
        let capabilities = Capabilities::MOUSE | Capabilities::TOUCH;
        let host = MockHost::with_settings(MockSettings::default().with_capabilities(capabilities));
        host.advance_by(ms(12));

        host.dispatch(ROOT_ELEMENT, &mouse_move(1.0, 2.0)).unwrap();

        let log = host.take_dispatch_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].at, ms(12));
        assert_eq!(log[0].strategy, ConstructionStrategy::LegacyInit);
        assert!(host.dispatch_log().is_empty());
    }

    #[rstest]
    fn dispatch_fails_for_unavailable_families() {
        let settings = MockSettings::default().with_capabilities(Capabilities::TOUCH);
        let host = MockHost::with_settings(settings);
        let err = host.dispatch(ROOT_ELEMENT, &mouse_move(0.0, 0.0)).unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::CapabilityUnavailable);
    }

    #[rstest]
    fn failing_elements_refuse_events() {
        let host = MockHost::new();
        let element = host.add_element(Rect::new(0.0, 0.0, 10.0, 10.0));
        host.fail_dispatch_to(element);

        let err = host.dispatch(element, &mouse_move(1.0, 1.0)).unwrap_err();
        assert_eq!(err.kind, PlatformErrorKind::DispatchFailed);
        assert!(host.dispatch(ROOT_ELEMENT, &mouse_move(1.0, 1.0)).is_ok());
    }
}
