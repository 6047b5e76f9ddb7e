//! Turns the transitions of one tick into dispatchable events.
//!
//! Mouse and pointer fingers produce one event each. Touch fingers are merged
//! into at most one composite touch event per tick.

use std::time::Duration;

use prosthetic_core::input::InputMode;
use prosthetic_core::platform::{
    ElementId, EventPhase, MouseEventInit, PointerEventInit, SyntheticEvent, TouchEventInit,
    TouchEventKind, TouchPoint,
};
use prosthetic_core::types::Point;
use serde::Serialize;

use crate::config::TouchEndTarget;
use crate::error::HandError;
use crate::finger::{FingerId, Transition, TransitionKind};

/// An event together with the element it is delivered to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dispatch {
    pub target: ElementId,
    pub event: SyntheticEvent,
}

/// Outcome of one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Timestamp the fingers were advanced to.
    pub at: Duration,
    /// Non-idle transitions in finger order.
    pub transitions: Vec<Transition>,
    /// Events the host accepted, with the element they were delivered to.
    pub dispatched: Vec<Dispatch>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.dispatched.is_empty()
    }
}

pub(crate) struct ComposeContext<'a> {
    pub now: Duration,
    pub root: ElementId,
    /// First pointer-mode finger of the hand.
    pub primary_pointer: Option<FingerId>,
    pub touch_end_target: TouchEndTarget,
    pub resolve: &'a dyn Fn(Point) -> Result<ElementId, HandError>,
}

/// Builds the events of one tick. Mouse and pointer events come first, in
/// finger order, followed by the composite touch event.
pub(crate) fn compose(
    transitions: &[Transition],
    context: &ComposeContext<'_>,
) -> Result<Vec<Dispatch>, HandError> {
    let mut dispatches = Vec::new();
    let mut touches = Vec::new();

    for transition in transitions {
        match transition.mode {
            InputMode::Touch => touches.push(transition),
            InputMode::Mouse | InputMode::Pointer => {
                let Some(phase) = phase(transition.kind) else { continue };
                let target = (context.resolve)(transition.state.position())?;
                let event = if transition.mode == InputMode::Mouse {
                    mouse_event(transition, phase, context.now)
                } else {
                    pointer_event(transition, phase, context)
                };
                dispatches.push(Dispatch { target, event });
            }
        }
    }

    if let Some(dispatch) = compose_touch(&touches, context)? {
        dispatches.push(dispatch);
    }
    Ok(dispatches)
}

fn compose_touch(
    records: &[&Transition],
    context: &ComposeContext<'_>,
) -> Result<Option<Dispatch>, HandError> {
    let changed_touches: Vec<TouchPoint> = records
        .iter()
        .filter(|record| record.kind != TransitionKind::Idle)
        .map(|record| touch_point(record, context.root))
        .collect();
    if changed_touches.is_empty() {
        return Ok(None);
    }

    let touches: Vec<TouchPoint> = records
        .iter()
        .filter(|record| record.kind != TransitionKind::Up)
        .map(|record| touch_point(record, context.root))
        .collect();

    let started = records.iter().find(|record| record.kind == TransitionKind::Down);
    let ended = records.iter().find(|record| record.kind == TransitionKind::Up);

    let (kind, target) = if let Some(record) = started {
        (TouchEventKind::Start, record.target)
    } else if let Some(record) = ended {
        let target = match context.touch_end_target {
            TouchEndTarget::LiftOff => Some((context.resolve)(record.state.position())?),
            TouchEndTarget::Original => record.target,
        };
        (TouchEventKind::End, target)
    } else {
        (TouchEventKind::Move, touches.first().map(|touch| touch.target))
    };
    let target = target.unwrap_or(context.root);

    let target_touches = touches.iter().filter(|touch| touch.target == target).cloned().collect();

    let event = SyntheticEvent::Touch(TouchEventInit {
        kind,
        touches,
        target_touches,
        changed_touches,
        time_stamp: context.now,
    });
    Ok(Some(Dispatch { target, event }))
}

fn phase(kind: TransitionKind) -> Option<EventPhase> {
    match kind {
        TransitionKind::Idle => None,
        TransitionKind::Move => Some(EventPhase::Move),
        TransitionKind::Down => Some(EventPhase::Down),
        TransitionKind::Up => Some(EventPhase::Up),
    }
}

fn buttons(transition: &Transition) -> u16 {
    u16::from(transition.state.down)
}

fn mouse_event(transition: &Transition, phase: EventPhase, now: Duration) -> SyntheticEvent {
    let position = transition.state.position();
    SyntheticEvent::Mouse(MouseEventInit {
        phase,
        client: position,
        screen: position,
        buttons: buttons(transition),
        time_stamp: now,
    })
}

fn pointer_event(
    transition: &Transition,
    phase: EventPhase,
    context: &ComposeContext<'_>,
) -> SyntheticEvent {
    let state = &transition.state;
    let position = state.position();
    SyntheticEvent::Pointer(PointerEventInit {
        phase,
        pointer_id: transition.finger.get(),
        pointer_type: state.pointer_kind,
        is_primary: context.primary_pointer == Some(transition.finger),
        client: position,
        screen: position,
        buttons: buttons(transition),
        pressure: if state.down { state.pressure } else { 0.0 },
        tilt_x: state.tilt_x,
        tilt_y: state.tilt_y,
        width: state.radius_x * 2.0,
        height: state.radius_y * 2.0,
        time_stamp: context.now,
    })
}

fn touch_point(record: &Transition, root: ElementId) -> TouchPoint {
    let state = &record.state;
    let position = state.position();
    TouchPoint {
        identifier: record.finger.get(),
        target: record.target.unwrap_or(root),
        client: position,
        screen: position,
        page: position,
        radius_x: state.radius_x,
        radius_y: state.radius_y,
        rotation_angle: state.rotation,
        force: state.pressure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosthetic_core::input::FingerState;
    use rstest::rstest;

    const ROOT: ElementId = ElementId::new(0);
    const LEFT: ElementId = ElementId::new(1);
    const RIGHT: ElementId = ElementId::new(2);

    fn resolve_by_half(point: Point) -> Result<ElementId, HandError> {
        Ok(if point.x() < 100.0 { LEFT } else { RIGHT })
    }

    fn context(touch_end_target: TouchEndTarget) -> ComposeContext<'static> {
        ComposeContext {
            now: Duration::from_millis(40),
            root: ROOT,
            primary_pointer: Some(FingerId::new(0)),
            touch_end_target,
            resolve: &resolve_by_half,
        }
    }

    fn record(
        id: u32,
        mode: InputMode,
        kind: TransitionKind,
        x: f64,
        target: Option<ElementId>,
    ) -> Transition {
        let down = matches!(kind, TransitionKind::Down | TransitionKind::Move | TransitionKind::Idle);
        Transition {
            kind,
            finger: FingerId::new(id),
            mode,
            state: FingerState { x, y: 10.0, down, ..FingerState::default() },
            target,
        }
    }

    fn touch(id: u32, kind: TransitionKind, x: f64, target: ElementId) -> Transition {
        record(id, InputMode::Touch, kind, x, Some(target))
    }

    fn touch_init(dispatch: &Dispatch) -> &TouchEventInit {
        match &dispatch.event {
            SyntheticEvent::Touch(init) => init,
            other => panic!("expected touch event, got {}", other.type_name()),
        }
    }

    fn ids(points: &[TouchPoint]) -> Vec<u32> {
        points.iter().map(|point| point.identifier).collect()
    }

    #[rstest]
    fn idle_touches_alone_emit_nothing() {
        let records = vec![touch(0, TransitionKind::Idle, 10.0, LEFT)];
        assert!(compose(&records, &context(TouchEndTarget::LiftOff)).unwrap().is_empty());
    }

    #[rstest]
    fn down_wins_over_simultaneous_up_and_move() {
        let records = vec![
            touch(0, TransitionKind::Up, 10.0, LEFT),
            touch(1, TransitionKind::Move, 150.0, RIGHT),
            touch(2, TransitionKind::Down, 160.0, RIGHT),
        ];
        let dispatches = compose(&records, &context(TouchEndTarget::LiftOff)).unwrap();
        assert_eq!(dispatches.len(), 1);

        let init = touch_init(&dispatches[0]);
        assert_eq!(init.kind, TouchEventKind::Start);
        assert_eq!(dispatches[0].target, RIGHT);
        assert_eq!(ids(&init.touches), vec![1, 2]);
        assert_eq!(ids(&init.target_touches), vec![1, 2]);
        assert_eq!(ids(&init.changed_touches), vec![0, 1, 2]);
    }

    #[rstest]
    fn first_down_in_finger_order_picks_the_target() {
        let records = vec![
            touch(0, TransitionKind::Down, 10.0, LEFT),
            touch(1, TransitionKind::Down, 150.0, RIGHT),
        ];
        let dispatches = compose(&records, &context(TouchEndTarget::LiftOff)).unwrap();
        let init = touch_init(&dispatches[0]);

        assert_eq!(dispatches[0].target, LEFT);
        assert_eq!(ids(&init.touches), vec![0, 1]);
        assert_eq!(ids(&init.target_touches), vec![0]);
    }

    #[rstest]
    #[case(TouchEndTarget::LiftOff, RIGHT)]
    #[case(TouchEndTarget::Original, LEFT)]
    fn touchend_target_follows_policy(#[case] policy: TouchEndTarget, #[case] expected: ElementId) {
        let records = vec![
            touch(0, TransitionKind::Up, 150.0, LEFT),
            touch(1, TransitionKind::Idle, 20.0, LEFT),
        ];
        let dispatches = compose(&records, &context(policy)).unwrap();
        let init = touch_init(&dispatches[0]);

        assert_eq!(init.kind, TouchEventKind::End);
        assert_eq!(dispatches[0].target, expected);
        assert_eq!(ids(&init.touches), vec![1]);
        assert_eq!(ids(&init.changed_touches), vec![0]);
    }

    #[rstest]
    fn touchmove_targets_first_active_contact() {
        let records = vec![
            touch(0, TransitionKind::Idle, 150.0, RIGHT),
            touch(1, TransitionKind::Move, 20.0, LEFT),
        ];
        let dispatches = compose(&records, &context(TouchEndTarget::LiftOff)).unwrap();
        let init = touch_init(&dispatches[0]);

        assert_eq!(init.kind, TouchEventKind::Move);
        assert_eq!(dispatches[0].target, RIGHT);
        assert_eq!(ids(&init.changed_touches), vec![1]);
        assert_eq!(ids(&init.target_touches), vec![0]);
    }

    #[rstest]
    fn mouse_and_pointer_records_dispatch_individually() {
        let records = vec![
            record(0, InputMode::Pointer, TransitionKind::Down, 150.0, None),
            record(1, InputMode::Mouse, TransitionKind::Move, 20.0, None),
            record(2, InputMode::Mouse, TransitionKind::Idle, 20.0, None),
            touch(3, TransitionKind::Move, 30.0, LEFT),
        ];
        let dispatches = compose(&records, &context(TouchEndTarget::LiftOff)).unwrap();

        let names: Vec<_> = dispatches.iter().map(|d| d.event.type_name()).collect();
        assert_eq!(names, vec!["pointerdown", "mousemove", "touchmove"]);
        assert_eq!(dispatches[0].target, RIGHT);
        assert_eq!(dispatches[1].target, LEFT);

        let SyntheticEvent::Pointer(pointer) = &dispatches[0].event else {
            panic!("expected pointer event");
        };
        assert!(pointer.is_primary);
        assert_eq!(pointer.buttons, 1);
        assert_eq!(pointer.pressure, 0.5);
        assert_eq!(pointer.time_stamp, Duration::from_millis(40));
    }

    #[rstest]
    fn resolver_errors_abort_composition() {
        let failing = |_: Point| -> Result<ElementId, HandError> {
            Err(HandError::Faulted("no element".into()))
        };
        let context = ComposeContext { resolve: &failing, ..context(TouchEndTarget::LiftOff) };
        let records = vec![record(0, InputMode::Mouse, TransitionKind::Move, 5.0, None)];
        assert!(compose(&records, &context).is_err());
    }
}
