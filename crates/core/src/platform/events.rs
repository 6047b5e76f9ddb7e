use serde::Serialize;
use std::time::Duration;

use super::{ElementId, EventFamily};
use crate::input::PointerKind;
use crate::types::Point;

/// Phase of a single-contact mouse or pointer event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    Down,
    Move,
    Up,
}

/// Field set of a `mousedown`/`mousemove`/`mouseup` event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MouseEventInit {
    pub phase: EventPhase,
    pub client: Point,
    pub screen: Point,
    /// Pressed buttons bitmask after the event, `1` for the primary button.
    pub buttons: u16,
    pub time_stamp: Duration,
}

/// Field set of a `pointerdown`/`pointermove`/`pointerup` event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointerEventInit {
    pub phase: EventPhase,
    pub pointer_id: u32,
    pub pointer_type: PointerKind,
    pub is_primary: bool,
    pub client: Point,
    pub screen: Point,
    pub buttons: u16,
    pub pressure: f64,
    pub tilt_x: f64,
    pub tilt_y: f64,
    pub width: f64,
    pub height: f64,
    pub time_stamp: Duration,
}

/// One entry of a touch list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TouchPoint {
    pub identifier: u32,
    pub target: ElementId,
    pub client: Point,
    pub screen: Point,
    pub page: Point,
    pub radius_x: f64,
    pub radius_y: f64,
    pub rotation_angle: f64,
    pub force: f64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchEventKind {
    Start,
    Move,
    End,
}

impl TouchEventKind {
    pub const fn type_name(self) -> &'static str {
        match self {
            TouchEventKind::Start => "touchstart",
            TouchEventKind::Move => "touchmove",
            TouchEventKind::End => "touchend",
        }
    }
}

/// Composite touch event batching every touch contact of one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TouchEventInit {
    pub kind: TouchEventKind,
    pub touches: Vec<TouchPoint>,
    pub target_touches: Vec<TouchPoint>,
    pub changed_touches: Vec<TouchPoint>,
    pub time_stamp: Duration,
}

/// Event descriptor handed to the host for construction and delivery.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum SyntheticEvent {
    Mouse(MouseEventInit),
    Pointer(PointerEventInit),
    Touch(TouchEventInit),
}

impl SyntheticEvent {
    /// DOM event type name, e.g. `pointermove` or `touchstart`.
    pub fn type_name(&self) -> &'static str {
        match self {
            SyntheticEvent::Mouse(init) => match init.phase {
                EventPhase::Down => "mousedown",
                EventPhase::Move => "mousemove",
                EventPhase::Up => "mouseup",
            },
            SyntheticEvent::Pointer(init) => match init.phase {
                EventPhase::Down => "pointerdown",
                EventPhase::Move => "pointermove",
                EventPhase::Up => "pointerup",
            },
            SyntheticEvent::Touch(init) => init.kind.type_name(),
        }
    }

    pub fn family(&self) -> EventFamily {
        match self {
            SyntheticEvent::Mouse(_) => EventFamily::Mouse,
            SyntheticEvent::Pointer(_) => EventFamily::Pointer,
            SyntheticEvent::Touch(_) => EventFamily::Touch,
        }
    }

    pub fn time_stamp(&self) -> Duration {
        match self {
            SyntheticEvent::Mouse(init) => init.time_stamp,
            SyntheticEvent::Pointer(init) => init.time_stamp,
            SyntheticEvent::Touch(init) => init.time_stamp,
        }
    }
}
