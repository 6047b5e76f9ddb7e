use serde::{Deserialize, Serialize};

use super::PointerKind;
use crate::types::Point;

/// Complete snapshot of one simulated contact point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerState {
    pub x: f64,
    pub y: f64,
    pub down: bool,
    pub pressure: f64,
    pub tilt_x: f64,
    pub tilt_y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
    pub rotation: f64,
    pub pointer_kind: PointerKind,
}

impl FingerState {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Returns a copy with `update` folded in.
    #[must_use]
    pub fn with(self, update: &FingerUpdate) -> Self {
        let mut next = self;
        update.apply_to(&mut next);
        next
    }
}

impl Default for FingerState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            down: false,
            pressure: 0.5,
            tilt_x: 0.0,
            tilt_y: 0.0,
            radius_x: 1.0,
            radius_y: 1.0,
            rotation: 0.0,
            pointer_kind: PointerKind::Mouse,
        }
    }
}

/// Partial finger state. `None` fields leave the current value untouched.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FingerUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub down: Option<bool>,
    pub pressure: Option<f64>,
    pub tilt_x: Option<f64>,
    pub tilt_y: Option<f64>,
    pub radius_x: Option<f64>,
    pub radius_y: Option<f64>,
    pub rotation: Option<f64>,
    pub pointer_kind: Option<PointerKind>,
}

impl FingerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn down(mut self, down: bool) -> Self {
        self.down = Some(down);
        self
    }

    pub fn pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn tilt(mut self, tilt_x: f64, tilt_y: f64) -> Self {
        self.tilt_x = Some(tilt_x);
        self.tilt_y = Some(tilt_y);
        self
    }

    pub fn radius(mut self, radius_x: f64, radius_y: f64) -> Self {
        self.radius_x = Some(radius_x);
        self.radius_y = Some(radius_y);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn pointer_kind(mut self, kind: PointerKind) -> Self {
        self.pointer_kind = Some(kind);
        self
    }

    /// Folds every present field into `state`.
    pub fn apply_to(&self, state: &mut FingerState) {
        fn set<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut state.x, self.x);
        set(&mut state.y, self.y);
        set(&mut state.down, self.down);
        set(&mut state.pressure, self.pressure);
        set(&mut state.tilt_x, self.tilt_x);
        set(&mut state.tilt_y, self.tilt_y);
        set(&mut state.radius_x, self.radius_x);
        set(&mut state.radius_y, self.radius_y);
        set(&mut state.rotation, self.rotation);
        set(&mut state.pointer_kind, self.pointer_kind);
    }

    /// Shallow comparison: true when at least one present field disagrees with `state`.
    pub fn differs_from(&self, state: &FingerState) -> bool {
        fn differs<T: PartialEq>(current: &T, value: Option<&T>) -> bool {
            value.is_some_and(|value| value != current)
        }

        differs(&state.x, self.x.as_ref())
            || differs(&state.y, self.y.as_ref())
            || differs(&state.down, self.down.as_ref())
            || differs(&state.pressure, self.pressure.as_ref())
            || differs(&state.tilt_x, self.tilt_x.as_ref())
            || differs(&state.tilt_y, self.tilt_y.as_ref())
            || differs(&state.radius_x, self.radius_x.as_ref())
            || differs(&state.radius_y, self.radius_y.as_ref())
            || differs(&state.rotation, self.rotation.as_ref())
            || differs(&state.pointer_kind, self.pointer_kind.as_ref())
    }

    /// False if any present numeric field is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        [
            self.x,
            self.y,
            self.pressure,
            self.tilt_x,
            self.tilt_y,
            self.radius_x,
            self.radius_y,
            self.rotation,
        ]
        .into_iter()
        .flatten()
        .all(f64::is_finite)
    }
}
