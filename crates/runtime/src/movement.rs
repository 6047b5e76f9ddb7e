use prosthetic_core::input::FingerUpdate;
use prosthetic_core::types::Point;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MotionError;

/// Progress curve applied to interpolated moves.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    SmoothStep,
}

impl Easing {
    /// Maps linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Path {
    /// Nothing changes until the movement completes.
    Hold,
    Line { from: Point, to: Point, easing: Easing },
}

/// One scheduled, time-bounded change of a finger.
#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    final_state: FingerUpdate,
    duration: Duration,
    path: Path,
}

impl Movement {
    /// State change applied as soon as the movement is reached.
    pub fn instant(update: FingerUpdate) -> Self {
        Self::hold(update, Duration::ZERO)
    }

    /// State change applied once `duration` has elapsed.
    pub fn hold(update: FingerUpdate, duration: Duration) -> Self {
        Self { final_state: update, duration, path: Path::Hold }
    }

    /// Does nothing for `duration`.
    pub fn wait(duration: Duration) -> Self {
        Self::hold(FingerUpdate::default(), duration)
    }

    /// Straight move from `from` to `to`, interpolated positions rounded to whole pixels.
    pub fn line(
        from: Point,
        to: Point,
        duration: Duration,
        easing: Easing,
    ) -> Result<Self, MotionError> {
        if !to.is_finite() {
            return Err(MotionError::NonFiniteCoordinate { x: to.x(), y: to.y() });
        }
        Ok(Self {
            final_state: FingerUpdate::new().position(to.x(), to.y()),
            duration,
            path: Path::Line { from, to, easing },
        })
    }

    pub fn final_state(&self) -> &FingerUpdate {
        &self.final_state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// In-progress state `elapsed` after the movement started, `None` when there
    /// is nothing to report.
    pub fn interpolate(&self, elapsed: Duration) -> Option<FingerUpdate> {
        match &self.path {
            Path::Hold => None,
            Path::Line { .. } if self.duration.is_zero() => None,
            Path::Line { from, to, easing } => {
                let progress = easing.apply(elapsed.as_secs_f64() / self.duration.as_secs_f64());
                let x = (from.x() + (to.x() - from.x()) * progress).round();
                let y = (from.y() + (to.y() - from.y()) * progress).round();
                Some(FingerUpdate::new().position(x, y))
            }
        }
    }
}

/// Converts a millisecond count into a [`Duration`], rejecting negative and
/// non-finite values.
pub fn millis(ms: f64) -> Result<Duration, MotionError> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(MotionError::InvalidDuration(ms));
    }
    Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| MotionError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Easing::Linear, 0.25, 0.25)]
    #[case(Easing::EaseIn, 0.5, 0.25)]
    #[case(Easing::EaseOut, 0.5, 0.75)]
    #[case(Easing::SmoothStep, 0.5, 0.5)]
    #[case(Easing::SmoothStep, 1.5, 1.0)]
    #[case(Easing::EaseIn, -1.0, 0.0)]
    fn easing_curves(#[case] easing: Easing, #[case] t: f64, #[case] expected: f64) {
        assert!((easing.apply(t) - expected).abs() < 1e-9);
    }

    #[rstest]
    fn line_rounds_to_whole_pixels() {
        let movement = Movement::line(
            Point::new(0.0, 0.0),
            Point::new(10.0, 3.0),
            Duration::from_millis(100),
            Easing::Linear,
        )
        .unwrap();

        let update = movement.interpolate(Duration::from_millis(25)).unwrap();
        assert_eq!(update.x, Some(3.0));
        assert_eq!(update.y, Some(1.0));
        assert_eq!(movement.final_state().x, Some(10.0));
    }

    #[rstest]
    fn line_clamps_past_its_duration() {
        let movement = Movement::line(
            Point::new(0.0, 0.0),
            Point::new(-40.0, 0.0),
            Duration::from_millis(100),
            Easing::EaseOut,
        )
        .unwrap();

        let update = movement.interpolate(Duration::from_millis(400)).unwrap();
        assert_eq!(update.x, Some(-40.0));
    }

    #[rstest]
    fn instantaneous_movements_report_nothing_in_progress() {
        let press = Movement::instant(FingerUpdate::new().down(true));
        assert_eq!(press.interpolate(Duration::ZERO), None);

        let jump = Movement::line(
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Duration::ZERO,
            Easing::Linear,
        )
        .unwrap();
        assert_eq!(jump.interpolate(Duration::ZERO), None);
    }

    #[rstest]
    fn line_rejects_non_finite_target() {
        let err = Movement::line(
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 1.0),
            Duration::from_millis(10),
            Easing::Linear,
        )
        .unwrap_err();
        assert!(matches!(err, MotionError::NonFiniteCoordinate { .. }));
    }

    #[rstest]
    #[case(0.0, Duration::ZERO)]
    #[case(25.0, Duration::from_millis(25))]
    #[case(0.5, Duration::from_micros(500))]
    fn millis_accepts_valid_values(#[case] ms: f64, #[case] expected: Duration) {
        assert_eq!(millis(ms).unwrap(), expected);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn millis_rejects_invalid_values(#[case] ms: f64) {
        assert!(matches!(millis(ms), Err(MotionError::InvalidDuration(_))));
    }
}
