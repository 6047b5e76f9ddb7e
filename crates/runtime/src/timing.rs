use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// When and how often a hand dispatches ticks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimingPolicy {
    /// `"<N>ms"`: tick every N milliseconds at the host clock.
    Interval(Duration),
    /// `"frame"`: tick once per display frame at the host clock.
    Frame,
    /// `"minimal"`: tick exactly when the next movement completes.
    Minimal,
    /// `"instant"`: resolve every completion synchronously without waiting.
    Instant,
    /// `"fastframe"`: tick once per display frame, resolving the next completion.
    FastFrame,
}

impl TimingPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

    /// Whether a tick resolves at most one state change per finger.
    pub const fn resolves_single_step(self) -> bool {
        matches!(self, TimingPolicy::Minimal | TimingPolicy::Instant | TimingPolicy::FastFrame)
    }

    /// Whether ticks are stamped with the soonest completion time instead of the
    /// host clock.
    pub const fn ticks_at_completion(self) -> bool {
        matches!(self, TimingPolicy::Instant | TimingPolicy::FastFrame)
    }
}

impl Default for TimingPolicy {
    fn default() -> Self {
        TimingPolicy::Interval(Self::DEFAULT_INTERVAL)
    }
}

impl Display for TimingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingPolicy::Interval(interval) => write!(f, "{}ms", interval.as_millis()),
            TimingPolicy::Frame => f.write_str("frame"),
            TimingPolicy::Minimal => f.write_str("minimal"),
            TimingPolicy::Instant => f.write_str("instant"),
            TimingPolicy::FastFrame => f.write_str("fastframe"),
        }
    }
}

impl FromStr for TimingPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "frame" => return Ok(TimingPolicy::Frame),
            "minimal" => return Ok(TimingPolicy::Minimal),
            "instant" => return Ok(TimingPolicy::Instant),
            "fastframe" | "fast-frame" => return Ok(TimingPolicy::FastFrame),
            _ => {}
        }

        let millis = normalized
            .strip_suffix("ms")
            .and_then(|digits| digits.trim().parse::<u64>().ok())
            .ok_or_else(|| ConfigError::UnknownTiming(value.to_owned()))?;
        if millis == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(TimingPolicy::Interval(Duration::from_millis(millis)))
    }
}

impl TryFrom<String> for TimingPolicy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimingPolicy> for String {
    fn from(policy: TimingPolicy) -> Self {
        policy.to_string()
    }
}
