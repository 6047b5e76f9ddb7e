use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timing::TimingPolicy;

/// What to do when hit testing finds nothing or the host refuses an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Deliver to the host's root element and keep going.
    #[default]
    RootTarget,
    /// Fail the tick and fault the hand.
    Abort,
}

/// Target of a composite `touchend`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchEndTarget {
    /// Element under the lifted contact's last position.
    #[default]
    LiftOff,
    /// Element the lifted contact started on, as the touch events standard asks.
    Original,
}

/// Hand configuration, validated when parsed.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandConfig {
    pub timing: TimingPolicy,
    pub fallback: FallbackPolicy,
    pub touch_end_target: TouchEndTarget,
}

impl HandConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with the timing policy parsed from its string form.
    pub fn with_timing_str(timing: &str) -> Result<Self, ConfigError> {
        Ok(Self::default().with_timing(timing.parse()?))
    }

    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_touch_end_target(mut self, target: TouchEndTarget) -> Self {
        self.touch_end_target = target;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    fn defaults_match_expectations() {
        let config = HandConfig::default();
        assert_eq!(config.timing, TimingPolicy::Interval(Duration::from_millis(20)));
        assert_eq!(config.fallback, FallbackPolicy::RootTarget);
        assert_eq!(config.touch_end_target, TouchEndTarget::LiftOff);
    }

    #[rstest]
    fn deserializes_partial_json() {
        let config: HandConfig =
            serde_json::from_str(r#"{ "timing": "minimal", "fallback": "abort" }"#).unwrap();
        assert_eq!(config.timing, TimingPolicy::Minimal);
        assert_eq!(config.fallback, FallbackPolicy::Abort);
        assert_eq!(config.touch_end_target, TouchEndTarget::LiftOff);
    }

    #[rstest]
    fn rejects_unknown_timing_at_parse_time() {
        assert!(serde_json::from_str::<HandConfig>(r#"{ "timing": "soon" }"#).is_err());
        assert!(HandConfig::with_timing_str("soon").is_err());
    }

    #[rstest]
    fn builder_overrides_fields() {
        let config = HandConfig::new()
            .with_timing(TimingPolicy::Frame)
            .with_touch_end_target(TouchEndTarget::Original);
        assert_eq!(config.timing, TimingPolicy::Frame);
        assert_eq!(config.touch_end_target, TouchEndTarget::Original);
    }
}
