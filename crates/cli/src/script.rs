use anyhow::{Context, anyhow, bail};
use prosthetic_core::input::{FingerState, FingerUpdate, InputMode};
use prosthetic_core::platform::{ConstructionStrategy, SyntheticEvent};
use prosthetic_core::types::Rect;
use prosthetic_platform_mock::{DispatchRecord, MockHost, MockSettings};
use prosthetic_runtime::{Easing, Finger, FingerId, Hand, HandConfig, TimingPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::util::{CliResult, script_millis};

/// A gesture script: scene, fingers and the steps queued on them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Script {
    pub hand: HandConfig,
    pub host: HostOptions,
    /// Element rectangles, later entries are on top.
    pub scene: Vec<Rect>,
    pub fingers: Vec<FingerSpec>,
    pub steps: Vec<Step>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostOptions {
    pub frame_interval_ms: f64,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self { frame_interval_ms: 16.0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FingerSpec {
    pub mode: InputMode,
    #[serde(default)]
    pub start: FingerUpdate,
}

impl FingerSpec {
    pub fn new(mode: InputMode, start: FingerUpdate) -> Self {
        Self { mode, start }
    }
}

/// One queued operation. `finger` indexes into [`Script::fingers`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Wait {
        finger: usize,
        ms: f64,
    },
    WaitUntil {
        finger: usize,
        at_ms: f64,
    },
    Down {
        finger: usize,
        #[serde(default)]
        delay_ms: f64,
    },
    Up {
        finger: usize,
        #[serde(default)]
        delay_ms: f64,
    },
    Update {
        finger: usize,
        state: FingerUpdate,
        #[serde(default)]
        delay_ms: f64,
    },
    MoveTo {
        finger: usize,
        x: f64,
        y: f64,
        #[serde(default)]
        ms: f64,
        #[serde(default)]
        easing: Easing,
    },
    MoveBy {
        finger: usize,
        dx: f64,
        dy: f64,
        #[serde(default)]
        ms: f64,
        #[serde(default)]
        easing: Easing,
    },
    Reset {
        finger: usize,
    },
    /// Aligns every finger's queue, see [`Hand::sync`].
    Sync {
        #[serde(default)]
        extra_ms: f64,
    },
}

/// Outcome of playing a script to completion.
#[derive(Clone, Debug, Serialize)]
pub struct PlaybackSummary {
    pub timing: TimingPolicy,
    pub timers_fired: usize,
    pub events: Vec<EventSummary>,
    pub fingers: Vec<FingerSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EventSummary {
    /// Host clock at delivery.
    pub at_ms: f64,
    /// `timeStamp` carried by the event, ahead of `at_ms` under instant timing.
    pub time_stamp_ms: f64,
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub target: u64,
    pub strategy: ConstructionStrategy,
    pub event: SyntheticEvent,
}

impl From<DispatchRecord> for EventSummary {
    fn from(record: DispatchRecord) -> Self {
        Self {
            at_ms: as_millis(record.at),
            time_stamp_ms: as_millis(record.event.time_stamp()),
            event_type: record.event.type_name(),
            target: record.target.get(),
            strategy: record.strategy,
            event: record.event,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FingerSummary {
    pub id: FingerId,
    pub mode: InputMode,
    pub state: FingerState,
}

impl Script {
    pub fn from_json(source: &str) -> CliResult<Self> {
        serde_json::from_str(source).context("invalid gesture script")
    }

    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.hand.timing = timing;
        self
    }

    /// Plays the script on a fresh mock host until no timer is left.
    pub fn play(&self) -> CliResult<PlaybackSummary> {
        let frame_interval = script_millis(self.host.frame_interval_ms).context("host.frame_interval_ms")?;
        if frame_interval.is_zero() {
            bail!("host.frame_interval_ms must be greater than zero");
        }
        let host = Arc::new(MockHost::with_settings(MockSettings::default().with_frame_interval(frame_interval)));
        for bounds in &self.scene {
            host.add_element(*bounds);
        }

        let hand = Hand::new(host.clone(), self.hand.clone());
        let fingers = self
            .fingers
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                hand.grow_finger(spec.mode, spec.start).with_context(|| format!("finger {index}"))
            })
            .collect::<CliResult<Vec<_>>>()?;

        for (index, step) in self.steps.iter().enumerate() {
            apply_step(&hand, &fingers, step).with_context(|| format!("step {index}"))?;
        }
        debug!(steps = self.steps.len(), fingers = fingers.len(), "script queued");

        let timers_fired = host.run_until_idle();
        if let Some(fault) = hand.take_fault() {
            return Err(anyhow::Error::new(fault).context("playback aborted"));
        }
        if !hand.is_idle() {
            bail!("playback did not settle after {timers_fired} timers");
        }

        let events: Vec<EventSummary> = host.take_dispatch_log().into_iter().map(EventSummary::from).collect();
        info!(timers_fired, events = events.len(), timing = %self.hand.timing, "script played");
        Ok(PlaybackSummary {
            timing: self.hand.timing,
            timers_fired,
            events,
            fingers: fingers
                .iter()
                .map(|finger| FingerSummary { id: finger.id(), mode: finger.mode(), state: finger.state() })
                .collect(),
        })
    }
}

fn apply_step(hand: &Hand, fingers: &[Finger], step: &Step) -> CliResult<()> {
    match step {
        Step::Wait { finger, ms } => {
            select(fingers, *finger)?.wait(script_millis(*ms)?)?;
        }
        Step::WaitUntil { finger, at_ms } => {
            select(fingers, *finger)?.wait_until(script_millis(*at_ms)?)?;
        }
        Step::Down { finger, delay_ms } => {
            select(fingers, *finger)?.down_after(script_millis(*delay_ms)?)?;
        }
        Step::Up { finger, delay_ms } => {
            select(fingers, *finger)?.up_after(script_millis(*delay_ms)?)?;
        }
        Step::Update { finger, state, delay_ms } => {
            select(fingers, *finger)?.update_after(*state, script_millis(*delay_ms)?)?;
        }
        Step::MoveTo { finger, x, y, ms, easing } => {
            select(fingers, *finger)?.move_to_with(*x, *y, script_millis(*ms)?, *easing)?;
        }
        Step::MoveBy { finger, dx, dy, ms, easing } => {
            select(fingers, *finger)?.move_by_with(*dx, *dy, script_millis(*ms)?, *easing)?;
        }
        Step::Reset { finger } => {
            select(fingers, *finger)?.reset()?;
        }
        Step::Sync { extra_ms } => hand.sync(script_millis(*extra_ms)?)?,
    }
    Ok(())
}

fn select(fingers: &[Finger], index: usize) -> CliResult<&Finger> {
    fingers.get(index).ok_or_else(|| anyhow!("finger index {index} out of range ({} fingers)", fingers.len()))
}

fn as_millis(value: Duration) -> f64 {
    value.as_nanos() as f64 / 1_000_000.0
}
