use clap::{Args, ValueEnum};
use prosthetic_core::input::{FingerUpdate, InputMode};
use prosthetic_core::types::Rect;
use prosthetic_runtime::{Easing, TimingPolicy};

use super::render;
use crate::OutputFormat;
use crate::script::{FingerSpec, Script, Step};
use crate::util::{CliResult, parse_timing_arg};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    /// Press the mouse and drag 400px to the right.
    Drag,
    /// Two touches spreading apart.
    Pinch,
    /// Short touch on a button.
    Tap,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    #[arg(value_enum)]
    pub kind: DemoKind,
    #[arg(long = "timing", value_parser = parse_timing_arg)]
    pub timing: Option<TimingPolicy>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(args: &DemoArgs) -> CliResult<String> {
    let mut script = demo_script(args.kind);
    if let Some(timing) = args.timing {
        script = script.with_timing(timing);
    }
    render(&script.play()?, args.format)
}

pub fn demo_script(kind: DemoKind) -> Script {
    match kind {
        DemoKind::Drag => Script {
            scene: vec![Rect::new(0.0, 0.0, 800.0, 100.0)],
            fingers: vec![FingerSpec::new(InputMode::Mouse, FingerUpdate::new().position(0.0, 50.0))],
            steps: vec![
                line(0, 1.0, 0.0, 25.0),
                Step::Down { finger: 0, delay_ms: 0.0 },
                line(0, 400.0, 0.0, 500.0),
                Step::Up { finger: 0, delay_ms: 0.0 },
            ],
            ..Script::default()
        },
        DemoKind::Pinch => Script {
            scene: vec![Rect::new(0.0, 0.0, 300.0, 200.0)],
            fingers: vec![
                FingerSpec::new(InputMode::Touch, FingerUpdate::new().position(150.0, 100.0)),
                FingerSpec::new(InputMode::Touch, FingerUpdate::new().position(150.0, 100.0)),
            ],
            steps: vec![
                Step::Down { finger: 0, delay_ms: 0.0 },
                Step::Down { finger: 1, delay_ms: 0.0 },
                line(0, -100.0, 0.0, 500.0),
                line(1, 100.0, 0.0, 500.0),
                Step::Sync { extra_ms: 0.0 },
                Step::Up { finger: 0, delay_ms: 0.0 },
                Step::Up { finger: 1, delay_ms: 0.0 },
            ],
            ..Script::default()
        },
        DemoKind::Tap => Script {
            scene: vec![Rect::new(0.0, 0.0, 400.0, 300.0), Rect::new(100.0, 100.0, 120.0, 40.0)],
            fingers: vec![FingerSpec::new(InputMode::Touch, FingerUpdate::new().position(160.0, 120.0))],
            steps: vec![Step::Down { finger: 0, delay_ms: 0.0 }, Step::Up { finger: 0, delay_ms: 80.0 }],
            ..Script::default()
        },
    }
}

fn line(finger: usize, dx: f64, dy: f64, ms: f64) -> Step {
    Step::MoveBy { finger, dx, dy, ms, easing: Easing::Linear }
}
