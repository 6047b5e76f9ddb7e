use prosthetic_core::input::{FingerUpdate, InputMode};
use prosthetic_core::types::Rect;
use rstest::fixture;
use std::io::Write;
use tempfile::NamedTempFile;

use crate::script::{FingerSpec, Script, Step};

/// Mouse drag across a single element, ending at x = 120.
#[fixture]
pub fn drag_script() -> Script {
    Script {
        scene: vec![Rect::new(0.0, 0.0, 200.0, 100.0)],
        fingers: vec![FingerSpec::new(InputMode::Mouse, FingerUpdate::new().position(10.0, 50.0))],
        steps: vec![
            Step::MoveTo { finger: 0, x: 20.0, y: 50.0, ms: 20.0, easing: Default::default() },
            Step::Wait { finger: 0, ms: 30.0 },
            Step::Down { finger: 0, delay_ms: 0.0 },
            Step::MoveBy { finger: 0, dx: 100.0, dy: 0.0, ms: 100.0, easing: Default::default() },
            Step::Up { finger: 0, delay_ms: 0.0 },
        ],
        ..Script::default()
    }
}

pub fn script_file(script: &Script) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    let json = serde_json::to_string_pretty(script).expect("serialize script");
    file.write_all(json.as_bytes()).expect("write script");
    file
}
