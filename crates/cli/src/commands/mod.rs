pub mod demo;
pub mod run;

use owo_colors::{OwoColorize, Stream};
use prosthetic_core::platform::ConstructionStrategy;
use std::fmt::Write;

use crate::OutputFormat;
use crate::script::{EventSummary, PlaybackSummary};
use crate::util::CliResult;

pub(crate) fn render(summary: &PlaybackSummary, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

fn render_text(summary: &PlaybackSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(
        &mut output,
        "Timing: {} ({} timers, {} events)",
        summary.timing,
        summary.timers_fired,
        summary.events.len()
    );
    for event in &summary.events {
        let _ = writeln!(&mut output, "{}", event_line(event));
    }
    for finger in &summary.fingers {
        let state = &finger.state;
        let _ = writeln!(
            &mut output,
            "Finger {} [{}] at ({:.1}, {:.1}) {}",
            finger.id,
            finger.mode,
            state.x,
            state.y,
            if state.down { "down" } else { "up" }
        );
    }
    output.trim_end().to_owned()
}

fn event_line(event: &EventSummary) -> String {
    let time = format!("{:>8.1} ms", event.time_stamp_ms);
    let name = format!("{:<12}", event.event_type);
    format!(
        "{} {} -> element {} ({})",
        time.if_supports_color(Stream::Stdout, |text| text.dimmed().to_string()),
        name.if_supports_color(Stream::Stdout, |text| text.bold().fg_rgb::<79, 166, 255>().to_string()),
        event.target,
        strategy_label(event)
    )
}

fn strategy_label(event: &EventSummary) -> &'static str {
    match event.strategy {
        ConstructionStrategy::Constructor => "constructor",
        ConstructionStrategy::LegacyInit => "legacy-init",
        ConstructionStrategy::Unavailable => "unavailable",
    }
}
