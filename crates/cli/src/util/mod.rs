use prosthetic_runtime::{TimingPolicy, millis};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub type CliResult<T> = anyhow::Result<T>;

pub fn parse_timing_arg(value: &str) -> Result<TimingPolicy, String> {
    value.parse().map_err(|err: prosthetic_runtime::ConfigError| err.to_string())
}

pub fn parse_log_filter(value: &str) -> Result<String, String> {
    EnvFilter::try_new(value).map_err(|err| format!("invalid log filter '{value}': {err}"))?;
    Ok(value.to_owned())
}

/// Milliseconds from a script, rejecting negative and non-finite values.
pub fn script_millis(value: f64) -> CliResult<Duration> {
    Ok(millis(value)?)
}
