use prosthetic_core::platform::PlatformError;
use thiserror::Error;

use crate::finger::FingerId;

/// Rejected movement parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("duration must be finite and non-negative, got {0} ms")]
    InvalidDuration(f64),
    #[error("coordinates must be finite, got ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },
    #[error("finger state update contains non-finite values")]
    NonFiniteState,
    #[error("movement end time overflows the host clock")]
    Overflow,
}

/// Invalid hand configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "unknown timing policy '{0}' (expected '<N>ms', 'frame', 'minimal', 'instant' or 'fastframe')"
    )]
    UnknownTiming(String),
    #[error("timing interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandError {
    #[error("no Host registered")]
    MissingHost,
    #[error("the hand owning finger {0} has been released")]
    OwnerReleased(FingerId),
    #[error("hand has been shut down")]
    ShutDown,
    #[error("hand is faulted after a failed tick: {0}")]
    Faulted(String),
    #[error("host operation failed: {0}")]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Motion(#[from] MotionError),
}
