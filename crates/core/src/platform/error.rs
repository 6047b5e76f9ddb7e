use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by a host while hit testing or delivering an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl Error for PlatformError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformErrorKind {
    /// The host has no way to build events of the requested family.
    CapabilityUnavailable,
    /// The host could not construct or deliver an event.
    DispatchFailed,
    /// Hit testing found no element and the caller required one.
    NoElement,
}

impl PlatformErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            PlatformErrorKind::CapabilityUnavailable => "capability unavailable",
            PlatformErrorKind::DispatchFailed => "dispatch failed",
            PlatformErrorKind::NoElement => "no element",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn display_names_kind_and_message() {
        let err = PlatformError::new(PlatformErrorKind::NoElement, "nothing under (3, 4)");
        assert_eq!(err.to_string(), "no element: nothing under (3, 4)");
    }
}
