use std::time::Duration;

/// Monotonic time source. Timestamps are offsets from a host defined origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}
