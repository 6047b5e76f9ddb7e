//! In-memory mock host for prosthetic-hand tests.
//!
//! [`MockHost`] runs on a virtual clock that only moves when a test advances
//! it. Timers and frame callbacks fire in due order while advancing, hit testing
//! works on a list of rectangles and every delivered event is recorded.

mod host;

pub use host::{DispatchRecord, MockHost, MockSettings, ROOT_ELEMENT};

use prosthetic_core::register_host;

static MOCK_HOST: MockHost = MockHost::new();

register_host!(&MOCK_HOST);

/// The statically registered mock host.
pub fn mock_host() -> &'static MockHost {
    &MOCK_HOST
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosthetic_core::platform::{Clock, hosts};
    use rstest::rstest;
    use serial_test::serial;
    use std::time::Duration;

    #[rstest]
    fn mock_host_is_registered() {
        let names: Vec<_> = hosts().map(|host| host.name()).collect();
        assert!(names.contains(&MockHost::NAME));
    }

    #[rstest]
    #[serial]
    fn static_host_resets_between_uses() {
        let host = mock_host();
        host.reset();
        host.advance_by(Duration::from_millis(30));
        assert_eq!(host.now(), Duration::from_millis(30));

        host.reset();
        assert_eq!(host.now(), Duration::ZERO);
        assert_eq!(host.pending_timers(), 0);
    }
}
