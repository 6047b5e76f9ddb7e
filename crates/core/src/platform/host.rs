use super::{Capabilities, Clock, ElementId, HitTester, PlatformError, Scheduler, SyntheticEvent};

/// Builds native event objects from descriptors and delivers them.
pub trait EventSink: Send + Sync {
    /// Construction APIs the host supports. Only the sink's own construction
    /// strategy depends on this; scheduling does not.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn dispatch(&self, target: ElementId, event: &SyntheticEvent) -> Result<(), PlatformError>;
}

/// Everything a hand needs from its environment.
pub trait Host: Clock + Scheduler + HitTester + EventSink {
    fn name(&self) -> &'static str;
}

pub struct HostRegistration {
    pub host: &'static dyn Host,
}

inventory::collect!(HostRegistration);

pub fn hosts() -> impl Iterator<Item = &'static dyn Host> {
    inventory::iter::<HostRegistration>.into_iter().map(|entry| entry.host)
}

#[macro_export]
macro_rules! register_host {
    ($host:expr) => {
        inventory::submit! {
            $crate::platform::HostRegistration { host: $host }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformErrorKind, ScheduledTask, TimerId};
    use crate::types::Point;
    use rstest::rstest;
    use std::time::Duration;

    struct StubHost;

    impl Clock for StubHost {
        fn now(&self) -> Duration {
            Duration::from_millis(42)
        }
    }

    impl Scheduler for StubHost {
        fn schedule_after(&self, _delay: Duration, _task: ScheduledTask) -> TimerId {
            TimerId::new(1)
        }

        fn schedule_frame(&self, _task: ScheduledTask) -> TimerId {
            TimerId::new(2)
        }

        fn cancel(&self, _id: TimerId) {}
    }

    impl HitTester for StubHost {
        fn element_at(&self, _point: Point) -> Option<ElementId> {
            None
        }

        fn root(&self) -> ElementId {
            ElementId::new(0)
        }
    }

    impl EventSink for StubHost {
        fn dispatch(
            &self,
            _target: ElementId,
            event: &SyntheticEvent,
        ) -> Result<(), PlatformError> {
            Err(PlatformError::new(PlatformErrorKind::DispatchFailed, event.type_name()))
        }
    }

    impl Host for StubHost {
        fn name(&self) -> &'static str {
            "stub"
        }
    }

    static STUB_HOST: StubHost = StubHost;

    register_host!(&STUB_HOST);

    #[rstest]
    fn registration_exposes_host() {
        let names: Vec<_> = hosts().map(|host| host.name()).collect();
        assert!(names.contains(&"stub"));
    }

    #[rstest]
    fn default_capabilities_enable_everything() {
        assert_eq!(STUB_HOST.capabilities(), Capabilities::all());
    }
}
