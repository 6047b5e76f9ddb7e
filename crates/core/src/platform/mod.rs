mod capabilities;
mod clock;
mod error;
mod events;
mod host;
mod scheduler;

pub use capabilities::{Capabilities, ConstructionStrategy, EventFamily};
pub use clock::Clock;
pub use error::{PlatformError, PlatformErrorKind};
pub use events::{
    EventPhase, MouseEventInit, PointerEventInit, SyntheticEvent, TouchEventInit, TouchEventKind,
    TouchPoint,
};
pub use hit_test::{ElementId, HitTester};
pub use host::{EventSink, Host, HostRegistration, hosts};
pub use scheduler::{ScheduledTask, Scheduler, TimerId};

pub use crate::register_host;
