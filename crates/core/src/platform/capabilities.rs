use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Event construction APIs a host declares as natively available.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct Capabilities: u8 {
        const MOUSE = 1;
        const TOUCH = 1 << 1;
        const POINTER = 1 << 2;
        /// Event objects can be built through constructors instead of the
        /// legacy create-then-init calls.
        const EVENT_CONSTRUCTORS = 1 << 3;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::all()
    }
}

/// Event object families, one per construction code path in a host adapter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventFamily {
    Mouse,
    Pointer,
    Touch,
}

impl EventFamily {
    const fn capability(self) -> Capabilities {
        match self {
            EventFamily::Mouse => Capabilities::MOUSE,
            EventFamily::Pointer => Capabilities::POINTER,
            EventFamily::Touch => Capabilities::TOUCH,
        }
    }
}

/// How a host adapter builds native event objects for one family.
///
/// Selected once per family from the capability table; the scheduling core never
/// inspects it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructionStrategy {
    /// `new TouchEvent(...)`-style constructors.
    Constructor,
    /// Create an untyped event and initialise it field by field.
    LegacyInit,
    /// The host offers no way to build this family.
    Unavailable,
}

impl ConstructionStrategy {
    pub fn select(capabilities: Capabilities, family: EventFamily) -> Self {
        if !capabilities.contains(family.capability()) {
            ConstructionStrategy::Unavailable
        } else if capabilities.contains(Capabilities::EVENT_CONSTRUCTORS) {
            ConstructionStrategy::Constructor
        } else {
            ConstructionStrategy::LegacyInit
        }
    }
}
