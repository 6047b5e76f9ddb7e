mod mode;
mod state;

pub use mode::{InputMode, PointerKind};
pub use state::{FingerState, FingerUpdate};
