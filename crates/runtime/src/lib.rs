//! Finger timelines and the hand that drives them.
//!
//! A [`Hand`] grows [`Finger`]s, each with its own queue of timed
//! [`Movement`]s. The hand ticks against a [`Host`](prosthetic_core::platform::Host)
//! according to its [`TimingPolicy`], turns per-finger transitions into mouse,
//! pointer and touch events and hands them to the host for dispatch.

mod aggregate;
mod config;
mod error;
mod finger;
mod hand;
mod movement;
mod timing;

#[cfg(test)]
mod test_support;

pub use aggregate::{Dispatch, TickReport};
pub use config::{FallbackPolicy, HandConfig, TouchEndTarget};
pub use error::{ConfigError, HandError, MotionError};
pub use finger::{Finger, FingerId, Transition, TransitionKind};
pub use hand::{Hand, HandBuilder, LifecycleCallback};
pub use movement::{Easing, Movement, millis};
pub use timing::TimingPolicy;
