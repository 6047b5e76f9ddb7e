//! Core types and host traits shared by the prosthetic-hand crates.
//!
//! The runtime only talks to a host through the traits in [`platform`]; concrete
//! hosts (a browser bridge, a compositor test harness, the in-memory mock) implement
//! them and may register a static instance with [`register_host!`].

pub mod input;
pub mod platform;
pub mod types;
