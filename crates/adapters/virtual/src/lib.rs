//! # dehum-adapter-virtual
//!
//! Actuator pins that need no hardware, for demos, standalone runs and tests.
//!
//! ## Provided pins
//!
//! | Pin | Feedback | Use |
//! |-----|----------|-----|
//! | [`VirtualPin`] | follows the output unless a [`Fault`] is injected | simulated relay contact |
//! | [`LogicalPin`] | echoes the last write | groups with no feedback wiring |
//!
//! ## Dependency rule
//!
//! Depends on `dehum-app` (port traits) and `dehum-domain` only.

mod pins;

pub use pins::{Fault, LogicalPin, VirtualPin, VirtualPinError, VirtualProbe};
