//! # dehum-domain
//!
//! Pure domain model for the dehum actuator interlock.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **actuator groups** (dehumidifier, fan, green LED, red LED)
//! - Define **commands** (the closed operator vocabulary) and their parsing
//! - Define the **interlock state machine**: a single pure transition function
//!   shared by the operator gateway and every actuator relay
//! - Define **bus messages** (state transitions, actuation results) and their
//!   JSON wire format
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod group;
pub mod interlock;
pub mod message;
