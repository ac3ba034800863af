//! # dehum-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `BusPublisher` / `BusSubscriber`: topic-addressed publish/subscribe
//!   - `ActuatorIo`: one output pin paired with its feedback input
//! - Define **driving/inbound use-cases**:
//!   - `GatewayService`: operator commands in, state transitions out
//!   - `RelayService`: state transitions in, verified actuations out
//! - Provide **in-process infrastructure** (event bus, gateway dispatcher)
//!   that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `dehum-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;
