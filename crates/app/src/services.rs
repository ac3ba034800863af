//! Application services (use-cases).

pub mod actuation;
pub mod gateway_handle;
pub mod gateway_service;
pub mod relay_service;
