//! Pin implementations: simulated relay contact and logical-only output.

mod logical;
mod relay;

pub use logical::LogicalPin;
pub use relay::{Fault, VirtualPin, VirtualPinError, VirtualProbe};
