//! # Capability Registry
//!
//! Capabilities are the named units of behavior a query is dispatched to.
//! The registry starts with the built-in calculator and grows at runtime as
//! the synthesis loader installs LLM-authored capabilities.
//!
//! ## Resolution Flow
//!
//! 1. The planner names the capabilities a query needs
//! 2. `CapabilityRegistry::contains` separates present from missing names
//! 3. Missing names go through synthesis and `CapabilityRegistry::register`
//! 4. The dispatch engine resolves each name with `CapabilityRegistry::lookup`

pub mod calculator;
pub mod capability;
pub mod registry;

pub use calculator::{CalculatorCapability, CALCULATOR};
pub use capability::{Capability, CapabilityError, InputMode};
pub use registry::CapabilityRegistry;
