//! Capability synthesis: turning LLM-authored tool documents into live
//! capabilities.
//!
//! - [`definition`]: the YAML tool document schema
//! - [`placeholders`]: credential placeholder detection and substitution
//! - [`runtime`]: the whitelisted entry points a synthesized capability runs
//! - [`loader`]: the validation gate in front of the registry
//! - [`synthesizer`]: LLM round-trips, batches, per-name deduplication

pub mod definition;
pub mod error;
pub mod loader;
pub mod placeholders;
pub mod runtime;
pub mod synthesizer;

pub use definition::{HttpMethod, RunSpec, ToolDefinition, ToolDocument};
pub use error::{CredentialGap, SynthesisError, SynthesisFailure};
pub use loader::{extract_payload, CodeSynthesisLoader};
pub use runtime::SynthesizedCapability;
pub use synthesizer::{BatchReport, SynthesisStatus, Synthesizer};
