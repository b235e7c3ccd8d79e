//! # Toolsmith
//!
//! An agentic query processor. Given a natural-language query it works out
//! which capabilities ("tools") are needed, asks a language model to author
//! any that are missing, registers them at runtime, and dispatches the query
//! to the first capability that produces an answer.
//!
//! Synthesized capabilities are declarative YAML tool documents that run one
//! of a few whitelisted entry points (a text template, an arithmetic
//! formula, or a single HTTP request). Arithmetic goes through a small
//! recursive-descent evaluator, never a general-purpose interpreter.
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolsmith::{EngineConfig, InMemoryCredentialStore, OpenAICompatibleClient, Orchestrator};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::from_env()?;
//! let llm = Arc::new(OpenAICompatibleClient::from_config(&config)?);
//! let orchestrator = Orchestrator::new(llm, Arc::new(InMemoryCredentialStore::new()), &config);
//! let result = orchestrator.process("What is 6 times 7?").await;
//! println!("{}", result.final_answer);
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod evaluator;
pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod synthesis;
pub mod utilities;

#[cfg(test)]
pub(crate) mod testing;

pub use capabilities::{Capability, CapabilityError, CapabilityRegistry, InputMode, CALCULATOR};
pub use config::{ConfigError, EngineConfig};
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use dispatch::{DispatchEngine, DispatchOutcome, DispatchReport, FailureNote};
pub use evaluator::{evaluate, EvaluationError};
pub use llm::{CompletionProvider, LlmError, OpenAICompatibleClient};
pub use orchestrator::{Orchestrator, PendingCredential, ProcessOutcome, ProcessResult, TraceStep};
pub use planner::{CapabilityPlanner, PlanError, PlannerFallback, NO_CAPABILITY};
pub use synthesis::{
    BatchReport, CodeSynthesisLoader, CredentialGap, SynthesisError, SynthesisFailure,
    Synthesizer,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
