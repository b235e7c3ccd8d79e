//! Capability definition: the unit of invocable behavior.
//!
//! A capability is a named, self-describing unit that declares:
//! - What it does (`description`, shown to the LLM and in traces)
//! - Which external credentials it needs before it can be installed
//! - Whether it consumes the query text or runs without input
//!
//! Capabilities are either compiled in (the calculator) or installed at
//! runtime by the synthesis loader. Either way they reach the
//! [`CapabilityRegistry`](super::CapabilityRegistry) fully constructed.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::evaluator::EvaluationError;

/// How a capability wants its entry point invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// `run` receives the raw query text.
    #[default]
    Query,
    /// `run` is invoked with no argument.
    #[serde(rename = "none", alias = "no_input")]
    NoInput,
}

/// Errors a capability raises while running.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The arithmetic evaluator rejected the input.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The capability needed input but was called without any.
    #[error("capability '{0}' requires query input")]
    MissingInput(String),

    /// Outbound HTTP call failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The capability produced something it could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Any other execution failure.
    #[error("{0}")]
    Execution(String),
}

impl From<reqwest::Error> for CapabilityError {
    /// The request URL may carry substituted credentials, so it is dropped.
    fn from(e: reqwest::Error) -> Self {
        CapabilityError::Http(e.without_url().to_string())
    }
}

/// A named unit of runtime behavior invocable on a query.
#[async_trait]
pub trait Capability: Send + Sync + fmt::Debug {
    /// Unique name within the registry (case-sensitive).
    fn name(&self) -> &str;

    /// Human/LLM-facing summary.
    fn description(&self) -> &str;

    /// Credential-service identifiers this capability needs, in declaration order.
    fn required_credentials(&self) -> &[String] {
        &[]
    }

    /// Whether `run` takes the query.
    fn input_mode(&self) -> InputMode {
        InputMode::Query
    }

    /// Execute the capability. `input` is `Some` exactly when
    /// [`input_mode`](Self::input_mode) is [`InputMode::Query`].
    ///
    /// Results are a string, a number, or a mapping.
    async fn run(&self, input: Option<&str>) -> Result<Value, CapabilityError>;
}
