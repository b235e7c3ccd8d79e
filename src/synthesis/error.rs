//! Synthesis errors.

use serde::Serialize;
use thiserror::Error;

/// Errors that stop a synthesis attempt. None of them registers anything.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SynthesisError {
    /// The response did not carry both delimiter lines.
    #[error("malformed response")]
    MalformedResponse,

    /// The delimited payload is not well-formed YAML.
    #[error("invalid source: {diagnostic}\nGenerated code had issues: {source_text}")]
    InvalidSource {
        diagnostic: String,
        source_text: String,
    },

    /// No definition in the document carries the requested name and a `run` block.
    #[error("no matching capability definition for '{name}'")]
    NoMatchingDefinition { name: String },

    /// More than one definition carries the requested name.
    #[error("{count} definitions named '{name}'; expected exactly one")]
    AmbiguousDefinition { name: String, count: usize },

    /// The matching definition could not be turned into a capability.
    #[error("error creating capability '{name}': {message}\nGenerated code had issues: {source_text}")]
    Load {
        name: String,
        message: String,
        source_text: String,
    },

    /// The completion collaborator failed before any source was produced.
    #[error("completion failed for '{name}': {message}")]
    Completion { name: String, message: String },
}

/// Synthesis halted because credentials are missing.
///
/// Recoverable: store the credentials and synthesize again.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[error("{message}")]
pub struct CredentialGap {
    /// Capability whose installation is blocked.
    pub capability: String,
    /// First missing service; the one the caller is asked for.
    pub service: String,
    /// Every missing service, in declaration order.
    pub missing: Vec<String>,
    /// Caller-facing request text.
    pub message: String,
}

impl CredentialGap {
    /// Build a gap for `capability`. `missing` must not be empty.
    pub fn new(capability: impl Into<String>, missing: Vec<String>) -> Self {
        let service = missing.first().cloned().unwrap_or_default();
        let message = format!(
            "This tool requires an {} API key. Please provide your API key.",
            service
        );
        Self {
            capability: capability.into(),
            service,
            missing,
            message,
        }
    }
}

/// Outcome of a failed synthesis: a credential request or an error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SynthesisFailure {
    #[error(transparent)]
    CredentialGap(#[from] CredentialGap),

    #[error(transparent)]
    Error(#[from] SynthesisError),
}
