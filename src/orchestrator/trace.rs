//! Processing trace and caller-facing result shape.

use serde::{Deserialize, Serialize};

/// One human-readable processing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub description: String,
}

/// Append-only list of steps for one processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTrace {
    steps: Vec<TraceStep>,
}

impl DispatchTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, description: impl Into<String>) {
        let description = description.into();
        log::debug!("trace: {}", description);
        self.steps.push(TraceStep { description });
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<TraceStep> {
        self.steps
    }
}

/// Exactly one per processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Answer(String),
    NeedsCredential { service: String, message: String },
    Failure(String),
}

/// A credential the caller is asked to supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCredential {
    pub service: String,
    pub message: String,
}

/// What [`Orchestrator::process`](super::Orchestrator::process) returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub trace: Vec<TraceStep>,
    pub final_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_credential: Option<PendingCredential>,
    #[serde(skip)]
    pub outcome: ProcessOutcome,
}

impl ProcessResult {
    pub fn new(trace: DispatchTrace, outcome: ProcessOutcome) -> Self {
        let (final_answer, pending_credential) = match &outcome {
            ProcessOutcome::Answer(text) | ProcessOutcome::Failure(text) => (text.clone(), None),
            ProcessOutcome::NeedsCredential { service, message } => (
                message.clone(),
                Some(PendingCredential {
                    service: service.clone(),
                    message: message.clone(),
                }),
            ),
        };
        Self {
            trace: trace.into_steps(),
            final_answer,
            pending_credential,
            outcome,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self.outcome, ProcessOutcome::Answer(_))
    }
}
