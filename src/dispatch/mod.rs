//! Dispatch engine: try planned capabilities in order until one answers.
//!
//! A missing capability, a capability error, an empty result, or a result
//! that starts with `Error` each leave a [`FailureNote`] and move on to the
//! next name. The first real answer ends the dispatch.

pub mod shaping;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::capabilities::{Capability, CapabilityRegistry, InputMode, CALCULATOR};
use crate::utilities::format_value;

pub use shaping::{shape_calculator_input, ShapedInput};

/// Answer text used when no capability left a note.
pub const NO_SUITABLE_TOOL: &str = "Error: No suitable tool found to process the query";

const NO_NUMBERS: &str = "Error: No numbers found in query";
const NO_OPERATION: &str = "Error: No operation found in query";

/// Why one capability did not produce the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureNote {
    pub capability: String,
    pub message: String,
}

impl FailureNote {
    fn new(capability: &str, message: impl Into<String>) -> Self {
        Self {
            capability: capability.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.capability, self.message)
    }
}

/// Final state of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A capability produced this answer text.
    Answer(String),
    /// Every candidate failed; newline-joined notes or [`NO_SUITABLE_TOOL`].
    Failure(String),
}

impl DispatchOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::Failure(text) => text,
        }
    }
}

/// Outcome plus the notes collected on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub notes: Vec<FailureNote>,
}

/// Runs planned capabilities against a query.
#[derive(Debug, Clone)]
pub struct DispatchEngine {
    registry: Arc<CapabilityRegistry>,
}

impl DispatchEngine {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// Try each name in `names` in order. Never fails.
    pub async fn dispatch(&self, query: &str, names: &[String]) -> DispatchReport {
        let mut notes = Vec::new();

        for name in names {
            let Some(capability) = self.registry.lookup(name) else {
                log::debug!("Capability {} is not registered", name);
                notes.push(FailureNote::new(name, "capability not found"));
                continue;
            };

            match self.attempt(capability.as_ref(), query).await {
                Ok(answer) => {
                    log::debug!("{} answered the query", name);
                    return DispatchReport {
                        outcome: DispatchOutcome::Answer(answer),
                        notes,
                    };
                }
                Err(message) => {
                    log::debug!("{} failed: {}", name, message);
                    notes.push(FailureNote::new(name, message));
                }
            }
        }

        let message = if notes.is_empty() {
            NO_SUITABLE_TOOL.to_string()
        } else {
            notes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        };
        DispatchReport {
            outcome: DispatchOutcome::Failure(message),
            notes,
        }
    }

    async fn attempt(&self, capability: &dyn Capability, query: &str) -> Result<String, String> {
        let input = if capability.name() == CALCULATOR {
            match shape_calculator_input(query) {
                ShapedInput::Expression(expression) => Some(expression),
                ShapedInput::Literal(literal) => return Ok(literal),
                ShapedInput::NoNumbers => return Err(NO_NUMBERS.to_string()),
                ShapedInput::NoOperation => return Err(NO_OPERATION.to_string()),
            }
        } else {
            match capability.input_mode() {
                InputMode::Query => Some(query.to_string()),
                InputMode::NoInput => None,
            }
        };

        let value = capability
            .run(input.as_deref())
            .await
            .map_err(|e| e.to_string())?;
        let text = format_value(&value);
        if text.trim().is_empty() {
            Err("empty result".to_string())
        } else if text.starts_with("Error") {
            Err(text)
        } else {
            Ok(text)
        }
    }
}
