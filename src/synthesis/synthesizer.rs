//! Synthesis driver: asks the LLM for tool documents and feeds the loader.
//!
//! Batches run sequentially. The first credential gap halts the batch;
//! every other failure is recorded and the next name is attempted. At most
//! one synthesis per capability name is in flight at a time.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::llm::CompletionProvider;
use crate::utilities::prompts;

use super::error::{CredentialGap, SynthesisError, SynthesisFailure};
use super::loader::CodeSynthesisLoader;

/// What happened to a single name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStatus {
    /// A new capability was generated and registered.
    Installed,
    /// The name was registered by the time the per-name lock was acquired.
    AlreadyRegistered,
}

/// Result of one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Names that were installed, in order.
    pub synthesized: Vec<String>,
    /// Names that failed with a non-credential error.
    pub failures: Vec<(String, SynthesisError)>,
    /// The gap that halted the batch, if any.
    pub gap: Option<CredentialGap>,
}

impl BatchReport {
    pub fn halted(&self) -> bool {
        self.gap.is_some()
    }
}

/// Generates missing capabilities through the LLM collaborator.
pub struct Synthesizer {
    llm: Arc<dyn CompletionProvider>,
    loader: CodeSynthesisLoader,
    temperature: f64,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn CompletionProvider>, loader: CodeSynthesisLoader, temperature: f64) -> Self {
        Self {
            llm,
            loader,
            temperature,
            in_flight: DashMap::new(),
        }
    }

    pub fn loader(&self) -> &CodeSynthesisLoader {
        &self.loader
    }

    /// Synthesize each name in order.
    pub async fn synthesize_missing(&self, names: &[String]) -> BatchReport {
        let mut report = BatchReport::default();
        for name in names {
            match self.synthesize_one(name).await {
                Ok(SynthesisStatus::Installed) => report.synthesized.push(name.clone()),
                Ok(SynthesisStatus::AlreadyRegistered) => {}
                Err(SynthesisFailure::CredentialGap(gap)) => {
                    report.gap = Some(gap);
                    break;
                }
                Err(SynthesisFailure::Error(e)) => {
                    log::warn!("Synthesis of {} failed: {}", name, e);
                    report.failures.push((name.clone(), e));
                }
            }
        }
        report
    }

    /// Generate and install one capability, unless it is already registered.
    pub async fn synthesize_one(&self, name: &str) -> Result<SynthesisStatus, SynthesisFailure> {
        let lock = self
            .in_flight
            .entry(name.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.generate_and_load(name).await
        };

        drop(lock);
        self.in_flight
            .remove_if(name, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn generate_and_load(&self, name: &str) -> Result<SynthesisStatus, SynthesisFailure> {
        if self.loader.registry().contains(name) {
            log::debug!("{} was registered while waiting; skipping synthesis", name);
            return Ok(SynthesisStatus::AlreadyRegistered);
        }

        log::debug!("Requesting source for {} from {}", name, self.llm.model_name());
        let prompt = prompts::tool_constructor_prompt(name);
        let response = self
            .llm
            .complete(&prompt, self.temperature)
            .await
            .map_err(|e| SynthesisError::Completion {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        self.loader.synthesize(name, &response)?;
        Ok(SynthesisStatus::Installed)
    }
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("model", &self.llm.model_name())
            .field("temperature", &self.temperature)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
