//! Orchestrator: plan, synthesize what is missing, dispatch.
//!
//! [`Orchestrator::process`] never fails. Planning errors and panics
//! anywhere in the pipeline end the pass with a `Critical error` step.

pub mod trace;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::capabilities::CapabilityRegistry;
use crate::config::EngineConfig;
use crate::credentials::CredentialStore;
use crate::dispatch::{DispatchEngine, DispatchOutcome};
use crate::llm::CompletionProvider;
use crate::planner::{CapabilityPlanner, PlanError, NO_CAPABILITY};
use crate::synthesis::{CodeSynthesisLoader, Synthesizer};

pub use trace::{DispatchTrace, PendingCredential, ProcessOutcome, ProcessResult, TraceStep};

/// Runs one query through the whole engine.
#[derive(Debug)]
pub struct Orchestrator {
    registry: Arc<CapabilityRegistry>,
    credentials: Arc<dyn CredentialStore>,
    planner: CapabilityPlanner,
    synthesizer: Synthesizer,
    dispatcher: DispatchEngine,
}

impl Orchestrator {
    /// Build an orchestrator with a fresh registry holding the built-ins.
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        credentials: Arc<dyn CredentialStore>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_registry(
            llm,
            credentials,
            Arc::new(CapabilityRegistry::with_builtins()),
            config,
        )
    }

    /// Build an orchestrator over an existing registry.
    pub fn with_registry(
        llm: Arc<dyn CompletionProvider>,
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<CapabilityRegistry>,
        config: &EngineConfig,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        let loader = CodeSynthesisLoader::new(registry.clone(), credentials.clone())
            .with_http_client(http);

        Self {
            planner: CapabilityPlanner::new(llm.clone(), config.planner_temperature, config.fallback),
            synthesizer: Synthesizer::new(llm, loader, config.synthesis_temperature),
            dispatcher: DispatchEngine::new(registry.clone()),
            registry,
            credentials,
        }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Process `query` end to end.
    pub async fn process(&self, query: &str) -> ProcessResult {
        let mut trace = DispatchTrace::new();

        let result = AssertUnwindSafe(self.run(query, &mut trace))
            .catch_unwind()
            .await;
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => critical(&mut trace, &e.to_string()),
            Err(panic) => critical(&mut trace, &panic_message(panic.as_ref())),
        };

        ProcessResult::new(trace, outcome)
    }

    /// Store a credential the caller supplied, then process `query` again.
    pub async fn provide_credential(&self, service: &str, secret: &str, query: &str) -> ProcessResult {
        self.credentials.put(service, secret);
        self.process(query).await
    }

    async fn run(&self, query: &str, trace: &mut DispatchTrace) -> Result<ProcessOutcome, PlanError> {
        trace.push(query);

        trace.push("Analyzing query to identify necessary tools.");
        let required = self.planner.plan(query).await?;
        trace.push(format!("Tools needed: {}", required.join(", ")));

        let available = self.registry.list();
        let missing: Vec<String> = required
            .iter()
            .filter(|name| name.as_str() != NO_CAPABILITY && !available.contains(name))
            .cloned()
            .collect();

        if !missing.is_empty() {
            trace.push(format!(
                "Currently available tools: {} Missing tools: {}",
                available.join(", "),
                missing.join(", ")
            ));

            let report = self.synthesizer.synthesize_missing(&missing).await;
            for name in &report.synthesized {
                trace.push(format!("Constructed tool: {}", name));
            }
            for (name, error) in &report.failures {
                trace.push(format!("Failed to construct {}: {}", name, error));
            }
            if let Some(gap) = report.gap {
                trace.push(format!("Waiting for credentials: {}", gap.missing.join(", ")));
                return Ok(ProcessOutcome::NeedsCredential {
                    service: gap.service,
                    message: gap.message,
                });
            }
        }

        trace.push(format!("Using tools to process query: {}", query));
        let report = self.dispatcher.dispatch(query, &required).await;
        for note in &report.notes {
            trace.push(note.to_string());
        }

        Ok(match report.outcome {
            DispatchOutcome::Answer(answer) => {
                trace.push(format!("Final answer: {}", answer));
                ProcessOutcome::Answer(answer)
            }
            DispatchOutcome::Failure(message) => {
                trace.push("No tool produced an answer.");
                ProcessOutcome::Failure(message)
            }
        })
    }
}

fn critical(trace: &mut DispatchTrace, message: &str) -> ProcessOutcome {
    log::error!("Critical error while processing query: {}", message);
    let text = format!("Critical error: {}", message);
    trace.push(text.clone());
    ProcessOutcome::Failure(text)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{Capability, CapabilityError, CALCULATOR};
    use crate::credentials::InMemoryCredentialStore;
    use crate::planner::PlannerFallback;
    use crate::testing::{tool_response, ScriptedLlm};
    use async_trait::async_trait;
    use serde_json::Value;

    const GREETER: &str = "tool:\n  name: Greeter\n  run: { kind: template, text: \"Hello, {query}!\" }";

    const KEYED: &str = "tool:\n  name: Secret\n  required_credentials: [Vault]\n  run: { kind: template, text: \"key=YOUR_VAULT_API_KEY\" }";

    fn orchestrator(responses: Vec<String>) -> (Orchestrator, Arc<ScriptedLlm>) {
        orchestrator_with(responses, EngineConfig::default())
    }

    fn orchestrator_with(responses: Vec<String>, config: EngineConfig) -> (Orchestrator, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(responses));
        let orchestrator = Orchestrator::new(llm.clone(), Arc::new(InMemoryCredentialStore::new()), &config);
        (orchestrator, llm)
    }

    fn descriptions(result: &ProcessResult) -> Vec<&str> {
        result.trace.iter().map(|s| s.description.as_str()).collect()
    }

    #[tokio::test]
    async fn test_arithmetic_query() {
        let (orchestrator, llm) = orchestrator(vec![]);
        let result = orchestrator.process("2 + 2").await;
        assert_eq!(result.final_answer, "4");
        assert!(result.pending_credential.is_none());
        assert_eq!(llm.calls(), 0);
        assert_eq!(
            descriptions(&result)[..4],
            [
                "2 + 2",
                "Analyzing query to identify necessary tools.",
                "Tools needed: Calculator",
                "Using tools to process query: 2 + 2",
            ]
        );
    }

    #[tokio::test]
    async fn test_synthesizes_missing_capability() {
        let (orchestrator, llm) = orchestrator(vec!["Greeter".into(), tool_response(GREETER)]);
        let result = orchestrator.process("greet Ada").await;

        assert_eq!(result.final_answer, "Hello, greet Ada!");
        assert!(orchestrator.registry().contains("Greeter"));
        assert_eq!(llm.calls(), 2);
        let steps = descriptions(&result);
        assert!(steps.contains(&"Currently available tools: Calculator Missing tools: Greeter"));
        assert!(steps.contains(&"Constructed tool: Greeter"));
    }

    #[tokio::test]
    async fn test_credential_gap_halts_before_dispatch() {
        let (orchestrator, _) = orchestrator(vec!["Secret".into(), tool_response(KEYED)]);
        let result = orchestrator.process("open the vault").await;

        let pending = result.pending_credential.clone().unwrap();
        assert_eq!(pending.service, "Vault");
        assert_eq!(result.final_answer, pending.message);
        assert!(!descriptions(&result)
            .iter()
            .any(|s| s.starts_with("Using tools")));
        assert!(!orchestrator.registry().contains("Secret"));
    }

    #[tokio::test]
    async fn test_provide_credential_reprocesses() {
        let (orchestrator, _) = orchestrator(vec![
            "Secret".into(),
            tool_response(KEYED),
            "Secret".into(),
            tool_response(KEYED),
        ]);
        let first = orchestrator.process("open the vault").await;
        assert!(first.pending_credential.is_some());

        let second = orchestrator
            .provide_credential("Vault", "s3cr3t", "open the vault")
            .await;
        assert_eq!(second.final_answer, "key=s3cr3t");
        assert!(second.is_answer());
    }

    #[tokio::test]
    async fn test_synthesis_failure_falls_through_to_dispatch_failure() {
        let (orchestrator, _) = orchestrator(vec!["Greeter".into(), "no delimiters".into()]);
        let result = orchestrator.process("greet Ada").await;

        assert!(!result.is_answer());
        assert_eq!(result.final_answer, "Greeter: capability not found");
        assert!(descriptions(&result)
            .iter()
            .any(|s| s.starts_with("Failed to construct Greeter: malformed response")));
    }

    #[tokio::test]
    async fn test_sentinel_is_never_synthesized() {
        let mut config = EngineConfig::default();
        config.fallback = PlannerFallback::NoCapability;
        let (orchestrator, llm) = orchestrator_with(vec!["\n".into()], config);

        let result = orchestrator.process("hello there").await;
        assert_eq!(llm.calls(), 1);
        assert_eq!(result.final_answer, "NoCapability: capability not found");
    }

    #[tokio::test]
    async fn test_planning_error_is_critical() {
        let (orchestrator, _) = orchestrator(vec![]);
        let result = orchestrator.process("tell me a story").await;
        let last = result.trace.last().unwrap();
        assert!(last.description.starts_with("Critical error:"));
        assert_eq!(result.final_answer, last.description);
    }

    #[derive(Debug)]
    struct Panicky;

    #[async_trait]
    impl Capability for Panicky {
        fn name(&self) -> &str {
            CALCULATOR
        }

        fn description(&self) -> &str {
            "panics"
        }

        async fn run(&self, _input: Option<&str>) -> Result<Value, CapabilityError> {
            panic!("capability blew up");
        }
    }

    #[tokio::test]
    async fn test_panics_are_caught() {
        let (orchestrator, _) = orchestrator(vec![]);
        orchestrator.registry().register(Arc::new(Panicky));

        let result = orchestrator.process("1 + 1").await;
        assert_eq!(result.final_answer, "Critical error: capability blew up");
        assert_eq!(
            result.trace.last().unwrap().description,
            "Critical error: capability blew up"
        );
    }
}
