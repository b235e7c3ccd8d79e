//! Capability planner: which capabilities does a query need?
//!
//! Arithmetic queries take a keyword fast path straight to the calculator
//! without an LLM round-trip. Everything else goes through the
//! capability-listing prompt, one capability name per response line.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::CALCULATOR;
use crate::llm::{CompletionProvider, LlmError};
use crate::utilities::prompts;

/// Sentinel plan entry meaning "no capability applies".
pub const NO_CAPABILITY: &str = "NoCapability";

/// Lowercased substrings that route a query to the calculator.
const ARITHMETIC_KEYWORDS: &[&str] = &[
    "add",
    "subtract",
    "multiply",
    "divide",
    "compute",
    "+",
    "-",
    "*",
    "/",
    "sqrt",
    "square root",
];

/// Narrative lead-ins the model sometimes prefixes its list with.
const PREAMBLE_PREFIXES: &[&str] = &["Based on", "This tool", "These tools"];

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("capability planning failed: {0}")]
    Completion(#[from] LlmError),
}

/// What to plan when the model names nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerFallback {
    /// Fall back to the built-in calculator.
    #[default]
    Calculator,
    /// Fall back to the [`NO_CAPABILITY`] sentinel.
    NoCapability,
}

impl PlannerFallback {
    /// The single-entry plan for this fallback.
    pub fn plan(self) -> Vec<String> {
        match self {
            Self::Calculator => vec![CALCULATOR.to_string()],
            Self::NoCapability => vec![NO_CAPABILITY.to_string()],
        }
    }
}

impl FromStr for PlannerFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "calculator" => Ok(Self::Calculator),
            "no_capability" | "nocapability" | "none" => Ok(Self::NoCapability),
            other => Err(format!("unknown planner fallback '{}'", other)),
        }
    }
}

impl fmt::Display for PlannerFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calculator => write!(f, "calculator"),
            Self::NoCapability => write!(f, "no_capability"),
        }
    }
}

/// Whether `query` hits the arithmetic fast path.
pub fn is_arithmetic(query: &str) -> bool {
    let lowered = query.to_lowercase();
    ARITHMETIC_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Parse a capability-listing response into names, order preserved.
pub fn parse_capability_list(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !PREAMBLE_PREFIXES.iter().any(|p| line.starts_with(p)))
        .map(str::to_string)
        .collect()
}

/// Decides which capabilities a query needs.
pub struct CapabilityPlanner {
    llm: Arc<dyn CompletionProvider>,
    temperature: f64,
    fallback: PlannerFallback,
}

impl CapabilityPlanner {
    pub fn new(llm: Arc<dyn CompletionProvider>, temperature: f64, fallback: PlannerFallback) -> Self {
        Self {
            llm,
            temperature,
            fallback,
        }
    }

    pub fn fallback(&self) -> PlannerFallback {
        self.fallback
    }

    /// Plan `query`. The result is never empty.
    pub async fn plan(&self, query: &str) -> Result<Vec<String>, PlanError> {
        if is_arithmetic(query) {
            log::debug!("Arithmetic fast path for query");
            return Ok(vec![CALCULATOR.to_string()]);
        }

        let response = self
            .llm
            .complete(&prompts::tool_list_prompt(query), self.temperature)
            .await?;
        let names = parse_capability_list(&response);
        if names.is_empty() {
            log::debug!("Model named no capabilities; using {} fallback", self.fallback);
            return Ok(self.fallback.plan());
        }
        Ok(names)
    }
}

impl fmt::Debug for CapabilityPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityPlanner")
            .field("model", &self.llm.model_name())
            .field("temperature", &self.temperature)
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn planner(responses: &[&str], fallback: PlannerFallback) -> (CapabilityPlanner, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm::new(
            responses.iter().map(|s| s.to_string()).collect(),
        ));
        (CapabilityPlanner::new(llm.clone(), 0.7, fallback), llm)
    }

    #[tokio::test]
    async fn test_fast_path_skips_llm() {
        let (planner, llm) = planner(&[], PlannerFallback::Calculator);
        for query in ["2 + 2", "Compute 3 times 4", "square root of 16", "ADD 1 and 2"] {
            assert_eq!(planner.plan(query).await.unwrap(), vec![CALCULATOR.to_string()]);
        }
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_fast_path_is_idempotent() {
        let (planner, _) = planner(&[], PlannerFallback::NoCapability);
        let first = planner.plan("multiply 6 by 7").await.unwrap();
        let second = planner.plan("multiply 6 by 7").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_llm_path_filters_preamble() {
        let (planner, llm) = planner(
            &["Based on the context, you need:\n\n  WeatherTool  \nThis tool fetches weather.\nGeoTool\n"],
            PlannerFallback::Calculator,
        );
        let names = planner.plan("weather in Paris").await.unwrap();
        assert_eq!(names, vec!["WeatherTool".to_string(), "GeoTool".to_string()]);
        assert!(llm.prompts()[0].contains("weather in Paris"));
    }

    #[tokio::test]
    async fn test_empty_response_uses_fallback() {
        let (calc_planner, _) =
            planner(&["These tools are not needed.\n"], PlannerFallback::Calculator);
        assert_eq!(calc_planner.plan("hello").await.unwrap(), vec![CALCULATOR.to_string()]);

        let (sentinel_planner, _) = planner(&["   \n"], PlannerFallback::NoCapability);
        assert_eq!(
            sentinel_planner.plan("hello").await.unwrap(),
            vec![NO_CAPABILITY.to_string()]
        );
    }

    #[tokio::test]
    async fn test_llm_error_surfaces() {
        let (planner, _) = planner(&[], PlannerFallback::Calculator);
        assert!(matches!(
            planner.plan("tell me a joke").await,
            Err(PlanError::Completion(_))
        ));
    }

    #[test]
    fn test_fallback_from_str() {
        assert_eq!("calculator".parse::<PlannerFallback>().unwrap(), PlannerFallback::Calculator);
        assert_eq!(
            "No_Capability".parse::<PlannerFallback>().unwrap(),
            PlannerFallback::NoCapability
        );
        assert!("sometimes".parse::<PlannerFallback>().is_err());
    }
}
