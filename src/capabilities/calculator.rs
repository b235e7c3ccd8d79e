//! Built-in arithmetic capability wrapping the expression evaluator.

use async_trait::async_trait;
use serde_json::Value;

use super::capability::{Capability, CapabilityError, InputMode};
use crate::evaluator;

/// Name under which the calculator is registered.
pub const CALCULATOR: &str = "Calculator";

const DESCRIPTION: &str = "Use this tool to perform basic arithmetic operations. \
     Supported operations: addition (+), subtraction (-), multiplication (*), \
     division (/), exponentiation (**), and modulo (%). \
     Provide the expression as a string.";

/// The always-present calculator capability.
#[derive(Debug, Clone, Default)]
pub struct CalculatorCapability;

impl CalculatorCapability {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Capability for CalculatorCapability {
    fn name(&self) -> &str {
        CALCULATOR
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn input_mode(&self) -> InputMode {
        InputMode::Query
    }

    async fn run(&self, input: Option<&str>) -> Result<Value, CapabilityError> {
        let expression = input.ok_or_else(|| CapabilityError::MissingInput(CALCULATOR.to_string()))?;
        let value = evaluator::evaluate(expression)?;
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .ok_or(CapabilityError::Evaluation(evaluator::EvaluationError::NonFinite))
    }
}
