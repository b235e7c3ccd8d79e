//! Restricted arithmetic expression evaluator.
//!
//! Evaluates numeric literals, the operators `+ - * / ** % ^`, parentheses,
//! and the whitelisted math namespace (`sqrt`, `log`, `pi`, ...). Nothing else
//! resolves: there is no name lookup, import, or I/O surface to reach.
//!
//! Failures are returned as [`EvaluationError`] values; the evaluator never
//! panics on user input.

pub mod parser;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use parser::{parse, Expr};

static FIRST_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// Errors produced while evaluating an expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    /// A square-root request carried no numeric literal.
    #[error("no operand")]
    NoOperand,

    /// The expression was empty after normalization.
    #[error("empty expression")]
    Empty,

    /// The expression is not well-formed.
    #[error("invalid syntax at position {position}: {message}")]
    Syntax { message: String, position: usize },

    /// The expression referenced a name outside the whitelist.
    #[error("name '{0}' is not defined")]
    UnknownName(String),

    /// Wrong number of arguments to a whitelisted function.
    #[error("{function}() got {found} argument(s)")]
    Arity { function: String, found: usize },

    #[error("division by zero")]
    DivisionByZero,

    /// Argument outside a function's mathematical domain.
    #[error("math domain error in {0}")]
    Domain(String),

    /// The result overflowed or is not a number.
    #[error("result is not a finite number")]
    NonFinite,
}

/// Returns true when the text asks for a square root.
pub fn is_square_root_request(expr: &str) -> bool {
    let lower = expr.to_lowercase();
    lower.contains("sqrt") || lower.contains("square root")
}

/// Evaluate a calculator request.
///
/// Square-root requests (`sqrt` or "square root" anywhere in the text) take
/// the square root of the first numeric literal in the string. Everything
/// else has `^` normalized to `**` and is evaluated by [`evaluate_expression`].
pub fn evaluate(expr: &str) -> Result<f64, EvaluationError> {
    if is_square_root_request(expr) {
        let operand = FIRST_LITERAL
            .find(expr)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or(EvaluationError::NoOperand)?;
        log::debug!("evaluate: square root of {}", operand);
        return finite(operand.sqrt());
    }

    let normalized = expr.replace('^', "**");
    evaluate_expression(normalized.trim())
}

/// Evaluate an expression against the grammar in [`parser`], with no
/// square-root shortcut and no `^` rewriting.
pub fn evaluate_expression(expr: &str) -> Result<f64, EvaluationError> {
    let tree = parse(expr)?;
    finite(tree.eval()?)
}

fn finite(value: f64) -> Result<f64, EvaluationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operators() {
        assert_eq!(evaluate("2 + 2").unwrap(), 4.0);
        assert_eq!(evaluate("10 - 4").unwrap(), 6.0);
        assert_eq!(evaluate("6 * 7").unwrap(), 42.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
        assert_eq!(evaluate("2 ** 10").unwrap(), 1024.0);
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
        assert_eq!(evaluate("  1.5 * 4 ").unwrap(), 6.0);
    }

    #[test]
    fn test_caret_is_exponent() {
        assert_eq!(evaluate("3^2").unwrap(), 9.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(evaluate("-7 % 3").unwrap(), 2.0);
        assert_eq!(evaluate("7 % -3").unwrap(), -2.0);
    }

    #[test]
    fn test_division_by_zero_is_failure() {
        assert_eq!(evaluate("1 / 0"), Err(EvaluationError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(EvaluationError::DivisionByZero));
        assert_eq!(evaluate("0 ** -1"), Err(EvaluationError::DivisionByZero));
    }

    #[test]
    fn test_non_whitelisted_names_rejected() {
        for expr in [
            "__import__('os')",
            "open('/etc/passwd')",
            "os.system",
            "exec(1)",
            "x + 1",
            "math.os",
        ] {
            assert!(evaluate(expr).is_err(), "{} should fail", expr);
        }
        assert_eq!(
            evaluate("eval(1)"),
            Err(EvaluationError::UnknownName("eval".to_string()))
        );
    }

    #[test]
    fn test_square_root_requests() {
        assert_eq!(evaluate("sqrt(16)").unwrap(), 4.0);
        assert_eq!(evaluate("what is the square root of 81").unwrap(), 9.0);
        assert_eq!(evaluate("square root of 2.25").unwrap(), 1.5);
        assert_eq!(evaluate("sqrt of nothing"), Err(EvaluationError::NoOperand));
    }

    #[test]
    fn test_whitelisted_functions_and_constants() {
        assert!((evaluate("cos(pi)").unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(evaluate("floor(2.7) + ceil(0.2)").unwrap(), 3.0);
        assert_eq!(evaluate("abs(-3)").unwrap(), 3.0);
        assert!(matches!(evaluate("log(-1)"), Err(EvaluationError::Domain(_))));
    }

    #[test]
    fn test_result_is_float() {
        let value = evaluate("9 / 3").unwrap();
        assert_eq!(value, 3.0_f64);
    }

    #[test]
    fn test_syntax_errors_carry_message() {
        let err = evaluate("2 +").unwrap_err();
        assert!(err.to_string().contains("invalid syntax"));
        assert_eq!(evaluate("   "), Err(EvaluationError::Empty));
    }

    #[test]
    fn test_deeply_nested_input_is_failure() {
        let nested = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(evaluate(&nested), Err(EvaluationError::Syntax { .. })));
    }

    #[test]
    fn test_overflow_is_failure() {
        assert_eq!(evaluate("10 ** 400"), Err(EvaluationError::NonFinite));
    }
}
