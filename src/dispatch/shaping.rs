//! Calculator input shaping.
//!
//! Turns a natural-language arithmetic query into a flat expression
//! `n0 op0 n1 op1 n2 ...`: numbers and operators are extracted in order and
//! paired by position, so words between them are ignored. The result is
//! evaluated with ordinary precedence.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::evaluator;
use crate::utilities::format_number;

static FILLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:what\s+is|what's|compute|calculate)\b").unwrap());

static WORD_OPERATORS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bmultiplied\s+by\b", " * "),
        (r"(?i)\bdivided\s+by\b", " / "),
        (r"(?i)\btimes\b", " * "),
        (r"(?i)\bplus\b", " + "),
        (r"(?i)\bminus\b", " - "),
        (r"(?i)\bmod\b", " % "),
    ]
    .into_iter()
    .map(|(pattern, symbol)| (Regex::new(pattern).unwrap(), symbol))
    .collect()
});

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?|\*\*|[+\-*/%^]").unwrap());

/// How the calculator should be invoked for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedInput {
    /// Evaluate this expression.
    Expression(String),
    /// A lone number: it is the answer, no evaluation needed.
    Literal(String),
    /// The query contains no numbers.
    NoNumbers,
    /// Numbers but no operator.
    NoOperation,
}

/// Shape `query` for the calculator.
pub fn shape_calculator_input(query: &str) -> ShapedInput {
    if evaluator::is_square_root_request(query) {
        return ShapedInput::Expression(query.to_string());
    }

    let mut text = FILLER.replace_all(query, " ").into_owned();
    for (pattern, symbol) in WORD_OPERATORS.iter() {
        text = pattern.replace_all(&text, *symbol).into_owned();
    }

    let mut numbers: Vec<String> = Vec::new();
    let mut operators: Vec<&str> = Vec::new();
    let mut expect_operand = true;
    let mut pending_sign = false;

    for token in TOKEN.find_iter(&text) {
        let token = token.as_str();
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            let literal = if pending_sign {
                format!("-{}", token)
            } else {
                token.to_string()
            };
            numbers.push(literal);
            pending_sign = false;
            expect_operand = false;
        } else if token == "-" && expect_operand && !pending_sign {
            pending_sign = true;
        } else {
            operators.push(token);
            pending_sign = false;
            expect_operand = true;
        }
    }

    match (numbers.len(), operators.is_empty()) {
        (0, _) => ShapedInput::NoNumbers,
        (1, true) => ShapedInput::Literal(normalize_literal(&numbers[0])),
        (_, true) => ShapedInput::NoOperation,
        _ => {
            let mut expression = numbers[0].clone();
            for (op, number) in operators.iter().zip(numbers.iter().skip(1)) {
                let op = if *op == "^" { "**" } else { *op };
                expression.push_str(&format!(" {} {}", op, parenthesize(number)));
            }
            ShapedInput::Expression(expression)
        }
    }
}

fn parenthesize(number: &str) -> String {
    if number.starts_with('-') {
        format!("({})", number)
    } else {
        number.to_string()
    }
}

fn normalize_literal(literal: &str) -> String {
    literal
        .parse::<f64>()
        .map(format_number)
        .unwrap_or_else(|_| literal.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(s: &str) -> ShapedInput {
        ShapedInput::Expression(s.to_string())
    }

    #[test]
    fn test_symbols_pass_through() {
        assert_eq!(shape_calculator_input("2 + 2"), expr("2 + 2"));
        assert_eq!(shape_calculator_input("3^2"), expr("3 ** 2"));
        assert_eq!(shape_calculator_input("2 ** 10"), expr("2 ** 10"));
    }

    #[test]
    fn test_filler_and_word_operators() {
        assert_eq!(shape_calculator_input("What is 6 times 7?"), expr("6 * 7"));
        assert_eq!(
            shape_calculator_input("compute 10 divided by 4 plus 1"),
            expr("10 / 4 + 1")
        );
        assert_eq!(shape_calculator_input("17 mod 5"), expr("17 % 5"));
    }

    #[test]
    fn test_sign_folding() {
        assert_eq!(shape_calculator_input("-3 * -2"), expr("-3 * (-2)"));
        assert_eq!(shape_calculator_input("5 minus -2"), expr("5 - (-2)"));
        assert_eq!(shape_calculator_input("5 - 2"), expr("5 - 2"));
    }

    #[test]
    fn test_degenerate_queries() {
        assert_eq!(shape_calculator_input("compute something"), ShapedInput::NoNumbers);
        assert_eq!(shape_calculator_input("what is 42"), ShapedInput::Literal("42".into()));
        assert_eq!(shape_calculator_input("calculate -7.0"), ShapedInput::Literal("-7".into()));
        assert_eq!(shape_calculator_input("compare 3 and 4"), ShapedInput::NoOperation);
    }

    #[test]
    fn test_square_root_is_forwarded() {
        assert_eq!(
            shape_calculator_input("square root of 81"),
            expr("square root of 81")
        );
    }
}
