//! Answer formatting.
//!
//! Capability results are JSON values; answers and trace lines are text.

use serde_json::Value;

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Render a capability result as answer text.
///
/// Strings are returned as-is, numbers via [`format_number`], `null` as an
/// empty string, and everything else as compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Truncate `text` to at most `max_chars` characters, appending `...`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(4.0)), "4");
        assert_eq!(format_value(&json!(7)), "7");
        assert_eq!(format_value(&json!("sunny")), "sunny");
        assert_eq!(format_value(&Value::Null), "");
        assert_eq!(format_value(&json!({"temp": 21})), r#"{"temp":21}"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
