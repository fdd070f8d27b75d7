//! Lenient number parsing for form-style input.

use serde::{Deserialize, Serialize};

/// A numeric field that may arrive as a JSON number or as free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
    /// `null`, booleans, arrays or objects. Always coerces to 0.
    Other(serde_json::Value),
}

impl NumericInput {
    /// Resolve to a finite number, falling back to 0.
    pub fn coerce(&self) -> f64 {
        match self {
            NumericInput::Number(n) if n.is_finite() => *n,
            NumericInput::Number(_) => 0.0,
            NumericInput::Text(s) => parse_leading_float(s).unwrap_or(0.0),
            NumericInput::Other(_) => 0.0,
        }
    }
}

impl Default for NumericInput {
    fn default() -> Self {
        NumericInput::Number(0.0)
    }
}

impl From<f64> for NumericInput {
    fn from(n: f64) -> Self {
        NumericInput::Number(n)
    }
}

impl From<&str> for NumericInput {
    fn from(s: &str) -> Self {
        NumericInput::Text(s.to_string())
    }
}

/// Parse the longest decimal prefix of `input`, ignoring leading whitespace.
///
/// `"12.5 tons"` gives `Some(12.5)`, `"abc"` gives `None`.
pub fn parse_leading_float(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if frac_end > frac_start || digits > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_leading_float("12.5"), Some(12.5));
        assert_eq!(parse_leading_float("800"), Some(800.0));
        assert_eq!(parse_leading_float("  -3"), Some(-3.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("7."), Some(7.0));
    }

    #[test]
    fn test_trailing_garbage_is_ignored() {
        assert_eq!(parse_leading_float("12.5 tons"), Some(12.5));
        assert_eq!(parse_leading_float("1e3kg"), Some(1000.0));
        assert_eq!(parse_leading_float("4e"), Some(4.0));
        assert_eq!(parse_leading_float("3.2.1"), Some(3.2));
    }

    #[test]
    fn test_non_numeric_text() {
        assert_eq!(parse_leading_float(""), None);
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float("."), None);
    }

    #[test]
    fn test_coerce_defaults_to_zero() {
        assert_eq!(NumericInput::from("twelve").coerce(), 0.0);
        assert_eq!(NumericInput::from("12.5").coerce(), 12.5);
        assert_eq!(NumericInput::Number(800.0).coerce(), 800.0);
        assert_eq!(NumericInput::Number(f64::NAN).coerce(), 0.0);
    }

    #[test]
    fn test_deserializes_from_number_or_string() {
        let from_text: NumericInput = serde_json::from_str("\"12.5\"").unwrap();
        let from_number: NumericInput = serde_json::from_str("800").unwrap();

        assert_eq!(from_text.coerce(), 12.5);
        assert_eq!(from_number.coerce(), 800.0);
    }

    #[test]
    fn test_null_and_other_json_coerce_to_zero() {
        for raw in ["null", "true", "[1]", "{\"tons\": 3}"] {
            let input: NumericInput = serde_json::from_str(raw).unwrap();
            assert_eq!(input.coerce(), 0.0, "input {raw}");
        }
    }
}
