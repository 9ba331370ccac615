//! Typed expected values and the rules for matching program output against them.

use crate::error::InvalidExpectation;
use std::fmt;
use std::str::FromStr;

/// Lines starting with this are what a program prints for a recoverable error.
pub const ERROR_MARKER_PREFIX: &str = "Error";

/// A value one line of program output must equal.
///
/// Comparison is against the canonical string form of the value. Integers and
/// decimals are compared numerically, so `1.50` satisfies an expected `1.5`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// `00err` in a transcript: any line starting with [`ERROR_MARKER_PREFIX`].
    Error,
    Bool(bool),
    Integer(i64),
    /// An integer too wide for `i64`, kept in normalized form (no `+`, no
    /// leading zeros) and compared digit by digit.
    BigInteger(String),
    /// Keeps the transcript's spelling for diagnostics.
    Decimal { text: String, value: f64 },
    Text(String),
}

impl Expectation {
    /// Whether `line` (without its line terminator) satisfies this expectation.
    ///
    /// Scalar values ignore surrounding whitespace; text must match exactly.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Expectation::Error => line.starts_with(ERROR_MARKER_PREFIX),
            Expectation::Bool(b) => line.trim() == if *b { "true" } else { "false" },
            Expectation::Integer(n) => line.trim().parse::<i64>().is_ok_and(|v| v == *n),
            Expectation::BigInteger(digits) => {
                normalize_integer(line).is_some_and(|n| n == *digits)
            }
            Expectation::Decimal { value, .. } => {
                line.trim().parse::<f64>().is_ok_and(|v| v == *value)
            }
            Expectation::Text(text) => line == text,
        }
    }

    /// Split a multi-line text expectation into one expectation per output line.
    ///
    /// Every other variant is already a single line.
    pub fn into_lines(self) -> Vec<Expectation> {
        match self {
            Expectation::Text(text) if text.contains('\n') => text
                .split('\n')
                .map(|line| Expectation::Text(line.to_string()))
                .collect(),
            other => vec![other],
        }
    }

    /// Number of output lines this expectation accounts for.
    pub fn line_count(&self) -> usize {
        match self {
            Expectation::Text(text) => text.split('\n').count(),
            _ => 1,
        }
    }
}

impl FromStr for Expectation {
    type Err = InvalidExpectation;

    /// Parse a transcript expectation token. `null` is not a value: the parser
    /// handles it before getting here.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidExpectation(token.to_string());
        match token {
            "00err" => return Ok(Expectation::Error),
            "true" => return Ok(Expectation::Bool(true)),
            "false" => return Ok(Expectation::Bool(false)),
            _ => {}
        }

        if let Some(inner) = token
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return Ok(Expectation::Text(inner.replace("\\n", "\n")));
        }

        if token.contains('.') {
            let value = token.parse::<f64>().map_err(|_| invalid())?;
            return Ok(Expectation::Decimal {
                text: token.to_string(),
                value,
            });
        }

        if let Ok(n) = token.parse::<i64>() {
            return Ok(Expectation::Integer(n));
        }
        normalize_integer(token)
            .map(Expectation::BigInteger)
            .ok_or_else(invalid)
    }
}

/// `-007` becomes `-7`, `+0` becomes `0`. `None` for anything but an optionally
/// signed run of digits.
fn normalize_integer(s: &str) -> Option<String> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    Some(if digits.is_empty() {
        "0".to_string()
    } else if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    })
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Error => write!(f, "{ERROR_MARKER_PREFIX}, ..."),
            Expectation::Bool(b) => write!(f, "{b}"),
            Expectation::Integer(n) => write!(f, "{n}"),
            Expectation::BigInteger(digits) => f.write_str(digits),
            Expectation::Decimal { text, .. } => f.write_str(text),
            Expectation::Text(text) => f.write_str(text),
        }
    }
}
