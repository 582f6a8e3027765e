use std::fmt;

use serde_json::Value;

use crate::error::LincsError;

/// A typed scalar destined for a generated N1QL statement.
///
/// Strings are double-quoted with JSON escaping; numbers and booleans are
/// emitted bare. The kind is fixed when the value is built, so nothing has
/// to be unquoted after the statement text exists.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
}

impl Literal {
    /// Classifies an untyped token: `true`/`false` become booleans, tokens
    /// made only of digits and dots become numbers, anything else stays a
    /// string.
    pub fn infer(token: &str) -> Self {
        match token {
            "true" => return Literal::Bool(true),
            "false" => return Literal::Bool(false),
            _ => {}
        }
        let numeric_shape = token.chars().any(|ch| ch.is_ascii_digit())
            && token.chars().all(|ch| ch.is_ascii_digit() || ch == '.');
        if numeric_shape {
            if let Ok(number) = token.parse::<f64>() {
                return Literal::Number(number);
            }
        }
        Literal::Str(token.to_string())
    }

    pub fn from_json(field: &str, value: &Value) -> Result<Self, LincsError> {
        match value {
            Value::String(text) => Ok(Literal::Str(text.clone())),
            Value::Bool(flag) => Ok(Literal::Bool(*flag)),
            Value::Number(number) => number.as_f64().map(Literal::Number).ok_or_else(|| {
                LincsError::InvalidFilterValue {
                    field: field.to_string(),
                    reason: format!("number {number} is not representable"),
                }
            }),
            other => Err(LincsError::InvalidFilterValue {
                field: field.to_string(),
                reason: format!("expected a string, number or boolean, got {other}"),
            }),
        }
    }

    /// Empty strings mean "not given" everywhere a literal is accepted.
    pub fn is_empty(&self) -> bool {
        matches!(self, Literal::Str(text) if text.is_empty())
    }

    /// Statement text for this value compared against `field`. NaN and
    /// infinities have no N1QL spelling and are rejected.
    pub fn to_n1ql(&self, field: &str) -> Result<String, LincsError> {
        match self {
            Literal::Str(text) => Ok(Value::String(text.clone()).to_string()),
            Literal::Number(number) if number.is_finite() => Ok(number.to_string()),
            Literal::Number(number) => Err(non_finite(field, *number)),
            Literal::Bool(flag) => Ok(flag.to_string()),
        }
    }
}

pub(crate) fn non_finite(field: &str, number: f64) -> LincsError {
    LincsError::InvalidFilterValue {
        field: field.to_string(),
        reason: format!("{number} is not a finite number"),
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(text) => write!(f, "{text}"),
            Literal::Number(number) => write!(f, "{number}"),
            Literal::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(f64::from(value))
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Literal::Number(f64::from(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}
