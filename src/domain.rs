use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LincsError;
use crate::literal::Literal;

/// One result row: projected field name to value, in the order the store
/// returned them.
pub type Row = Map<String, Value>;

/// Document key. Numeric keys are stored in their canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocKey(String);

impl DocKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for DocKey {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<u64> for DocKey {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for DocKey {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for DocKey {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

/// Secondary equality conditions on `metadata.<field>`.
///
/// Insertion order is kept: the compound index matches conditions left to
/// right, so the generated WHERE clause follows exactly the order given here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Literal)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.conditions
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }

    /// Builds a filter from a JSON object such as `{"pert_type": "ctl_vector"}`.
    pub fn from_json(value: &Value) -> Result<Self, LincsError> {
        let object = value
            .as_object()
            .ok_or_else(|| LincsError::InvalidFilterValue {
                field: "filter".to_string(),
                reason: format!("expected a JSON object, got {value}"),
            })?;
        let conditions = object
            .iter()
            .map(|(field, value)| Ok((field.clone(), Literal::from_json(field, value)?)))
            .collect::<Result<Vec<_>, LincsError>>()?;
        Ok(Self { conditions })
    }

    pub fn parse_json(text: &str) -> Result<Self, LincsError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| LincsError::InvalidFilterValue {
                field: "filter".to_string(),
                reason: err.to_string(),
            })?;
        Self::from_json(&value)
    }

    /// Appends a `FIELD=VALUE` condition; the value's kind is inferred.
    pub fn and_condition(self, condition: &str) -> Result<Self, LincsError> {
        let (field, value) =
            condition
                .split_once('=')
                .ok_or_else(|| LincsError::InvalidFilterValue {
                    field: condition.to_string(),
                    reason: "expected FIELD=VALUE".to_string(),
                })?;
        Ok(self.and(field.trim(), Literal::infer(value.trim())))
    }

    /// A filter from an optional JSON object followed by `FIELD=VALUE`
    /// conditions, in that order.
    pub fn from_args<S: AsRef<str>>(
        json: Option<&str>,
        conditions: &[S],
    ) -> Result<Self, LincsError> {
        let filter = match json {
            Some(json) => Self::parse_json(json)?,
            None => Self::new(),
        };
        conditions
            .iter()
            .try_fold(filter, |filter, condition| filter.and_condition(condition.as_ref()))
    }
}

impl<K: Into<String>, V: Into<Literal>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        }
    }
}

/// Skip/limit paging. Zero or absent values fall back to the defaults of
/// whichever builder consumes the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl Page {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
        }
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip.filter(|skip| *skip > 0)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit.filter(|limit| *limit > 0)
    }
}
