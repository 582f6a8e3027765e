use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::{DocKey, Filter, Page};
use crate::error::LincsError;
use crate::literal::Literal;
use crate::projection::Projection;

pub const DEFAULT_COLLECTION: &str = "LINCS";

/// A N1QL statement plus its positional (`$1`, `$2`, ...) arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(rename = "statement")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(text: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }
}

/// Builds statements against one collection (bucket). Pure: holds nothing
/// but the collection name, so it is freely shared between callers.
#[derive(Debug, Clone)]
pub struct N1qlBuilder {
    collection: String,
}

impl Default for N1qlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION)
    }
}

impl N1qlBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Primary-key batch fetch: `USE KEYS` with every key as a string.
    pub fn select_keys(
        &self,
        projection: &Projection,
        keys: &[DocKey],
    ) -> Result<Statement, LincsError> {
        let keys = Value::Array(
            keys.iter()
                .map(|key| Value::String(key.as_str().to_string()))
                .collect(),
        );
        let text = format!(
            "SELECT META().id, {} FROM {} USE KEYS {keys}",
            self.select_list(projection)?,
            self.keyspace()?
        );
        debug!(statement = %text, "built key fetch");
        Ok(Statement::new(text))
    }

    /// Equality filter on `metadata.<primary_field>` followed by each
    /// secondary condition in the order given, then OFFSET/LIMIT when set.
    pub fn select_where(
        &self,
        projection: &Projection,
        primary_field: &str,
        primary_value: &Literal,
        filter: &Filter,
        page: Page,
    ) -> Result<Statement, LincsError> {
        let mut text = format!(
            "SELECT META().id, {} FROM {} {}",
            self.select_list(projection)?,
            self.keyspace()?,
            where_clause(primary_field, primary_value, filter)?
        );
        if let Some(skip) = page.skip() {
            text.push_str(&format!(" OFFSET {skip}"));
        }
        if let Some(limit) = page.limit() {
            text.push_str(&format!(" LIMIT {limit}"));
        }
        debug!(statement = %text, "built filtered select");
        Ok(Statement::new(text))
    }

    /// Same conditions as [`select_where`](Self::select_where), returning a
    /// single row `{"count": n}`.
    pub fn count_where(
        &self,
        primary_field: &str,
        primary_value: &Literal,
        filter: &Filter,
    ) -> Result<Statement, LincsError> {
        let text = format!(
            "SELECT COUNT(*) AS count FROM {} {}",
            self.keyspace()?,
            where_clause(primary_field, primary_value, filter)?
        );
        debug!(statement = %text, "built filtered count");
        Ok(Statement::new(text))
    }

    /// Insert-or-replace of a whole document.
    pub fn upsert(&self, id: &str, document: Value) -> Result<Statement, LincsError> {
        let text = format!(
            "UPSERT INTO {} (KEY, VALUE) VALUES ($1, $2)",
            self.keyspace()?
        );
        debug!(statement = %text, id, "built upsert");
        Ok(Statement::with_args(
            text,
            vec![Value::String(id.to_string()), document],
        ))
    }

    fn keyspace(&self) -> Result<&str, LincsError> {
        check_identifier("collection", &self.collection)?;
        Ok(&self.collection)
    }

    fn select_list(&self, projection: &Projection) -> Result<String, LincsError> {
        for field in projection.fields() {
            check_path("projected field", field)?;
        }
        Ok(projection.select_list(self.keyspace()?).join(", "))
    }
}

/// Names are spliced into statement text, so only plain identifiers pass:
/// an ASCII letter or underscore followed by letters, digits or underscores.
fn check_identifier(role: &'static str, name: &str) -> Result<(), LincsError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(LincsError::InvalidIdentifier {
            role,
            name: name.to_string(),
        })
    }
}

/// A dotted path such as `metadata.pert_desc`; every segment is an identifier.
fn check_path(role: &'static str, path: &str) -> Result<(), LincsError> {
    if path
        .split('.')
        .all(|segment| check_identifier(role, segment).is_ok())
    {
        Ok(())
    } else {
        Err(LincsError::InvalidIdentifier {
            role,
            name: path.to_string(),
        })
    }
}

fn condition(field: &str, value: &Literal) -> Result<String, LincsError> {
    check_identifier("filter field", field)?;
    Ok(format!("metadata.{field} = {}", value.to_n1ql(field)?))
}

fn where_clause(
    primary_field: &str,
    primary_value: &Literal,
    filter: &Filter,
) -> Result<String, LincsError> {
    if primary_value.is_empty() {
        return Err(LincsError::MissingPrimaryValue(primary_field.to_string()));
    }
    let mut clause = format!("WHERE {}", condition(primary_field, primary_value)?);
    for (field, value) in filter.iter().filter(|(_, value)| !value.is_empty()) {
        clause.push_str(" AND ");
        clause.push_str(&condition(field, value)?);
    }
    Ok(clause)
}
