use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LincsError {
    #[error("document did not contain required parameters ({kind}): missing {}", .missing.join(", "))]
    MissingFields {
        kind: &'static str,
        missing: Vec<String>,
    },

    #[error("gene IDs length ({gene_ids}) must match data length ({data})")]
    LengthMismatch { gene_ids: usize, data: usize },

    #[error("must specify cell line if perturbagen is specified")]
    CellLineRequired,

    #[error("must specify cell line and perturbagen if dose or duration are specified")]
    PerturbagenRequired,

    #[error("a value is required for primary filter field {0}")]
    MissingPrimaryValue(String),

    #[error("invalid value for filter field {field}: {reason}")]
    InvalidFilterValue { field: String, reason: String },

    #[error("invalid {role} name {name:?}: expected identifiers joined by dots")]
    InvalidIdentifier { role: &'static str, name: String },

    #[error("invalid {kind} document: {reason}")]
    InvalidDocument { kind: &'static str, reason: String },

    #[error("requested {count} keys, more than the configured maximum of {max}")]
    TooManyKeys { count: usize, max: usize },

    #[error("store session is not ready yet")]
    NotReady,

    #[error("store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("store request failed: {0}")]
    StoreHttp(String),

    #[error("store returned status {status}: {message}")]
    StoreStatus { status: u16, message: String },

    #[error("query rejected ({code}): {message}")]
    Query { code: i64, message: String },

    #[error("no config file found; pass --config or set LINCS_CONFIG")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("config profile not defined: {0}")]
    MissingProfile(String),
}

impl LincsError {
    /// True for rejections raised locally, before anything reaches the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LincsError::MissingFields { .. }
                | LincsError::LengthMismatch { .. }
                | LincsError::CellLineRequired
                | LincsError::PerturbagenRequired
                | LincsError::MissingPrimaryValue(_)
                | LincsError::InvalidFilterValue { .. }
                | LincsError::InvalidIdentifier { .. }
                | LincsError::InvalidDocument { .. }
                | LincsError::TooManyKeys { .. }
        )
    }
}
