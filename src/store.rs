use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::Row;
use crate::error::LincsError;
use crate::n1ql::Statement;
use crate::range::ViewQuery;

/// The external engine every query and write is submitted to.
///
/// Implementations surface their own failures verbatim and never retry.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Cheap round trip used once to decide whether the session is usable.
    async fn ping(&self) -> Result<(), LincsError>;

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, LincsError>;

    async fn view(&self, query: &ViewQuery) -> Result<Vec<Row>, LincsError>;

    /// Insert-or-replace the whole document stored under `id`.
    async fn upsert(&self, id: &str, document: &Value) -> Result<(), LincsError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Connecting,
    Ready,
    Failed(String),
}

/// Owns the store handle together with its readiness, so that operations
/// issued before (or after a failed) connect are rejected instead of hanging.
pub struct Session<Q: QueryService> {
    service: Q,
    state: RwLock<Readiness>,
}

impl<Q: QueryService> Session<Q> {
    pub fn new(service: Q) -> Self {
        Self {
            service,
            state: RwLock::new(Readiness::Connecting),
        }
    }

    /// Builds a session and connects it in one step.
    pub async fn open(service: Q) -> Result<Self, LincsError> {
        let session = Self::new(service);
        session.connect().await?;
        Ok(session)
    }

    pub async fn connect(&self) -> Result<(), LincsError> {
        match self.service.ping().await {
            Ok(()) => {
                info!("store session ready");
                self.set_state(Readiness::Ready);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "store session failed to connect");
                self.set_state(Readiness::Failed(err.to_string()));
                Err(LincsError::ConnectionFailed(err.to_string()))
            }
        }
    }

    pub fn readiness(&self) -> Readiness {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The service, if the session has connected.
    pub fn service(&self) -> Result<&Q, LincsError> {
        match self.readiness() {
            Readiness::Ready => Ok(&self.service),
            Readiness::Connecting => Err(LincsError::NotReady),
            Readiness::Failed(reason) => Err(LincsError::ConnectionFailed(reason)),
        }
    }

    fn set_state(&self, readiness: Readiness) {
        match self.state.write() {
            Ok(mut state) => *state = readiness,
            Err(poisoned) => *poisoned.into_inner() = readiness,
        }
    }
}
