use serde::Serialize;
use tracing::debug;

use crate::config::StoreConfig;
use crate::couchbase::CouchbaseClient;
use crate::document::{DocumentKind, prepare_instance, prepare_score};
use crate::domain::{DocKey, Filter, Page, Row};
use crate::error::LincsError;
use crate::literal::Literal;
use crate::n1ql::N1qlBuilder;
use crate::projection::Projection;
use crate::range::ZscoreRange;
use crate::store::{QueryService, Session};

/// Data access for LINCS instances and perturbation scores.
///
/// Every operation validates its input, then issues exactly one query or
/// write through the session. An empty result list means "no matches".
pub struct Lincs<Q: QueryService> {
    session: Session<Q>,
    n1ql: N1qlBuilder,
    max_keys: Option<usize>,
}

impl Lincs<CouchbaseClient> {
    /// Builds the HTTP client for `config` and waits for the store to answer.
    pub async fn connect(config: &StoreConfig) -> Result<Self, LincsError> {
        let client = CouchbaseClient::new(config)?;
        let session = Session::open(client).await?;
        Ok(Self::new(session, config.bucket.clone()).with_max_keys(config.max_keys_per_get))
    }
}

impl<Q: QueryService> Lincs<Q> {
    pub fn new(session: Session<Q>, collection: impl Into<String>) -> Self {
        Self {
            session,
            n1ql: N1qlBuilder::new(collection),
            max_keys: None,
        }
    }

    pub fn with_max_keys(mut self, max_keys: Option<usize>) -> Self {
        self.max_keys = max_keys;
        self
    }

    pub fn session(&self) -> &Session<Q> {
        &self.session
    }

    /// Fetches documents by key, e.g. `get([1, 2], "metadata.pert_desc")`.
    pub async fn get<K: Into<DocKey>>(
        &self,
        keys: impl IntoIterator<Item = K>,
        fields: impl Into<Projection>,
    ) -> Result<Vec<Row>, LincsError> {
        let keys = keys.into_iter().map(Into::into).collect::<Vec<DocKey>>();
        if let Some(max) = self.max_keys {
            if keys.len() > max {
                return Err(LincsError::TooManyKeys {
                    count: keys.len(),
                    max,
                });
            }
        }
        let statement = self.n1ql.select_keys(&fields.into(), &keys)?;
        let service = self.session.service()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        service.query(&statement).await
    }

    /// Distil ids are document keys, so this is a key fetch.
    pub async fn get_by_distil_id<K: Into<DocKey>>(
        &self,
        ids: impl IntoIterator<Item = K>,
        fields: impl Into<Projection>,
    ) -> Result<Vec<Row>, LincsError> {
        self.get(ids, fields).await
    }

    /// Instances on one plate (`det_plate`), optionally narrowed further.
    pub async fn get_by_plate(
        &self,
        plate: &str,
        fields: impl Into<Projection>,
        filter: &Filter,
    ) -> Result<Vec<Row>, LincsError> {
        self.select_by("det_plate", plate.into(), fields.into(), filter, Page::default())
            .await
    }

    pub async fn get_by_cell(
        &self,
        cell: &str,
        fields: impl Into<Projection>,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>, LincsError> {
        self.select_by("cell_id", cell.into(), fields.into(), filter, page)
            .await
    }

    /// Instances by perturbagen name (`pert_desc`).
    pub async fn get_by_pert(
        &self,
        pert: &str,
        fields: impl Into<Projection>,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>, LincsError> {
        self.select_by("pert_desc", pert.into(), fields.into(), filter, page)
            .await
    }

    /// Instances by perturbagen id (`pert_id`).
    pub async fn get_by_pert_id(
        &self,
        pert_id: &str,
        fields: impl Into<Projection>,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>, LincsError> {
        self.select_by("pert_id", pert_id.into(), fields.into(), filter, page)
            .await
    }

    /// Number of instances matching `metadata.<field> = value` and `filter`.
    pub async fn count_by(
        &self,
        field: &str,
        value: impl Into<Literal>,
        filter: &Filter,
    ) -> Result<u64, LincsError> {
        let statement = self.n1ql.count_where(field, &value.into(), filter)?;
        let service = self.session.service()?;
        let rows = service.query(&statement).await?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(|count| count.as_u64())
            .ok_or_else(|| LincsError::StoreHttp("count missing from response".to_string()))
    }

    /// Z-scores vs. vehicle control over the compound view key.
    pub async fn get_zsvc(&self, range: &ZscoreRange) -> Result<Vec<Row>, LincsError> {
        let query = range.to_view_query()?;
        let service = self.session.service()?;
        service.view(&query).await
    }

    /// Stores a perturbation score under its derived key and returns it.
    pub async fn save_pert<D: Serialize>(&self, document: &D) -> Result<DocKey, LincsError> {
        let document = to_json(DocumentKind::Score, document)?;
        let (id, document) = prepare_score(document)?;
        let service = self.session.service()?;
        debug!(id = %id, "saving perturbation score");
        service.upsert(id.as_str(), &document).await?;
        Ok(id)
    }

    /// Stores an instance under the caller's key and returns it.
    pub async fn save_instance<D: Serialize>(
        &self,
        id: impl Into<DocKey>,
        document: &D,
    ) -> Result<DocKey, LincsError> {
        let id = id.into();
        let document = prepare_instance(to_json(DocumentKind::Instance, document)?)?;
        let service = self.session.service()?;
        debug!(id = %id, "saving instance");
        service.upsert(id.as_str(), &document).await?;
        Ok(id)
    }

    async fn select_by(
        &self,
        field: &str,
        value: Literal,
        fields: Projection,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<Row>, LincsError> {
        let statement = self
            .n1ql
            .select_where(&fields, field, &value, filter, page)?;
        let service = self.session.service()?;
        service.query(&statement).await
    }
}

fn to_json<D: Serialize>(kind: DocumentKind, document: &D) -> Result<serde_json::Value, LincsError> {
    serde_json::to_value(document).map_err(|err| LincsError::InvalidDocument {
        kind: kind.as_str(),
        reason: err.to_string(),
    })
}
