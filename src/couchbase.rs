use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::StoreConfig;
use crate::domain::Row;
use crate::error::LincsError;
use crate::n1ql::{N1qlBuilder, Statement};
use crate::range::ViewQuery;
use crate::store::QueryService;

/// Talks to a Couchbase cluster over its REST endpoints: the cluster
/// manager for the connection check, the N1QL query service for statements
/// and upserts, the view engine for range scans.
#[derive(Clone)]
pub struct CouchbaseClient {
    client: Client,
    cluster_base: String,
    query_base: String,
    view_base: String,
    bucket: String,
    password: Option<String>,
    n1ql: N1qlBuilder,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    errors: Vec<QueryErrorBody>,
}

#[derive(Debug, Deserialize)]
struct QueryErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    #[serde(default)]
    rows: Vec<Value>,
}

impl CouchbaseClient {
    pub fn new(config: &StoreConfig) -> Result<Self, LincsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lincs-store/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LincsError::StoreHttp(err.to_string()))?,
        );
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|err| LincsError::StoreHttp(err.to_string()))?;

        Ok(Self {
            client,
            cluster_base: format!("http://{}:{}", config.ip, config.port),
            query_base: format!("http://{}:{}", config.ip, config.query_port),
            view_base: format!("http://{}:{}", config.ip, config.view_port),
            bucket: config.bucket.clone(),
            password: config.password.clone().filter(|pw| !pw.is_empty()),
            n1ql: N1qlBuilder::new(config.bucket.clone()),
        })
    }

    pub fn ping_url(&self) -> String {
        format!("{}/pools", self.cluster_base)
    }

    pub fn query_url(&self) -> String {
        format!("{}/query/service", self.query_base)
    }

    pub fn view_url(&self, query: &ViewQuery) -> String {
        format!(
            "{}/{}/_design/{}/_view/{}",
            self.view_base, self.bucket, query.design_doc, query.view
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.password {
            Some(password) => request.basic_auth(&self.bucket, Some(password)),
            None => request,
        }
    }

    async fn handle_status(response: Response) -> Result<Response, LincsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "store request failed".to_string());
        Err(LincsError::StoreStatus { status, message })
    }
}

#[async_trait]
impl QueryService for CouchbaseClient {
    async fn ping(&self) -> Result<(), LincsError> {
        let url = self.ping_url();
        debug!(url = %url, "checking cluster manager");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|err| LincsError::StoreHttp(err.to_string()))?;
        Self::handle_status(response).await?;
        Ok(())
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, LincsError> {
        debug!(statement = %statement.text, args = statement.args.len(), "submitting N1QL");
        let response = self
            .authorize(self.client.post(self.query_url()))
            .json(statement)
            .send()
            .await
            .map_err(|err| LincsError::StoreHttp(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| LincsError::StoreHttp(err.to_string()))?;

        // The query service reports statement errors in the body, usually
        // alongside a non-success status.
        let parsed = serde_json::from_str::<QueryResponse>(&body);
        if let Ok(QueryResponse { errors, .. }) = &parsed {
            if let Some(first) = errors.first() {
                return Err(LincsError::Query {
                    code: first.code,
                    message: first.msg.clone(),
                });
            }
        }
        if !status.is_success() {
            return Err(LincsError::StoreStatus {
                status: status.as_u16(),
                message: body,
            });
        }
        let parsed = parsed.map_err(|err| LincsError::StoreHttp(err.to_string()))?;
        Ok(parsed.results.into_iter().map(into_row).collect())
    }

    async fn view(&self, query: &ViewQuery) -> Result<Vec<Row>, LincsError> {
        let url = self.view_url(query);
        debug!(url = %url, startkey = %query.start_key, endkey = %query.end_key, "submitting view query");
        let response = self
            .authorize(self.client.get(&url))
            .query(&query.params())
            .send()
            .await
            .map_err(|err| LincsError::StoreHttp(err.to_string()))?;
        let response = Self::handle_status(response).await?;
        let parsed: ViewResponse = response
            .json()
            .await
            .map_err(|err| LincsError::StoreHttp(err.to_string()))?;
        Ok(parsed.rows.into_iter().map(into_row).collect())
    }

    async fn upsert(&self, id: &str, document: &Value) -> Result<(), LincsError> {
        let statement = self.n1ql.upsert(id, document.clone())?;
        self.query(&statement).await?;
        Ok(())
    }
}

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(object) => object,
        other => {
            let mut row = Map::new();
            row.insert("value".to_string(), other);
            row
        }
    }
}
