#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use lincs_store::domain::Row;
use lincs_store::error::LincsError;
use lincs_store::n1ql::Statement;
use lincs_store::range::ViewQuery;
use lincs_store::store::QueryService;

pub const DISTIL_IDS: [&str; 4] = [
    "CYT001_HA1E_2H_X1_B12:C18",
    "CYT001_HA1E_2H_X2_B7_DUO52HI53LO:C18",
    "CYT001_HT29_2H_X1_B7_DUO52HI53LO:C18",
    "CYT001_MCF7_2H_X1_B12:C18",
];

/// In-memory stand-in for the query service. It evaluates the statement
/// shapes the builders emit (USE KEYS, equality WHERE chains, COUNT,
/// OFFSET/LIMIT, UPSERT) and records everything it was asked to run.
#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    docs: Mutex<Vec<(String, Value)>>,
    statements: Mutex<Vec<Statement>>,
    views: Mutex<Vec<ViewQuery>>,
    upserts: Mutex<Vec<String>>,
    view_rows: Mutex<Vec<Row>>,
    query_rows: Mutex<Option<Vec<Row>>>,
    unreachable: bool,
    failure: Option<String>,
}

impl FakeStore {
    pub fn with_fixture() -> Self {
        let store = Self::default();
        store.inner.docs.lock().unwrap().extend(fixture_docs());
        store
    }

    pub fn unreachable() -> Self {
        Self {
            inner: Arc::new(Inner {
                unreachable: true,
                ..Inner::default()
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                failure: Some(message.to_string()),
                ..Inner::default()
            }),
        }
    }

    pub fn set_view_rows(&self, rows: Vec<Row>) {
        *self.inner.view_rows.lock().unwrap() = rows;
    }

    /// Replaces the engine: every read statement answers with `rows`.
    pub fn set_query_rows(&self, rows: Vec<Row>) {
        *self.inner.query_rows.lock().unwrap() = Some(rows);
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.inner.statements.lock().unwrap().clone()
    }

    pub fn views(&self) -> Vec<ViewQuery> {
        self.inner.views.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> Vec<String> {
        self.inner.upserts.lock().unwrap().clone()
    }

    pub fn doc(&self, id: &str) -> Option<Value> {
        self.inner
            .docs
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, doc)| doc.clone())
    }

    pub fn doc_count(&self) -> usize {
        self.inner.docs.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.statements().len() + self.views().len() + self.upserts().len()
    }

    fn execute(&self, statement: &Statement) -> Result<Vec<Row>, LincsError> {
        let text = statement.text.as_str();
        if text.starts_with("UPSERT INTO ") {
            let id = statement.args[0].as_str().ok_or_else(syntax_error)?.to_string();
            let doc = statement.args[1].clone();
            self.inner.upserts.lock().unwrap().push(id.clone());
            let mut docs = self.inner.docs.lock().unwrap();
            match docs.iter_mut().find(|(key, _)| *key == id) {
                Some(entry) => entry.1 = doc,
                None => docs.push((id, doc)),
            }
            return Ok(Vec::new());
        }

        let rest = text.strip_prefix("SELECT ").ok_or_else(syntax_error)?;
        let (select, rest) = rest.split_once(" FROM ").ok_or_else(syntax_error)?;
        let (collection, tail) = rest.split_once(' ').ok_or_else(syntax_error)?;
        let docs = self.inner.docs.lock().unwrap().clone();

        let matched: Vec<(String, Value)> = if let Some(keys) = tail.strip_prefix("USE KEYS ") {
            let keys: Vec<String> = serde_json::from_str(keys).map_err(|_| syntax_error())?;
            keys.iter()
                .filter_map(|key| docs.iter().find(|(id, _)| id == key).cloned())
                .collect()
        } else if let Some(clause) = tail.strip_prefix("WHERE ") {
            let (conditions, paging) = split_paging(clause);
            let conditions = conditions
                .split(" AND ")
                .map(parse_condition)
                .collect::<Result<Vec<_>, _>>()?;
            let (skip, limit) = parse_paging(paging)?;
            docs.into_iter()
                .filter(|(_, doc)| {
                    conditions
                        .iter()
                        .all(|(field, expected)| same_value(&doc["metadata"][field], expected))
                })
                .skip(skip)
                .take(limit)
                .collect()
        } else {
            return Err(syntax_error());
        };

        if select == "COUNT(*) AS count" {
            let mut row = Map::new();
            row.insert("count".to_string(), json!(matched.len()));
            return Ok(vec![row]);
        }

        let fields = select
            .split(", ")
            .filter(|field| *field != "META().id")
            .collect::<Vec<_>>();
        Ok(matched
            .iter()
            .map(|(id, doc)| project(collection, &fields, id, doc))
            .collect())
    }
}

#[async_trait]
impl QueryService for FakeStore {
    async fn ping(&self) -> Result<(), LincsError> {
        if self.inner.unreachable {
            return Err(LincsError::StoreHttp("connection refused".to_string()));
        }
        Ok(())
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, LincsError> {
        // Writes are tracked under upserts only.
        if !statement.text.starts_with("UPSERT INTO ") {
            self.inner.statements.lock().unwrap().push(statement.clone());
        }
        if let Some(message) = &self.inner.failure {
            return Err(LincsError::Query {
                code: 5000,
                message: message.clone(),
            });
        }
        if let Some(rows) = self.inner.query_rows.lock().unwrap().clone() {
            return Ok(rows);
        }
        self.execute(statement)
    }

    async fn view(&self, query: &ViewQuery) -> Result<Vec<Row>, LincsError> {
        self.inner.views.lock().unwrap().push(query.clone());
        let rows = self.inner.view_rows.lock().unwrap().clone();
        Ok(rows
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn upsert(&self, id: &str, document: &Value) -> Result<(), LincsError> {
        let statement = Statement::with_args(
            "UPSERT INTO LINCS (KEY, VALUE) VALUES ($1, $2)",
            vec![json!(id), document.clone()],
        );
        self.query(&statement).await?;
        Ok(())
    }
}

fn syntax_error() -> LincsError {
    LincsError::Query {
        code: 3000,
        message: "syntax error".to_string(),
    }
}

fn split_paging(clause: &str) -> (&str, &str) {
    let cut = [" OFFSET ", " LIMIT "]
        .iter()
        .filter_map(|marker| clause.find(marker))
        .min();
    match cut {
        Some(index) => (&clause[..index], &clause[index..]),
        None => (clause, ""),
    }
}

fn parse_paging(paging: &str) -> Result<(usize, usize), LincsError> {
    let mut skip = 0;
    let mut limit = usize::MAX;
    let tokens = paging.split_whitespace().collect::<Vec<_>>();
    for pair in tokens.chunks(2) {
        match pair {
            ["OFFSET", value] => skip = value.parse().map_err(|_| syntax_error())?,
            ["LIMIT", value] => limit = value.parse().map_err(|_| syntax_error())?,
            _ => return Err(syntax_error()),
        }
    }
    Ok((skip, limit))
}

fn parse_condition(condition: &str) -> Result<(String, Value), LincsError> {
    let (field, literal) = condition.split_once(" = ").ok_or_else(syntax_error)?;
    let field = field.strip_prefix("metadata.").ok_or_else(syntax_error)?;
    let value = serde_json::from_str(literal).map_err(|_| syntax_error())?;
    Ok((field.to_string(), value))
}

fn same_value(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(actual), Some(expected)) => actual == expected,
        _ => actual == expected,
    }
}

fn project(collection: &str, fields: &[&str], id: &str, doc: &Value) -> Row {
    let mut row = Map::new();
    row.insert("id".to_string(), json!(id));
    let wildcard = format!("{collection}.*");
    for field in fields {
        if *field == wildcard {
            if let Some(object) = doc.as_object() {
                row.extend(object.clone());
            }
            continue;
        }
        let Some(path) = field.strip_prefix(&format!("{collection}.")) else {
            continue;
        };
        let value = path
            .split('.')
            .try_fold(doc, |value, segment| value.get(segment));
        if let (Some(value), Some(name)) = (value, path.rsplit('.').next()) {
            row.insert(name.to_string(), value.clone());
        }
    }
    row
}

/// 300 gold A549 instances (keys "1".."300"), 20 MCF7 instances, one
/// non-gold A549 BMP7 instance at a different dose, and four instances keyed
/// by distil id. BMP7 at dose 100 / time 2 appears on A549 as keys 7, 107
/// and 207, and once on MCF7 (307).
pub fn fixture_docs() -> Vec<(String, Value)> {
    let mut docs = Vec::new();
    for i in 1..=321u32 {
        let cell = if i <= 300 || i == 321 { "A549" } else { "MCF7" };
        let vehicle = i % 10 == 0;
        let bmp7 = i % 100 == 7 || i == 321;
        let pert_desc = if vehicle {
            "DMSO".to_string()
        } else if bmp7 {
            "BMP7".to_string()
        } else {
            format!("compound-{i}")
        };
        let dose = if i == 321 { 10 } else if bmp7 { 100 } else { 10 + i % 5 };
        let pert_type = if vehicle { "ctl_vehicle" } else { "trt_cp" };
        let is_gold = i <= 300;
        let signal = f64::from(i) / 10.0;
        docs.push((
            i.to_string(),
            json!({
                "metadata": {
                    "pert_desc": pert_desc,
                    "pert_id": format!("BRD-K{i:05}"),
                    "pert_dose": dose,
                    "pert_time": 2,
                    "cell_id": cell,
                    "det_plate": format!("KDD010_{cell}_PLATE{}", (i - 1) / 40 + 1),
                    "pert_type": pert_type,
                    "is_gold": is_gold,
                    "pert_vehicle": "DMSO"
                },
                "gene_ids": ["200814_at", "222103_at", "201453_x_at"],
                "data": [signal, 1.5, -0.5],
                "type": "q2norm"
            }),
        ));
    }
    for (n, distil_id) in DISTIL_IDS.iter().enumerate() {
        docs.push((
            distil_id.to_string(),
            json!({
                "metadata": {
                    "pert_desc": format!("cytokine-{n}"),
                    "pert_dose": 1,
                    "pert_time": 2,
                    "cell_id": "HA1E",
                    "det_plate": "CYT001_HA1E_2H_X1_B12",
                    "pert_type": "trt_lig",
                    "is_gold": false,
                    "pert_vehicle": "PBS"
                },
                "gene_ids": ["200814_at"],
                "data": [0.1],
                "type": "q2norm"
            }),
        ));
    }
    docs
}
