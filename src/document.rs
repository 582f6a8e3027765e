use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DocKey;
use crate::error::LincsError;
use crate::literal::Literal;

/// `type` written on every perturbation-score document.
pub const SCORE_TYPE: &str = "pert";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Instance,
    Score,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Instance => "instance",
            DocumentKind::Score => "pert",
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            DocumentKind::Instance => &["metadata", "gene_ids", "data", "type"],
            DocumentKind::Score => &[
                "method",
                "dose",
                "perturbagen",
                "duration",
                "gene_ids",
                "data",
            ],
        }
    }
}

/// One measured instance, e.g. level 2 expression for a single well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDocument {
    pub metadata: Map<String, Value>,
    pub gene_ids: Vec<String>,
    pub data: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An aggregated perturbation score such as a z-score vs. vehicle control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDocument {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    pub perturbagen: String,
    pub dose: f64,
    pub duration: f64,
    pub gene_ids: Vec<String>,
    pub data: Vec<f64>,
    #[serde(default)]
    pub gold: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validates a score document, stamps its `type` and derives its key.
pub fn prepare_score(document: Value) -> Result<(DocKey, Value), LincsError> {
    let kind = DocumentKind::Score;
    let mut object = into_object(kind, document)?;
    check_required(kind, &object)?;
    check_lengths(kind, &object)?;
    object.insert("type".to_string(), Value::String(SCORE_TYPE.to_string()));
    let id = score_id(&object);
    Ok((id, Value::Object(object)))
}

/// Validates an instance document stored under a caller-chosen key.
pub fn prepare_instance(document: Value) -> Result<Value, LincsError> {
    let kind = DocumentKind::Instance;
    let object = into_object(kind, document)?;
    check_required(kind, &object)?;
    check_lengths(kind, &object)?;
    Ok(Value::Object(object))
}

/// `method_cell_perturbagen_dose_duration`. An absent cell leaves its
/// segment empty.
pub fn score_id(document: &Map<String, Value>) -> DocKey {
    let segment = |field: &str| render_segment(document.get(field));
    DocKey::from(format!(
        "{}_{}_{}_{}_{}",
        segment("method"),
        segment("cell"),
        segment("perturbagen"),
        segment("dose"),
        segment("duration")
    ))
}

pub fn check_required(kind: DocumentKind, document: &Map<String, Value>) -> Result<(), LincsError> {
    let missing = kind
        .required_fields()
        .iter()
        .filter(|field| document.get(**field).is_none_or(Value::is_null))
        .map(|field| field.to_string())
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LincsError::MissingFields {
            kind: kind.as_str(),
            missing,
        })
    }
}

pub fn check_lengths(kind: DocumentKind, document: &Map<String, Value>) -> Result<(), LincsError> {
    let gene_ids = array_len(kind, document, "gene_ids")?;
    let data = array_len(kind, document, "data")?;
    if gene_ids != data {
        return Err(LincsError::LengthMismatch { gene_ids, data });
    }
    Ok(())
}

fn array_len(
    kind: DocumentKind,
    document: &Map<String, Value>,
    field: &str,
) -> Result<usize, LincsError> {
    document
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| LincsError::InvalidDocument {
            kind: kind.as_str(),
            reason: format!("{field} must be an array"),
        })
}

fn into_object(kind: DocumentKind, document: Value) -> Result<Map<String, Value>, LincsError> {
    match document {
        Value::Object(object) => Ok(object),
        other => Err(LincsError::InvalidDocument {
            kind: kind.as_str(),
            reason: format!("expected a JSON object, got {other}"),
        }),
    }
}

fn render_segment(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|number| Literal::Number(number).to_string())
            .unwrap_or_else(|| number.to_string()),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn score() -> Value {
        json!({
            "method": "zsvc",
            "cell": "A549",
            "perturbagen": "BMP7",
            "dose": 100,
            "duration": 2.0,
            "gene_ids": ["200814_at", "222103_at"],
            "data": [1.5, -0.25],
            "gold": true
        })
    }

    #[test]
    fn score_id_is_derived_from_fields() {
        let (id, document) = prepare_score(score()).unwrap();
        assert_eq!(id.as_str(), "zsvc_A549_BMP7_100_2");
        assert_eq!(document["type"], json!(SCORE_TYPE));
    }

    #[test]
    fn score_id_is_deterministic() {
        let (first, _) = prepare_score(score()).unwrap();
        let (second, _) = prepare_score(score()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_cell_leaves_empty_segment() {
        let mut document = score();
        document.as_object_mut().unwrap().remove("cell");
        let (id, _) = prepare_score(document).unwrap();
        assert_eq!(id.as_str(), "zsvc__BMP7_100_2");
    }

    #[test]
    fn missing_fields_are_named() {
        let mut document = score();
        document.as_object_mut().unwrap().remove("gene_ids");
        document["method"] = Value::Null;
        let err = prepare_score(document).unwrap_err();
        assert_matches!(
            err,
            LincsError::MissingFields { kind: "pert", ref missing }
                if missing == &vec!["method".to_string(), "gene_ids".to_string()]
        );
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut document = score();
        document["data"] = json!([1.0]);
        let err = prepare_score(document).unwrap_err();
        assert_matches!(err, LincsError::LengthMismatch { gene_ids: 2, data: 1 });
    }

    #[test]
    fn instance_requires_type() {
        let document = json!({
            "metadata": {"pert_desc": "BMP7"},
            "gene_ids": ["200814_at"],
            "data": [7.1]
        });
        let err = prepare_instance(document).unwrap_err();
        assert_matches!(err, LincsError::MissingFields { kind: "instance", .. });
    }

    #[test]
    fn non_array_gene_ids_are_invalid() {
        let document = json!({
            "metadata": {},
            "gene_ids": "200814_at",
            "data": [7.1],
            "type": "q2norm"
        });
        let err = prepare_instance(document).unwrap_err();
        assert_matches!(err, LincsError::InvalidDocument { kind: "instance", .. });
    }

    #[test]
    fn typed_score_document_round_trips_into_validation() {
        let document = ScoreDocument {
            method: "zsvc".to_string(),
            cell: Some("MCF7".to_string()),
            perturbagen: "vorinostat".to_string(),
            dose: 10.0,
            duration: 24.0,
            gene_ids: vec!["200814_at".to_string()],
            data: vec![0.5],
            gold: false,
            extra: Map::new(),
        };
        let (id, _) = prepare_score(serde_json::to_value(&document).unwrap()).unwrap();
        assert_eq!(id.as_str(), "zsvc_MCF7_vorinostat_10_24");
    }
}
