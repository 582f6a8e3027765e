use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::Page;
use crate::error::LincsError;
use crate::literal::non_finite;

pub const ZSCORE_DESIGN_DOC: &str = "lincs_zscore";
pub const ZSCORE_GOLD_VIEW: &str = "ZSVC_L1000_gold";
pub const ZSCORE_FULL_VIEW: &str = "ZSVC_L1000";

/// Sorts before every real cell line / perturbagen.
pub const LOW_STRING: &str = "";
/// Sorts after every real cell line / perturbagen.
pub const HIGH_STRING: &str = "\u{efff}";
pub const LOW_NUMBER: f64 = -999.0;
pub const HIGH_NUMBER: f64 = 9999.0;

pub const DEFAULT_VIEW_LIMIT: u64 = 1000;

/// An inclusive range scan over a view index, never reduced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewQuery {
    pub design_doc: String,
    pub view: String,
    pub start_key: Value,
    pub end_key: Value,
    pub skip: u64,
    pub limit: u64,
}

impl ViewQuery {
    /// Request parameters. Keys go out as already-encoded JSON arrays; the
    /// transport must not quote them again.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("reduce", "false".to_string()),
            ("inclusive_end", "true".to_string()),
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
            ("startkey", self.start_key.to_string()),
            ("endkey", self.end_key.to_string()),
        ]
    }
}

/// Z-scores vs. vehicle control keyed by `[cell, perturbagen, dose, time]`.
///
/// The view key is compound, so components must be given left to right: a
/// perturbagen needs a cell line, and a dose or time needs both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZscoreRange {
    pub cell_line: Option<String>,
    pub perturbagen: Option<String>,
    pub dose: Option<f64>,
    pub time: Option<f64>,
    /// Restrict to curated (gold) scores; unspecified means yes.
    pub gold: Option<bool>,
    pub page: Page,
}

impl ZscoreRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell_line(mut self, cell_line: impl Into<String>) -> Self {
        self.cell_line = Some(cell_line.into());
        self
    }

    pub fn perturbagen(mut self, perturbagen: impl Into<String>) -> Self {
        self.perturbagen = Some(perturbagen.into());
        self
    }

    pub fn dose(mut self, dose: f64) -> Self {
        self.dose = Some(dose);
        self
    }

    pub fn time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn gold(mut self, gold: bool) -> Self {
        self.gold = Some(gold);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn restrict_to_gold(&self) -> bool {
        self.gold.unwrap_or(true)
    }

    fn given_cell_line(&self) -> Option<&str> {
        self.cell_line.as_deref().filter(|value| !value.is_empty())
    }

    fn given_perturbagen(&self) -> Option<&str> {
        self.perturbagen.as_deref().filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), LincsError> {
        let cell_line = self.given_cell_line();
        let perturbagen = self.given_perturbagen();
        if perturbagen.is_some() && cell_line.is_none() {
            return Err(LincsError::CellLineRequired);
        }
        if (self.dose.is_some() || self.time.is_some())
            && (perturbagen.is_none() || cell_line.is_none())
        {
            return Err(LincsError::PerturbagenRequired);
        }
        for (field, value) in [("dose", self.dose), ("time", self.time)] {
            if let Some(number) = value.filter(|number| !number.is_finite()) {
                return Err(non_finite(field, number));
            }
        }
        Ok(())
    }

    pub fn to_view_query(&self) -> Result<ViewQuery, LincsError> {
        self.validate()?;
        let cell_line = self.given_cell_line();
        let perturbagen = self.given_perturbagen();

        let start_key = json!([
            cell_line.unwrap_or(LOW_STRING),
            perturbagen.unwrap_or(LOW_STRING),
            key_number(self.dose.unwrap_or(LOW_NUMBER)),
            key_number(self.time.unwrap_or(LOW_NUMBER)),
        ]);
        let end_key = json!([
            cell_line.unwrap_or(HIGH_STRING),
            perturbagen.unwrap_or(HIGH_STRING),
            key_number(self.dose.unwrap_or(HIGH_NUMBER)),
            key_number(self.time.unwrap_or(HIGH_NUMBER)),
        ]);
        let view = if self.restrict_to_gold() {
            ZSCORE_GOLD_VIEW
        } else {
            ZSCORE_FULL_VIEW
        };

        let query = ViewQuery {
            design_doc: ZSCORE_DESIGN_DOC.to_string(),
            view: view.to_string(),
            start_key,
            end_key,
            skip: self.page.skip().unwrap_or(0),
            limit: self.page.limit().unwrap_or(DEFAULT_VIEW_LIMIT),
        };
        debug!(
            view = %query.view,
            startkey = %query.start_key,
            endkey = %query.end_key,
            "built zscore range"
        );
        Ok(query)
    }
}

// Whole numbers are written without a fraction so keys match what the view
// emits. Callers have already rejected non-finite values.
fn key_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}
