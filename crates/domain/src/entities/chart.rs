//! Chart entity - a lookup table authored in the ruleset
//!
//! Chart data is stored as JSON: an array of rows, each an array of cells.
//! The first row holds the column headers.

use serde::{Deserialize, Serialize};

use crate::value_objects::format_number;
use crate::{ChartId, DomainError, RulesetId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: ChartId,
    pub ruleset_id: RulesetId,
    pub title: String,
    /// JSON-encoded 2-D table
    pub data: String,
}

impl Chart {
    pub fn new(ruleset_id: RulesetId, title: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: ChartId::new(),
            ruleset_id,
            title: title.into(),
            data: data.into(),
        }
    }

    /// Decode `data` into string cells. Numbers render without a trailing
    /// fraction, `null` becomes an empty cell.
    pub fn table(&self) -> Result<Vec<Vec<String>>, DomainError> {
        let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(&self.data).map_err(|e| {
            DomainError::parse(format!("Chart '{}' has invalid data: {}", self.title, e))
        })?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}
