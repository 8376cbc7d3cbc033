//! Chart proxy: `Ruleset.Chart("Level Table")`.
//!
//! Chart data is a 2-D table whose first row names the columns.

use questbound_domain::Chart;

use crate::qbscript::error::EvaluationError;
use crate::qbscript::value::Value;

struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn load(chart: &Chart) -> Result<Self, EvaluationError> {
        let mut rows = chart
            .table()
            .map_err(|e| EvaluationError::new(e.to_string()))?
            .into_iter();
        let header = rows.next().unwrap_or_default();
        Ok(Self {
            header,
            rows: rows.collect(),
        })
    }

    fn column_index(&self, chart: &Chart, name: &str) -> Result<usize, EvaluationError> {
        let wanted = name.trim();
        self.header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                EvaluationError::new(format!(
                    "Chart '{}' has no column '{}'",
                    chart.title, name
                ))
            })
    }
}

/// First row whose `source_column` cell equals `source_value`; the cell in
/// `target_column` of that row. Without a match: `0` when the target column
/// holds numbers, otherwise `""`.
pub(crate) fn chart_where(
    chart: &Chart,
    source_column: &str,
    source_value: &Value,
    target_column: &str,
) -> Result<Value, EvaluationError> {
    let table = Table::load(chart)?;
    let source = table.column_index(chart, source_column)?;
    let target = table.column_index(chart, target_column)?;
    let wanted = source_value.to_string();

    let hit = table
        .rows
        .iter()
        .find(|row| row.get(source).is_some_and(|cell| cell.trim() == wanted.trim()));

    if let Some(row) = hit {
        return Ok(row
            .get(target)
            .map(|cell| Value::from_cell(cell))
            .unwrap_or(Value::Null));
    }

    let numeric_column = table
        .rows
        .first()
        .and_then(|row| row.get(target))
        .is_some_and(|cell| matches!(Value::from_cell(cell), Value::Number(_)));
    Ok(if numeric_column {
        Value::Number(0.0)
    } else {
        Value::from("")
    })
}

/// Every cell of a column, header excluded.
pub(crate) fn chart_column(chart: &Chart, column: &str) -> Result<Value, EvaluationError> {
    let table = Table::load(chart)?;
    let index = table.column_index(chart, column)?;
    Ok(Value::List(
        table
            .rows
            .iter()
            .map(|row| row.get(index).map(|c| Value::from_cell(c)).unwrap_or(Value::Null))
            .collect(),
    ))
}
