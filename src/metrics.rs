//! Scorecard rows from a project's metrics database.
use crate::error::{ViewerError, ViewerResult};
use crate::paths::{check_path_segment, DataRoot};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::time::Instant;

const SCORECARD_QUERY: &str = "SELECT * FROM scorecard_zscores ORDER BY obstypevar, lead_time";

/// One row of the scorecard table, columns in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorecardRow {
    columns: Vec<(String, Value)>,
}

impl Serialize for ScorecardRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Read every scorecard row for `project`, ordered by variable then lead time.
pub fn load_scorecard_rows(
    root: &DataRoot,
    project: Option<&str>,
) -> ViewerResult<Vec<ScorecardRow>> {
    let project = project
        .map(str::trim)
        .filter(|project| !project.is_empty())
        .ok_or_else(|| ViewerError::MissingParameter("Project name not provided".to_string()))?;
    check_path_segment(project)?;

    let db_path = root.metrics_db_path(project);
    if !db_path.is_file() {
        return Err(ViewerError::NotFound(format!(
            "Metrics database not found for project: {project}"
        )));
    }

    let start = Instant::now();
    let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(query_error)?;
    let mut stmt = conn.prepare(SCORECARD_QUERY).map_err(query_error)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut rows = stmt.query([]).map_err(query_error)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(query_error)? {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let value = row.get_ref(idx).map_err(query_error)?;
            columns.push((name.clone(), json_value(value)));
        }
        out.push(ScorecardRow { columns });
    }

    tracing::info!(
        project,
        rows = out.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "scorecard query complete"
    );
    Ok(out)
}

fn query_error(err: rusqlite::Error) -> ViewerError {
    ViewerError::Query(err.to_string())
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::from(int),
        ValueRef::Real(real) => serde_json::Number::from_f64(real)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Blob(bytes) => Value::String(bytes.iter().map(|b| format!("{b:02x}")).collect()),
    }
}
