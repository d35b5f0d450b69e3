use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::model::task::{ImportRecord, Priority, parse_date};
use crate::ops::task_ops::{TaskError, ValidationError};

/// Error type for import operations
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid file format: {0}")]
    Format(String),
    #[error("no valid tasks found in import file")]
    NoData,
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("row {row}: {source}")]
    InvalidRecord {
        row: usize,
        source: ValidationError,
    },
    #[error("{0}")]
    Merge(#[from] TaskError),
}

/// Which decoder an import file goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Tabular,
}

impl ImportFormat {
    /// `.json` files are JSON; everything else is read as a tabular sheet.
    pub fn from_path(path: &Path) -> ImportFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ImportFormat::Json,
            _ => ImportFormat::Tabular,
        }
    }
}

/// Read and decode an import file. Nothing is merged here.
pub fn import_from_path(
    path: &Path,
    format: Option<ImportFormat>,
) -> Result<Vec<ImportRecord>, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match format.unwrap_or_else(|| ImportFormat::from_path(path)) {
        ImportFormat::Json => parse_json_import(&text),
        ImportFormat::Tabular => parse_tabular_import(text.as_bytes()),
    }
}

fn parse_due(row: usize, raw: &str) -> Result<Option<chrono::NaiveDate>, ImportError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_date(raw).map(Some).ok_or(ImportError::InvalidRecord {
        row,
        source: ValidationError::InvalidDueDate,
    })
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Decode an export document. The top level must be an object with a
/// `tasks` array; within each entry, missing or mistyped fields take
/// their defaults.
pub fn parse_json_import(text: &str) -> Result<Vec<ImportRecord>, ImportError> {
    let doc: Value =
        serde_json::from_str(text).map_err(|e| ImportError::Format(e.to_string()))?;
    let entries = doc
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::Format("no tasks array found".into()))?;

    let mut records = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let row = i + 1;
        let Some(obj) = entry.as_object() else {
            return Err(ImportError::Format(format!("task {} is not an object", row)));
        };
        let created_at = obj
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        records.push(ImportRecord {
            title: str_field(obj, "title").to_string(),
            description: str_field(obj, "description").to_string(),
            priority: Priority::parse_lenient(str_field(obj, "priority")),
            due_date: parse_due(row, str_field(obj, "dueDate"))?,
            completed: obj.get("completed").and_then(Value::as_bool).unwrap_or(false),
            created_at,
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tabular
// ---------------------------------------------------------------------------

/// First non-empty value among the header variants
fn pick<'a>(row: &'a IndexMap<String, String>, keys: &[&str]) -> &'a str {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .map(String::as_str)
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

fn row_completed(row: &IndexMap<String, String>) -> bool {
    row.get("Completed").is_some_and(|v| v == "Yes")
        || row.get("Status").is_some_and(|v| v == "Completed")
        || row.get("completed").is_some_and(|v| v == "true")
}

/// Decode a sheet with a header row. Rows whose title is blank are
/// dropped; if none remain the import fails with `NoData`.
pub fn parse_tabular_import<R: Read>(input: R) -> Result<Vec<ImportRecord>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ImportError::Format(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row_no = i + 1;
        let record = result.map_err(|e| ImportError::Format(e.to_string()))?;
        let row: IndexMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();

        let title = pick(&row, &["Title", "Task Title", "title"]);
        if title.trim().is_empty() {
            continue;
        }
        records.push(ImportRecord {
            title: title.to_string(),
            description: pick(&row, &["Description", "Task Description", "description"])
                .to_string(),
            priority: Priority::parse_lenient(pick(&row, &["Priority", "priority"])),
            due_date: parse_due(row_no, pick(&row, &["Due Date", "dueDate"]))?,
            completed: row_completed(&row),
            created_at: None,
        });
    }

    if records.is_empty() {
        return Err(ImportError::NoData);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn json_requires_tasks_array() {
        assert!(matches!(parse_json_import("{}"), Err(ImportError::Format(_))));
        assert!(matches!(
            parse_json_import(r#"{"tasks": "nope"}"#),
            Err(ImportError::Format(_))
        ));
        assert!(matches!(parse_json_import("[1, 2"), Err(ImportError::Format(_))));
    }

    #[test]
    fn json_fills_defaults() {
        let records = parse_json_import(
            r#"{"tasks": [
                {"id": "old", "title": "Pay rent", "priority": "HIGH", "dueDate": "2024-05-01",
                 "createdAt": "2024-04-01T09:00:00.000Z", "completed": true},
                {"title": "Bare"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Pay rent");
        assert_eq!(records[0].priority, Priority::High);
        assert_eq!(records[0].due_date, date(2024, 5, 1));
        assert!(records[0].completed);
        assert!(records[0].created_at.is_some());

        assert_eq!(records[1].description, "");
        assert_eq!(records[1].priority, Priority::Medium);
        assert_eq!(records[1].due_date, None);
        assert!(!records[1].completed);
        assert_eq!(records[1].created_at, None);
    }

    #[test]
    fn json_bad_due_date_rejects_batch() {
        let err = parse_json_import(r#"{"tasks": [{"title": "a"}, {"title": "b", "dueDate": "soon"}]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidRecord {
                row: 2,
                source: ValidationError::InvalidDueDate
            }
        ));
    }

    #[test]
    fn tabular_reads_exported_sheet() {
        let csv = "\
Task ID,Title,Description,Priority,Priority Value,Due Date,Created Date,Status,Completed,Order
x1,Pay rent,\"Landlord, check\",HIGH,3,2024-05-01,2024-04-01,Pending,No,0
x2,Buy milk,,LOW,1,,2024-04-02,Completed,Yes,1
";
        let records = parse_tabular_import(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description, "Landlord, check");
        assert_eq!(records[0].priority, Priority::High);
        assert_eq!(records[0].due_date, date(2024, 5, 1));
        assert!(!records[0].completed);
        assert!(records[1].completed);
        assert_eq!(records[1].priority, Priority::Low);
    }

    #[test]
    fn tabular_header_variants() {
        let csv = "\
Task Title,Task Description,priority,dueDate,completed
Water plants,Front yard,urgent,04/20/2024,true
";
        let records = parse_tabular_import(csv.as_bytes()).unwrap();
        assert_eq!(records[0].title, "Water plants");
        assert_eq!(records[0].description, "Front yard");
        assert_eq!(records[0].priority, Priority::Medium);
        assert_eq!(records[0].due_date, date(2024, 4, 20));
        assert!(records[0].completed);
    }

    #[test]
    fn tabular_blank_titles_skipped() {
        let csv = "Title,Status\n  ,Completed\nReal one,Pending\n";
        let records = parse_tabular_import(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Real one");
    }

    #[test]
    fn tabular_without_titles_is_no_data() {
        assert!(matches!(
            parse_tabular_import("Title,Priority\n".as_bytes()),
            Err(ImportError::NoData)
        ));
        assert!(matches!(
            parse_tabular_import("Title,Priority\n ,high\n,low\n".as_bytes()),
            Err(ImportError::NoData)
        ));
        assert!(matches!(
            parse_tabular_import("".as_bytes()),
            Err(ImportError::NoData)
        ));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ImportFormat::from_path(Path::new("a.JSON")), ImportFormat::Json);
        assert_eq!(ImportFormat::from_path(Path::new("a.csv")), ImportFormat::Tabular);
        assert_eq!(ImportFormat::from_path(Path::new("noext")), ImportFormat::Tabular);
    }

    #[test]
    fn import_from_path_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("backup.json");
        std::fs::write(&path, r#"{"tasks": [{"title": "From disk"}]}"#).unwrap();
        let records = import_from_path(&path, None).unwrap();
        assert_eq!(records[0].title, "From disk");

        let missing = tmp.path().join("missing.csv");
        assert!(matches!(
            import_from_path(&missing, None),
            Err(ImportError::Read { .. })
        ));
    }
}
