use std::io::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::model::task::Task;
use crate::ops::stats::TaskStats;

/// Version tag written into JSON exports
pub const EXPORT_VERSION: &str = "2.0";

/// File name stem for exports made on `date`, e.g. `nexus-tasks-2026-10-17`
pub fn export_stem(date: NaiveDate) -> String {
    format!("nexus-tasks-{}", date.format("%Y-%m-%d"))
}

fn ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// The JSON export document: the full task array plus counts
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub tasks: &'a [Task],
    pub exported_at: DateTime<Utc>,
    pub version: &'static str,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
}

impl<'a> ExportDocument<'a> {
    pub fn new(tasks: &'a [Task], exported_at: DateTime<Utc>) -> Self {
        let stats = TaskStats::of(tasks);
        ExportDocument {
            tasks,
            exported_at,
            version: EXPORT_VERSION,
            total_tasks: stats.total,
            completed_tasks: stats.completed,
            pending_tasks: stats.pending,
        }
    }
}

pub fn export_json(tasks: &[Task], exported_at: DateTime<Utc>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportDocument::new(tasks, exported_at))
}

// ---------------------------------------------------------------------------
// Tabular (one sheet per CSV file)
// ---------------------------------------------------------------------------

/// A named table with a header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Write the header and rows as CSV, quoting only where needed.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

pub const TASK_SHEET_HEADERS: [&str; 10] = [
    "Task ID",
    "Title",
    "Description",
    "Priority",
    "Priority Value",
    "Due Date",
    "Created Date",
    "Status",
    "Completed",
    "Order",
];

/// One row per task, in list sequence
pub fn task_sheet(tasks: &[Task]) -> Sheet {
    let rows = tasks
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.title.clone(),
                t.description.clone(),
                t.priority.as_str().to_uppercase(),
                t.priority.weight().to_string(),
                t.due_date.map(ymd).unwrap_or_default(),
                ymd(t.created_at.date_naive()),
                if t.completed { "Completed" } else { "Pending" }.to_string(),
                if t.completed { "Yes" } else { "No" }.to_string(),
                t.order.to_string(),
            ]
        })
        .collect();
    Sheet {
        name: "Tasks".into(),
        headers: TASK_SHEET_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

/// Aggregate counts, completion rate and the local export timestamp
pub fn summary_sheet(tasks: &[Task], exported_local: NaiveDateTime) -> Sheet {
    let stats = TaskStats::of(tasks);
    Sheet {
        name: "Summary".into(),
        headers: [
            "Total Tasks",
            "Completed Tasks",
            "Pending Tasks",
            "Completion Rate",
            "Export Date",
            "Export Time",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect(),
        rows: vec![vec![
            stats.total.to_string(),
            stats.completed.to_string(),
            stats.pending.to_string(),
            format!("{}%", stats.completion_rate()),
            exported_local.format("%-m/%-d/%Y").to_string(),
            exported_local.format("%-I:%M:%S %p").to_string(),
        ]],
    }
}

/// The task sheet followed by the summary sheet
pub fn build_workbook(tasks: &[Task], exported_local: NaiveDateTime) -> Vec<Sheet> {
    vec![task_sheet(tasks), summary_sheet(tasks, exported_local)]
}

// ---------------------------------------------------------------------------
// Plain CSV
// ---------------------------------------------------------------------------

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// The short CSV export: title and description always quoted, other
/// columns bare. Lines are separated by `\n` with no trailing newline.
pub fn export_csv(tasks: &[Task]) -> String {
    let mut lines = vec!["Title,Description,Priority,Due Date,Status,Created Date".to_string()];
    for t in tasks {
        lines.push(
            [
                quoted(&t.title),
                quoted(&t.description),
                t.priority.as_str().to_string(),
                t.due_date.map(ymd).unwrap_or_default(),
                if t.completed { "Completed" } else { "Pending" }.to_string(),
                ymd(t.created_at.date_naive()),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}
