use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tempfile::NamedTempFile;

use crate::io::lock::DirLock;

pub const RECOVERY_LOG: &str = ".recovery.log";

/// Entries older than this are dropped by `nx recovery prune`.
pub const PRUNE_AGE_DAYS: i64 = 30;

const FILE_HEADER: &str = "\
<!-- nexus recovery log: data that could not be loaded or saved.
     View with: nx recovery
     Drop entries older than 30 days: nx recovery prune
     Safe to delete once you have what you need. -->

---
";

/// Separator between the timestamp and the category in an entry header
const HEADER_SEP: &str = " | ";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// A data file could not be parsed and defaults were used instead
    Load,
    /// A save failed; the body holds what would have been written
    Write,
    /// An import file was rejected
    Import,
}

impl RecoveryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryCategory::Load => "load",
            RecoveryCategory::Write => "write",
            RecoveryCategory::Import => "import",
        }
    }
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(RecoveryCategory::Load),
            "write" => Ok(RecoveryCategory::Write),
            "import" => Ok(RecoveryCategory::Import),
            other => Err(format!("unknown recovery category '{}'", other)),
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Markdown block as stored in the log
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {}{}{}: {}\n\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            HEADER_SEP,
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            "category": self.category.as_str(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

pub fn recovery_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(RECOVERY_LOG)
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` through a temp file in the same directory and
/// a rename, so readers never see a half-written file.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append an entry. Best-effort: failures become a stderr warning.
pub fn log_recovery(data_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(data_dir, &entry) {
        eprintln!("warning: could not write to recovery log: {}", e);
    }
}

fn append_entry(data_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(data_dir);
    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Record a data file that could not be parsed, keeping its raw text.
pub fn log_load_failure(data_dir: &Path, file: &Path, reason: &str, content: &str) {
    log_recovery(
        data_dir,
        RecoveryEntry::new(RecoveryCategory::Load, "unreadable data file, defaults used")
            .field("File", file.display())
            .field("Reason", reason)
            .body(content),
    );
}

/// Record a failed save together with the content that was not written.
pub fn log_write_failure(data_dir: &Path, file: &Path, error: &str, content: &str) {
    log_recovery(
        data_dir,
        RecoveryEntry::new(RecoveryCategory::Write, "save failed")
            .field("File", file.display())
            .field("Error", error)
            .body(content),
    );
}

pub fn log_import_failure(data_dir: &Path, source: &Path, error: &str) {
    log_recovery(
        data_dir,
        RecoveryEntry::new(RecoveryCategory::Import, "import rejected")
            .field("Source", source.display())
            .field("Error", error),
    );
}

// ---------------------------------------------------------------------------
// Reading entries
// ---------------------------------------------------------------------------

/// Entries newest first. `limit` keeps only the most recent `n`.
pub fn read_recovery_entries(data_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let Ok(content) = std::fs::read_to_string(recovery_log_path(data_dir)) else {
        return Vec::new();
    };
    let mut entries = parse_entries(&content);
    if let Some(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries.reverse();
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        let Some((timestamp, category, description)) =
            line.strip_prefix("## ").and_then(parse_entry_header)
        else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body_lines: Vec<&str> = Vec::new();
        let mut in_body = false;

        while let Some(&line) = lines.peek() {
            if !in_body && (line == "---" || line.starts_with("## ")) {
                break;
            }
            lines.next();
            if in_body {
                if line == "```" {
                    in_body = false;
                } else {
                    body_lines.push(line);
                }
            } else if line.starts_with("```") {
                in_body = true;
            } else if let Some((key, value)) = line.trim().split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body: body_lines.join("\n"),
        });
    }
    entries
}

fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (stamp, rest) = header.split_once(HEADER_SEP)?;
    let timestamp = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
    let (category, description) = rest.split_once(": ")?;
    Some((timestamp, category.parse().ok()?, description.to_string()))
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Drop entries older than `cutoff` (default: 30 days ago), or every entry
/// when `all` is set. Returns how many were removed.
pub fn prune_recovery(
    data_dir: &Path,
    cutoff: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(data_dir);
    if !path.exists() {
        return Ok(0);
    }
    let _lock = DirLock::acquire_default(data_dir).map_err(io::Error::other)?;

    let content = std::fs::read_to_string(&path)?;
    let entries = parse_entries(&content);
    let before = entries.len();
    let cutoff = cutoff.unwrap_or_else(|| Utc::now() - Duration::days(PRUNE_AGE_DAYS));

    let kept: Vec<&RecoveryEntry> = if all {
        Vec::new()
    } else {
        entries.iter().filter(|e| e.timestamp >= cutoff).collect()
    };

    let mut out = String::from(FILE_HEADER);
    for entry in &kept {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(&path, out.as_bytes())?;
    Ok(before - kept.len())
}
