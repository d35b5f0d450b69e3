use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::io::lock::{DirLock, LockError};
use crate::io::recovery::{atomic_write, log_load_failure, log_write_failure};
use crate::io::settings_io::{SETTINGS_FILE, parse_settings, render_settings};
use crate::model::settings::Settings;
use crate::model::task::{Priority, Task, parse_date};
use crate::ops::task_ops::new_task_id;

pub const TASKS_FILE: &str = "tasks.json";

/// Error type for the persistence port
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not readable data: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage is read-only")]
    ReadOnly,
}

/// Persistence port: where the task list and settings live between runs.
///
/// Loads return defaults for missing data and `Corrupt` for data that is
/// present but unreadable.
pub trait Storage {
    fn load_tasks(&mut self) -> Result<Vec<Task>, StorageError>;
    fn save_tasks(&mut self, tasks: &[Task]) -> Result<(), StorageError>;
    fn load_settings(&mut self) -> Result<Settings, StorageError>;
    fn save_settings(&mut self, settings: &Settings) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Pick the data directory: explicit flag, then `$NEXUS_DIR`, then
/// `$XDG_DATA_HOME/nexus`, then `~/.local/share/nexus`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }
    let non_empty = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty());
    if let Some(dir) = non_empty("NEXUS_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg).join("nexus"));
    }
    non_empty("HOME").map(|home| PathBuf::from(home).join(".local/share/nexus"))
}

// ---------------------------------------------------------------------------
// Task file decoding
// ---------------------------------------------------------------------------

/// Decode tasks.json leniently. Missing fields take defaults, duplicate or
/// missing ids are replaced, and the result is stably sorted by `order` and
/// then renumbered `0..n`.
pub fn decode_tasks(text: &str, now: DateTime<Utc>) -> Result<Vec<Task>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<Value> = serde_json::from_str(text).map_err(|e| e.to_string())?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(raw.len());
    for (position, entry) in raw.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            return Err(format!("entry {} is not an object", position + 1));
        };
        let text_field = |key: &str| obj.get(key).and_then(Value::as_str);

        let id = match text_field("id") {
            Some(id) if !id.is_empty() && !seen.contains(id) => id.to_string(),
            _ => loop {
                let id = new_task_id();
                if !seen.contains(&id) {
                    break id;
                }
            },
        };
        seen.insert(id.clone());

        tasks.push(Task {
            id,
            title: text_field("title").unwrap_or_default().to_string(),
            description: text_field("description").unwrap_or_default().to_string(),
            priority: text_field("priority")
                .map(Priority::parse_lenient)
                .unwrap_or_default(),
            due_date: text_field("dueDate").and_then(parse_date),
            created_at: text_field("createdAt")
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map_or(now, |dt| dt.with_timezone(&Utc)),
            completed: obj.get("completed").and_then(Value::as_bool).unwrap_or(false),
            order: obj
                .get("order")
                .and_then(Value::as_u64)
                .map_or(position, |o| o as usize),
        });
    }
    tasks.sort_by_key(|t| t.order);
    for (position, task) in tasks.iter_mut().enumerate() {
        task.order = position;
    }
    Ok(tasks)
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// Stores `tasks.json` and `settings.toml` in one directory.
///
/// Every write holds the directory lock and goes through an atomic rename.
/// Unreadable files and failed writes are copied into the recovery log.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(FileStorage { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join(TASKS_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// Read a file, treating "not found" as no content.
    fn read_optional(&self, path: &Path) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write_locked(&self, path: &Path, content: &str) -> Result<(), StorageError> {
        let result = DirLock::acquire_default(&self.dir)
            .map_err(StorageError::from)
            .and_then(|_lock| {
                atomic_write(path, content.as_bytes()).map_err(|source| StorageError::Write {
                    path: path.to_path_buf(),
                    source,
                })
            });
        if let Err(e) = &result {
            log_write_failure(&self.dir, path, &e.to_string(), content);
        }
        result
    }
}

impl Storage for FileStorage {
    fn load_tasks(&mut self) -> Result<Vec<Task>, StorageError> {
        let path = self.tasks_path();
        let Some(text) = self.read_optional(&path)? else {
            return Ok(Vec::new());
        };
        decode_tasks(&text, Utc::now()).map_err(|reason| {
            log_load_failure(&self.dir, &path, &reason, &text);
            StorageError::Corrupt { path, reason }
        })
    }

    fn save_tasks(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(tasks)?;
        self.write_locked(&self.tasks_path(), &json)
    }

    fn load_settings(&mut self) -> Result<Settings, StorageError> {
        let path = self.settings_path();
        let Some(text) = self.read_optional(&path)? else {
            return Ok(Settings::default());
        };
        match parse_settings(&text) {
            Ok((settings, _)) => Ok(settings),
            Err(reason) => {
                log_load_failure(&self.dir, &path, &reason, &text);
                Err(StorageError::Corrupt { path, reason })
            }
        }
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        let path = self.settings_path();
        let existing = self.read_optional(&path).ok().flatten();
        let rendered = render_settings(existing.as_deref(), settings);
        self.write_locked(&path, &rendered)
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// Storage held in memory. `fail_writes` makes every save fail, for
/// exercising the no-rollback path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub tasks: Vec<Task>,
    pub settings: Settings,
    pub fail_writes: bool,
    pub saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        MemoryStorage {
            tasks,
            ..Default::default()
        }
    }
}

impl Storage for MemoryStorage {
    fn load_tasks(&mut self) -> Result<Vec<Task>, StorageError> {
        let mut tasks = self.tasks.clone();
        tasks.sort_by_key(|t| t.order);
        Ok(tasks)
    }

    fn save_tasks(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::ReadOnly);
        }
        self.tasks = tasks.to_vec();
        self.saves += 1;
        Ok(())
    }

    fn load_settings(&mut self) -> Result<Settings, StorageError> {
        Ok(self.settings.clone())
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::ReadOnly);
        }
        self.settings = settings.clone();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::recovery::{RecoveryCategory, read_recovery_entries};
    use crate::model::list::TaskList;
    use crate::model::settings::Theme;
    use crate::model::task::TaskInput;
    use crate::ops::task_ops::create_task;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    fn task(id: &str, order: usize) -> Task {
        Task {
            id: id.into(),
            title: format!("task {}", id),
            description: String::new(),
            priority: Priority::Medium,
            due_date: None,
            created_at: now(),
            completed: false,
            order,
        }
    }

    #[test]
    fn decode_fills_defaults() {
        let tasks = decode_tasks(r#"[{"id": "a", "title": "Only title"}]"#, now()).unwrap();
        assert_eq!(
            tasks,
            vec![Task {
                id: "a".into(),
                title: "Only title".into(),
                description: String::new(),
                priority: Priority::Medium,
                due_date: None,
                created_at: now(),
                completed: false,
                order: 0,
            }]
        );
    }

    #[test]
    fn decode_sorts_by_order_stably() {
        let text = r#"[
            {"id": "c", "title": "c", "order": 2},
            {"id": "a", "title": "a", "order": 0},
            {"id": "b1", "title": "b1", "order": 1},
            {"id": "b2", "title": "b2", "order": 1}
        ]"#;
        let ids: Vec<String> = decode_tasks(text, now())
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn decode_replaces_duplicate_and_missing_ids() {
        let text = r#"[{"id": "dup", "title": "one"}, {"id": "dup", "title": "two"}, {"title": "three"}]"#;
        let tasks = decode_tasks(text, now()).unwrap();
        assert_eq!(tasks[0].id, "dup");
        assert_ne!(tasks[1].id, "dup");
        assert!(!tasks[2].id.is_empty());
        let unique: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn decode_reads_full_record() {
        let text = r#"[{"id": "x", "title": "Pay rent", "description": "monthly",
            "priority": "high", "dueDate": "2026-11-01",
            "createdAt": "2026-10-01T08:00:00.000Z", "completed": true, "order": 4}]"#;
        let t = &decode_tasks(text, now()).unwrap()[0];
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.due_date, NaiveDate::from_ymd_opt(2026, 11, 1));
        assert_eq!(t.created_at, Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap());
        assert!(t.completed);
        // a lone task is renumbered to the front
        assert_eq!(t.order, 0);
    }

    #[test]
    fn decode_renumbers_sparse_and_huge_orders() {
        let text = r#"[
            {"id": "late", "title": "late", "order": 18446744073709551615},
            {"id": "mid", "title": "mid", "order": 40},
            {"id": "first", "title": "first", "order": 7}
        ]"#;
        let tasks = decode_tasks(text, now()).unwrap();
        let orders: Vec<(&str, usize)> = tasks.iter().map(|t| (t.id.as_str(), t.order)).collect();
        assert_eq!(orders, vec![("first", 0), ("mid", 1), ("late", 2)]);

        let mut list = TaskList::from_tasks(tasks);
        create_task(&mut list, TaskInput::new("new"), now()).unwrap();
        let orders: Vec<usize> = list.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_tasks("{not json", now()).is_err());
        assert!(decode_tasks("[1, 2]", now()).is_err());
        assert_eq!(decode_tasks("  ", now()).unwrap(), Vec::new());
    }

    #[test]
    fn file_storage_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(tmp.path().join("data")).unwrap();
        assert!(storage.load_tasks().unwrap().is_empty());
        assert_eq!(storage.load_settings().unwrap(), Settings::default());

        let tasks = vec![task("a", 0), task("b", 1)];
        storage.save_tasks(&tasks).unwrap();
        assert_eq!(storage.load_tasks().unwrap(), tasks);

        let raw = fs::read_to_string(storage.tasks_path()).unwrap();
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"dueDate\": null"));

        let settings = Settings {
            theme: Theme::Dark,
            ..Default::default()
        };
        storage.save_settings(&settings).unwrap();
        assert_eq!(storage.load_settings().unwrap(), settings);
    }

    #[test]
    fn corrupt_tasks_file_goes_to_recovery() {
        let tmp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(tmp.path()).unwrap();
        fs::write(storage.tasks_path(), "{oops").unwrap();

        let err = storage.load_tasks().unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Load);
        assert_eq!(entries[0].body, "{oops");
    }

    #[test]
    fn corrupt_settings_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut storage = FileStorage::open(tmp.path()).unwrap();
        fs::write(storage.settings_path(), "theme = ").unwrap();
        assert!(matches!(
            storage.load_settings(),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn memory_storage_can_fail_writes() {
        let mut storage = MemoryStorage::with_tasks(vec![task("b", 1), task("a", 0)]);
        assert_eq!(storage.load_tasks().unwrap()[0].id, "a");
        storage.fail_writes = true;
        assert!(matches!(storage.save_tasks(&[]), Err(StorageError::ReadOnly)));
        assert_eq!(storage.tasks.len(), 2);
        assert_eq!(storage.saves, 0);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = Path::new("/tmp/somewhere");
        assert_eq!(resolve_data_dir(Some(dir)), Some(dir.to_path_buf()));
    }
}
