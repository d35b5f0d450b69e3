use chrono::{DateTime, NaiveDate, Utc};

use crate::io::storage::{Storage, StorageError};
use crate::model::list::{IdLookupError, TaskList};
use crate::model::settings::{AccentColor, Permission, Settings, Theme};
use crate::model::task::{ImportRecord, Task, TaskInput, TaskPatch};
use crate::ops::calendar::{CalendarOffset, CalendarWeek, week_window};
use crate::ops::notify::{CheckOutcome, Notifier, check_daily_reminder};
use crate::ops::stats::TaskStats;
use crate::ops::task_ops::{self, TaskError};
use crate::ops::view::{SortKey, StatusFilter, View, ViewCriteria, derive_view};

/// A user intent. Each one is applied as a single step.
#[derive(Debug, Clone)]
pub enum Action {
    Create(TaskInput),
    Update { id: String, patch: TaskPatch },
    Delete(String),
    Toggle(String),
    Reorder { moved: String, target: String },
    ClearCompleted,
    ClearAll,
    Import(Vec<ImportRecord>),
    SetFilter(StatusFilter),
    SetSort(SortKey),
    SetSearch(String),
    SetTheme(Theme),
    SetAccent(AccentColor),
    ToggleSound,
    SetNotifications(bool),
    CalendarNext,
    CalendarPrevious,
    CalendarReset,
    /// Jump straight to a week offset
    CalendarGoto(i64),
}

/// What applying an action did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Task),
    Updated(Task),
    Deleted(Task),
    Toggled(Task),
    Reordered,
    Cleared(usize),
    Imported(usize),
    /// The id did not match any task; nothing changed
    NotFound(String),
    ViewChanged,
    SettingsChanged,
    CalendarMoved(i64),
}

impl Outcome {
    /// Adding, completing and deleting a task get an audible cue.
    pub fn plays_sound(&self) -> bool {
        match self {
            Outcome::Created(_) | Outcome::Deleted(_) => true,
            Outcome::Toggled(task) => task.completed,
            _ => false,
        }
    }
}

/// The outcome plus the write-through result. A failed save does not undo
/// the in-memory change.
#[derive(Debug)]
pub struct Applied {
    pub outcome: Outcome,
    pub save_error: Option<StorageError>,
}

impl Applied {
    fn unsaved(outcome: Outcome) -> Self {
        Applied {
            outcome,
            save_error: None,
        }
    }
}

/// The running application state: task list, settings, view criteria and
/// calendar offset, backed by a storage port and a notification port.
pub struct Session<S: Storage, N: Notifier> {
    list: TaskList,
    settings: Settings,
    criteria: ViewCriteria,
    calendar: CalendarOffset,
    storage: S,
    notifier: N,
    warnings: Vec<String>,
}

impl<S: Storage, N: Notifier> Session<S, N> {
    /// Load tasks and settings. Anything unreadable is replaced with
    /// defaults and reported through `take_warnings`.
    pub fn open(mut storage: S, notifier: N) -> Self {
        let mut warnings = Vec::new();
        let tasks = storage.load_tasks().unwrap_or_else(|e| {
            warnings.push(format!("{}; starting with an empty list", e));
            Vec::new()
        });
        let settings = storage.load_settings().unwrap_or_else(|e| {
            warnings.push(format!("{}; using default settings", e));
            Settings::default()
        });
        Session {
            list: TaskList::from_tasks(tasks),
            settings,
            criteria: ViewCriteria::default(),
            calendar: CalendarOffset::default(),
            storage,
            notifier,
            warnings,
        }
    }

    pub fn list(&self) -> &TaskList {
        &self.list
    }

    pub fn tasks(&self) -> &[Task] {
        self.list.tasks()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn criteria(&self) -> &ViewCriteria {
        &self.criteria
    }

    pub fn calendar_offset(&self) -> i64 {
        self.calendar.0
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Re-read settings from storage, keeping the current ones if that fails.
    /// Long-running loops call this so changes made elsewhere take effect.
    pub fn reload_settings(&mut self) {
        match self.storage.load_settings() {
            Ok(settings) => self.settings = settings,
            Err(e) => self.warnings.push(format!("{}; keeping current settings", e)),
        }
    }

    /// Drain the non-fatal problems collected so far.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// The filtered, searched and sorted selection for the current criteria
    pub fn view(&self) -> View<'_> {
        derive_view(self.list.tasks(), &self.criteria)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::of(self.list.tasks())
    }

    pub fn calendar_week(&self, today: NaiveDate) -> CalendarWeek {
        week_window(today, self.calendar.0, self.list.tasks())
    }

    /// Resolve a full id or unambiguous prefix to the stored id.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String, IdLookupError> {
        self.list.resolve_id(id_or_prefix).map(str::to_string)
    }

    // -----------------------------------------------------------------------
    // Applying actions
    // -----------------------------------------------------------------------

    /// Apply one action. Validation errors reject it with no change; an
    /// unknown id is reported as `Outcome::NotFound`.
    pub fn apply(&mut self, action: Action, now: DateTime<Utc>) -> Result<Applied, TaskError> {
        let outcome = match action {
            Action::Create(input) => {
                Outcome::Created(task_ops::create_task(&mut self.list, input, now)?)
            }
            Action::Update { id, patch } => {
                match task_ops::update_task(&mut self.list, &id, patch) {
                    Ok(task) => Outcome::Updated(task),
                    Err(TaskError::NotFound(id)) => return Ok(Applied::unsaved(Outcome::NotFound(id))),
                    Err(e) => return Err(e),
                }
            }
            Action::Delete(id) => match task_ops::delete_task(&mut self.list, &id) {
                Ok(task) => Outcome::Deleted(task),
                Err(TaskError::NotFound(id)) => return Ok(Applied::unsaved(Outcome::NotFound(id))),
                Err(e) => return Err(e),
            },
            Action::Toggle(id) => match task_ops::toggle_completed(&mut self.list, &id) {
                Ok(task) => Outcome::Toggled(task),
                Err(TaskError::NotFound(id)) => return Ok(Applied::unsaved(Outcome::NotFound(id))),
                Err(e) => return Err(e),
            },
            Action::Reorder { moved, target } => {
                match task_ops::reorder_task(&mut self.list, &moved, &target) {
                    Ok(()) => Outcome::Reordered,
                    Err(TaskError::NotFound(id)) => {
                        return Ok(Applied::unsaved(Outcome::NotFound(id)));
                    }
                    Err(e) => return Err(e),
                }
            }
            Action::ClearCompleted => Outcome::Cleared(task_ops::clear_completed(&mut self.list)),
            Action::ClearAll => Outcome::Cleared(task_ops::clear_all(&mut self.list)),
            Action::Import(records) => {
                Outcome::Imported(task_ops::import_merge(&mut self.list, records, now)?)
            }

            Action::SetFilter(filter) => {
                self.criteria.filter = filter;
                return Ok(Applied::unsaved(Outcome::ViewChanged));
            }
            Action::SetSort(sort) => {
                self.criteria.sort = sort;
                return Ok(Applied::unsaved(Outcome::ViewChanged));
            }
            Action::SetSearch(term) => {
                self.criteria.search = term;
                return Ok(Applied::unsaved(Outcome::ViewChanged));
            }

            Action::SetTheme(theme) => {
                self.settings.theme = theme;
                return Ok(self.save_settings());
            }
            Action::SetAccent(accent) => {
                self.settings.accent_color = accent;
                return Ok(self.save_settings());
            }
            Action::ToggleSound => {
                self.settings.sound_enabled = !self.settings.sound_enabled;
                return Ok(self.save_settings());
            }
            Action::SetNotifications(on) => {
                self.set_notifications(on);
                return Ok(self.save_settings());
            }

            Action::CalendarNext => {
                self.calendar.next();
                return Ok(Applied::unsaved(Outcome::CalendarMoved(self.calendar.0)));
            }
            Action::CalendarPrevious => {
                self.calendar.previous();
                return Ok(Applied::unsaved(Outcome::CalendarMoved(self.calendar.0)));
            }
            Action::CalendarReset => {
                self.calendar.reset();
                return Ok(Applied::unsaved(Outcome::CalendarMoved(self.calendar.0)));
            }
            Action::CalendarGoto(offset) => {
                self.calendar = CalendarOffset(offset);
                return Ok(Applied::unsaved(Outcome::CalendarMoved(offset)));
            }
        };
        Ok(self.save_tasks(outcome))
    }

    /// Enabling asks the notifier for permission unless it is already
    /// granted; a refusal leaves notifications off.
    fn set_notifications(&mut self, on: bool) {
        if !on {
            self.settings.notifications_enabled = false;
            return;
        }
        let mut permission = self.notifier.permission();
        if permission != Permission::Granted {
            permission = self.notifier.request_permission();
        }
        self.settings.notification_permission = permission;
        self.settings.notifications_enabled = permission == Permission::Granted;
        if !self.settings.notifications_enabled {
            self.warnings
                .push("notification permission was not granted; notifications stay off".into());
        }
    }

    fn save_tasks(&mut self, outcome: Outcome) -> Applied {
        let save_error = self.storage.save_tasks(self.list.tasks()).err();
        if let Some(e) = &save_error {
            self.warnings.push(format!("tasks not saved: {}", e));
        }
        Applied {
            outcome,
            save_error,
        }
    }

    fn save_settings(&mut self) -> Applied {
        let save_error = self.storage.save_settings(&self.settings).err();
        if let Some(e) = &save_error {
            self.warnings.push(format!("settings not saved: {}", e));
        }
        Applied {
            outcome: Outcome::SettingsChanged,
            save_error,
        }
    }

    /// Run one daily reminder check. The date gate is saved when it moves.
    pub fn check_reminder(&mut self, today: NaiveDate) -> (CheckOutcome, Option<StorageError>) {
        let outcome = check_daily_reminder(&mut self.settings, today, &mut self.notifier);
        if !outcome.settings_changed() {
            return (outcome, None);
        }
        (outcome, self.save_settings().save_error)
    }
}
