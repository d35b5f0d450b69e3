use chrono::{DateTime, NaiveDate, Utc};

use crate::model::list::TaskList;
use crate::model::task::{ImportRecord, Task, TaskInput, TaskPatch, parse_date};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// A rule a task record broke. Only the first failing rule is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Task title is required")]
    EmptyTitle,
    #[error("Task title must be less than 200 characters")]
    TitleTooLong,
    #[error("Description must be less than 1000 characters")]
    DescriptionTooLong,
    #[error("Invalid due date")]
    InvalidDueDate,
}

/// Error type for task operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// The user-editable fields after validation
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidFields {
    title: String,
    description: String,
    due_date: Option<NaiveDate>,
}

/// Apply the record rules in order: title present, title length,
/// description length, due date.
fn validate(
    title: &str,
    description: &str,
    due_date: Option<&str>,
) -> Result<ValidFields, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong);
    }
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong);
    }
    let due_date = match due_date.map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_date(raw).ok_or(ValidationError::InvalidDueDate)?),
    };
    Ok(ValidFields {
        title: title.to_string(),
        description: description.to_string(),
        due_date,
    })
}

pub(crate) fn new_task_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate an id not present in `list`.
fn fresh_id(list: &TaskList) -> String {
    loop {
        let id = new_task_id();
        if !list.contains(&id) {
            return id;
        }
    }
}

fn find_task_mut<'a>(list: &'a mut TaskList, id: &str) -> Result<&'a mut Task, TaskError> {
    list.tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Create / update / delete
// ---------------------------------------------------------------------------

/// Create a task and put it at the front of the list.
///
/// The new task takes order 0 and every existing task shifts down by one,
/// so relative order is untouched.
pub fn create_task(
    list: &mut TaskList,
    input: TaskInput,
    now: DateTime<Utc>,
) -> Result<Task, TaskError> {
    let fields = validate(&input.title, &input.description, input.due_date.as_deref())?;
    let task = Task {
        id: fresh_id(list),
        title: fields.title,
        description: fields.description,
        priority: input.priority,
        due_date: fields.due_date,
        created_at: now,
        completed: false,
        order: 0,
    };
    for existing in &mut list.tasks {
        existing.order = existing.order.saturating_add(1);
    }
    list.tasks.insert(0, task.clone());
    Ok(task)
}

/// Merge `patch` into a task. The merged record is validated as a whole and
/// the stored task is left untouched when it fails.
pub fn update_task(list: &mut TaskList, id: &str, patch: TaskPatch) -> Result<Task, TaskError> {
    let current = list
        .get(id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

    let title = patch.title.as_deref().unwrap_or(&current.title);
    let description = patch
        .description
        .as_deref()
        .unwrap_or(&current.description);
    let current_due = current.due_date.map(|d| d.format("%Y-%m-%d").to_string());
    let due = match &patch.due_date {
        Some(new_due) => new_due.as_deref(),
        None => current_due.as_deref(),
    };
    let fields = validate(title, description, due)?;
    let priority = patch.priority.unwrap_or(current.priority);
    let completed = patch.completed.unwrap_or(current.completed);

    let task = find_task_mut(list, id)?;
    task.title = fields.title;
    task.description = fields.description;
    task.due_date = fields.due_date;
    task.priority = priority;
    task.completed = completed;
    Ok(task.clone())
}

/// Remove a task. Survivors keep their `order` values.
pub fn delete_task(list: &mut TaskList, id: &str) -> Result<Task, TaskError> {
    let idx = list
        .position(id)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
    Ok(list.tasks.remove(idx))
}

pub fn toggle_completed(list: &mut TaskList, id: &str) -> Result<Task, TaskError> {
    let task = find_task_mut(list, id)?;
    task.completed = !task.completed;
    Ok(task.clone())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Move `moved_id` to sit immediately before `target_id`, then renumber
/// every task densely by position. Moving a task onto itself does nothing.
pub fn reorder_task(list: &mut TaskList, moved_id: &str, target_id: &str) -> Result<(), TaskError> {
    let from = list
        .position(moved_id)
        .ok_or_else(|| TaskError::NotFound(moved_id.to_string()))?;
    if !list.contains(target_id) {
        return Err(TaskError::NotFound(target_id.to_string()));
    }
    if moved_id == target_id {
        return Ok(());
    }

    let task = list.tasks.remove(from);
    // Target position after the removal
    let to = list
        .position(target_id)
        .ok_or_else(|| TaskError::NotFound(target_id.to_string()))?;
    list.tasks.insert(to, task);
    renumber(list);
    Ok(())
}

/// Reassign `order = index` for every task.
pub fn renumber(list: &mut TaskList) {
    for (i, task) in list.tasks.iter_mut().enumerate() {
        task.order = i;
    }
}

// ---------------------------------------------------------------------------
// Bulk operations
// ---------------------------------------------------------------------------

/// Remove all completed tasks and return how many went.
pub fn clear_completed(list: &mut TaskList) -> usize {
    let before = list.len();
    list.tasks.retain(|t| !t.completed);
    before - list.len()
}

/// Remove every task and return how many went.
pub fn clear_all(list: &mut TaskList) -> usize {
    let count = list.len();
    list.tasks.clear();
    count
}

/// Append imported records after the existing tasks, in input order.
///
/// Every record gets a fresh id. Records whose title trims to nothing are
/// skipped and not counted. Any other invalid record rejects the whole
/// batch and leaves the list untouched.
pub fn import_merge(
    list: &mut TaskList,
    records: Vec<ImportRecord>,
    now: DateTime<Utc>,
) -> Result<usize, TaskError> {
    let mut next_order = list
        .tasks
        .iter()
        .map(|t| t.order.saturating_add(1))
        .max()
        .unwrap_or(0)
        .max(list.len());

    let mut staged = TaskList::default();
    for record in records {
        if record.title.trim().is_empty() {
            continue;
        }
        let fields = validate(&record.title, &record.description, None)?;
        let id = loop {
            let id = fresh_id(list);
            if !staged.contains(&id) {
                break id;
            }
        };
        staged.tasks.push(Task {
            id,
            title: fields.title,
            description: fields.description,
            priority: record.priority,
            due_date: record.due_date,
            created_at: record.created_at.unwrap_or(now),
            completed: record.completed,
            order: next_order,
        });
        next_order = next_order.saturating_add(1);
    }

    let inserted = staged.len();
    list.tasks.append(&mut staged.tasks);
    Ok(inserted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
