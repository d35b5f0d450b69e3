use crate::model::task::Task;

/// Why an id or id prefix did not pick out a single task
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdLookupError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("ambiguous id '{prefix}': matches {count} tasks")]
    Ambiguous { prefix: String, count: usize },
}

/// The ordered task collection. Position in `tasks` is the display
/// sequence for manual ordering; only `ops::task_ops` mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    pub(crate) tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        TaskList::default()
    }

    /// Build a list from tasks already in display sequence.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        TaskList { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// An owned point-in-time copy for consumers that outlive a borrow
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Resolve a full id or an unambiguous id prefix (as printed by `nx list`).
    /// An exact match wins over any prefix match.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<&str, IdLookupError> {
        if let Some(task) = self.get(id_or_prefix) {
            return Ok(task.id.as_str());
        }
        let not_found = || IdLookupError::NotFound(id_or_prefix.to_string());
        if id_or_prefix.is_empty() {
            return Err(not_found());
        }
        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.id.starts_with(id_or_prefix))
            .collect();
        match matches.as_slice() {
            [] => Err(not_found()),
            [only] => Ok(only.id.as_str()),
            many => Err(IdLookupError::Ambiguous {
                prefix: id_or_prefix.to_string(),
                count: many.len(),
            }),
        }
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
