use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::model::task::Task;

/// Completion filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn keeps(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "todo" => Ok(StatusFilter::Pending),
            other => Err(format!(
                "invalid filter '{}' (expected all, completed or pending)",
                other
            )),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::Completed => "completed",
            StatusFilter::Pending => "pending",
        })
    }
}

/// Sort order for the derived view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Heaviest priority first
    #[default]
    Priority,
    /// Newest created first
    Date,
    /// Earliest due first, undated last
    DueDate,
    /// Title, A to Z
    Alphabetical,
    /// Manual ordering (list sequence), no sorting
    Manual,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "priority" => Ok(SortKey::Priority),
            "date" | "created" => Ok(SortKey::Date),
            "duedate" | "due-date" | "due" => Ok(SortKey::DueDate),
            "alphabetical" | "title" => Ok(SortKey::Alphabetical),
            "manual" | "order" => Ok(SortKey::Manual),
            other => Err(format!(
                "invalid sort '{}' (expected priority, date, due-date, alphabetical or manual)",
                other
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Priority => "priority",
            SortKey::Date => "date",
            SortKey::DueDate => "due-date",
            SortKey::Alphabetical => "alphabetical",
            SortKey::Manual => "manual",
        })
    }
}

/// The active filter, search term and sort
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCriteria {
    pub filter: StatusFilter,
    pub search: String,
    pub sort: SortKey,
}

/// A derived, ordered selection of tasks. Built fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View<'a> {
    pub tasks: Vec<&'a Task>,
}

impl<'a> View<'a> {
    /// The "visible count"
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.tasks.iter().copied()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }
}

/// Case-insensitive substring match on title or description. A blank term
/// matches everything.
pub fn matches_search(task: &Task, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&term) || task.description.to_lowercase().contains(&term)
}

/// Search, filter and sort a snapshot. The input is never modified.
pub fn derive_view<'a>(tasks: &'a [Task], criteria: &ViewCriteria) -> View<'a> {
    let mut selected: Vec<&Task> = tasks
        .iter()
        .filter(|t| matches_search(t, &criteria.search))
        .filter(|t| criteria.filter.keeps(t))
        .collect();
    sort_tasks(&mut selected, criteria.sort);
    View { tasks: selected }
}

/// Stable sort: ties keep their incoming relative order.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    match key {
        SortKey::Priority => tasks.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight())),
        SortKey::Date => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::DueDate => tasks.sort_by(|a, b| compare_due(a, b)),
        SortKey::Alphabetical => tasks.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::Manual => {}
    }
}

fn compare_due(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Base letters only, lowercased: `Éclair` folds to `eclair`.
fn fold_title(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Dictionary-style title comparison. Base letters compare first, ignoring
/// accents and case; then accents (`e` before `é`); then case, with
/// lowercase before uppercase.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    fold_title(a)
        .cmp(&fold_title(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .find(|(x, y)| x != y)
                .map_or(Ordering::Equal, |(x, y)| {
                    match (x.is_lowercase(), y.is_lowercase()) {
                        (true, false) => Ordering::Less,
                        (false, true) => Ordering::Greater,
                        _ => x.cmp(&y),
                    }
                })
        })
        .then_with(|| a.len().cmp(&b.len()))
}
