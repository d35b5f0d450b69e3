use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::model::settings::Settings;
use crate::model::task::Task;
use crate::ops::calendar::CalendarWeek;
use crate::ops::stats::TaskStats;
use crate::ops::view::{View, ViewCriteria};
use crate::util::unicode::{fit_to_width, truncate_chars};

/// Descriptions longer than this are cut in list output
pub const DESCRIPTION_PREVIEW_CHARS: usize = 150;

const TITLE_CELLS: usize = 40;
const SHORT_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub overdue: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJson<'a> {
    pub filter: String,
    pub sort: String,
    pub search: &'a str,
    pub visible: usize,
    pub total: usize,
    pub tasks: Vec<TaskJson<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate: u32,
}

#[derive(Serialize)]
pub struct CalendarDayJson {
    pub date: NaiveDate,
    pub weekday: String,
    pub day: u32,
    pub today: bool,
    pub tasks: usize,
}

#[derive(Serialize)]
pub struct CalendarJson {
    pub month: String,
    pub offset: i64,
    pub days: Vec<CalendarDayJson>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task, today: NaiveDate) -> TaskJson<'_> {
    TaskJson {
        task,
        overdue: !task.completed && task.is_overdue(today),
    }
}

pub fn list_to_json<'a>(
    view: &View<'a>,
    criteria: &'a ViewCriteria,
    total: usize,
    today: NaiveDate,
) -> ListJson<'a> {
    ListJson {
        filter: criteria.filter.to_string(),
        sort: criteria.sort.to_string(),
        search: &criteria.search,
        visible: view.len(),
        total,
        tasks: view.iter().map(|t| task_to_json(t, today)).collect(),
    }
}

pub fn stats_to_json(stats: &TaskStats) -> StatsJson {
    StatsJson {
        total: stats.total,
        completed: stats.completed,
        pending: stats.pending,
        completion_rate: stats.completion_rate(),
    }
}

pub fn calendar_to_json(week: &CalendarWeek, offset: i64) -> CalendarJson {
    CalendarJson {
        month: week.month_label(),
        offset,
        days: week
            .days
            .iter()
            .map(|d| CalendarDayJson {
                date: d.date,
                weekday: d.weekday.clone(),
                day: d.day,
                today: d.is_today,
                tasks: d.task_count,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Relative labels
// ---------------------------------------------------------------------------

pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Due date as `Sat, Oct 17`, with the year when it differs from today's,
/// plus `(Overdue)`, `(Today)` or `(Tomorrow)`. Completed tasks never show
/// as overdue.
pub fn due_label(due: Option<NaiveDate>, completed: bool, today: NaiveDate) -> String {
    let Some(date) = due else {
        return "No due date".to_string();
    };
    let mut label = if date.year() == today.year() {
        date.format("%a, %b %-d").to_string()
    } else {
        date.format("%a, %b %-d, %Y").to_string()
    };
    if date < today {
        if !completed {
            label.push_str(" (Overdue)");
        }
    } else if date == today {
        label.push_str(" (Today)");
    } else if today.succ_opt() == Some(date) {
        label.push_str(" (Tomorrow)");
    }
    label
}

/// How long ago a task was created: `Today`, `Yesterday`, `N days ago`,
/// `N weeks ago`, then the plain date from 30 days on.
pub fn created_label(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - created).num_days().unsigned_abs();
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        7..=29 => format!("{} weeks ago", days / 7),
        _ => created.format("%b %-d, %Y").to_string(),
    }
}

// ---------------------------------------------------------------------------
// Human formatting
// ---------------------------------------------------------------------------

fn check_mark(task: &Task) -> &'static str {
    if task.completed { "[x]" } else { "[ ]" }
}

/// One list row, plus an indented description preview when there is one
pub fn format_task_line(task: &Task, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}  {:<6}  {}  {}",
        check_mark(task),
        short_id(&task.id),
        task.priority.as_str(),
        fit_to_width(&task.title, TITLE_CELLS),
        due_label(task.due_date, task.completed, today),
    )];
    if !task.description.is_empty() {
        lines.push(format!(
            "      {}",
            truncate_chars(&task.description, DESCRIPTION_PREVIEW_CHARS)
        ));
    }
    lines
}

pub fn format_task_list(view: &View<'_>, total: usize, today: NaiveDate) -> Vec<String> {
    let mut lines: Vec<String> = view
        .iter()
        .flat_map(|t| format_task_line(t, today))
        .collect();
    if view.is_empty() {
        lines.push("No tasks found".to_string());
    }
    lines.push(String::new());
    lines.push(format!("{} of {} tasks shown", view.len(), total));
    lines
}

pub fn format_task_detail(task: &Task, today: NaiveDate, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", check_mark(task), task.title),
        format!("id:       {}", task.id),
        format!("priority: {}", task.priority),
        format!("due:      {}", due_label(task.due_date, task.completed, today)),
        format!(
            "created:  {} ({})",
            created_label(task.created_at, now),
            task.created_at.format("%Y-%m-%d %H:%M UTC")
        ),
        format!(
            "status:   {}",
            if task.completed { "Completed" } else { "Pending" }
        ),
    ];
    if !task.description.is_empty() {
        lines.push("description:".to_string());
        for line in task.description.lines() {
            lines.push(format!("  {}", line));
        }
    }
    lines
}

pub fn format_stats(stats: &TaskStats) -> Vec<String> {
    vec![
        format!("total:     {}", stats.total),
        format!("completed: {}", stats.completed),
        format!("pending:   {}", stats.pending),
        format!("progress:  {}%", stats.completion_rate()),
    ]
}

/// Month header followed by one row per day; `*` marks today and the
/// number in parentheses counts tasks due that day.
pub fn format_calendar(week: &CalendarWeek) -> Vec<String> {
    let mut lines = vec![week.month_label()];
    for d in &week.days {
        let mut line = format!("{} {:>2}", d.weekday, d.day);
        if d.is_today {
            line.push('*');
        }
        if d.task_count > 0 {
            line.push_str(&format!(
                " ({} task{})",
                d.task_count,
                if d.task_count == 1 { "" } else { "s" }
            ));
        }
        lines.push(line);
    }
    lines
}

pub fn format_settings(settings: &Settings) -> Vec<String> {
    let on_off = |b: bool| if b { "on" } else { "off" };
    vec![
        format!("theme:         {}", settings.theme),
        format!("accent:        {}", settings.accent_color),
        format!("sound:         {}", on_off(settings.sound_enabled)),
        format!("notifications: {}", on_off(settings.notifications_enabled)),
        format!("permission:    {}", settings.notification_permission),
        format!(
            "last reminder: {}",
            settings
                .last_notification_date
                .map_or_else(|| "never".to_string(), |d| d.to_string())
        ),
    ]
}
