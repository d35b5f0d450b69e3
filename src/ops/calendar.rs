use chrono::{Days, NaiveDate};

use crate::model::task::Task;

pub const DAYS_PER_WEEK: u64 = 7;

/// One cell of the week strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Short weekday name, e.g. `Mon`
    pub weekday: String,
    /// Day of the month
    pub day: u32,
    pub is_today: bool,
    /// Tasks due exactly on this date
    pub task_count: usize,
}

/// Seven consecutive days starting at `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarWeek {
    pub start: NaiveDate,
    pub days: Vec<CalendarDay>,
}

impl CalendarWeek {
    /// Month name and year of the first day, e.g. `October 2026`
    pub fn month_label(&self) -> String {
        self.start.format("%B %Y").to_string()
    }
}

/// First day of the window: `today + offset` whole weeks. Offsets that would
/// run off the representable calendar clamp to its ends.
pub fn window_start(today: NaiveDate, offset: i64) -> NaiveDate {
    let days = offset.unsigned_abs().saturating_mul(DAYS_PER_WEEK);
    let shifted = if offset >= 0 {
        today.checked_add_days(Days::new(days))
    } else {
        today.checked_sub_days(Days::new(days))
    };
    match shifted {
        Some(d) if d.checked_add_days(Days::new(DAYS_PER_WEEK - 1)).is_some() => d,
        _ if offset >= 0 => NaiveDate::MAX - Days::new(DAYS_PER_WEEK - 1),
        _ => NaiveDate::MIN,
    }
}

/// Build the week strip for `offset` weeks away from `today`, counting the
/// tasks due on each day.
pub fn week_window(today: NaiveDate, offset: i64, tasks: &[Task]) -> CalendarWeek {
    let start = window_start(today, offset);
    let days = (0..DAYS_PER_WEEK)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .map(|date| CalendarDay {
            date,
            weekday: date.format("%a").to_string(),
            day: chrono::Datelike::day(&date),
            is_today: date == today,
            task_count: tasks.iter().filter(|t| t.due_date == Some(date)).count(),
        })
        .collect();
    CalendarWeek { start, days }
}

/// Week navigation state: previous/next step by one, reset returns to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarOffset(pub i64);

impl CalendarOffset {
    pub fn next(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    pub fn previous(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Priority;
    use chrono::Utc;
    use insta::assert_snapshot;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due(id: &str, on: Option<NaiveDate>) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: on,
            created_at: Utc::now(),
            completed: false,
            order: 0,
        }
    }

    fn strip(week: &CalendarWeek) -> String {
        week.days
            .iter()
            .map(|d| {
                format!(
                    "{} {:>2}{}{}",
                    d.weekday,
                    d.day,
                    if d.is_today { "*" } else { "" },
                    if d.task_count > 0 {
                        format!(" ({})", d.task_count)
                    } else {
                        String::new()
                    }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn current_week_starts_today() {
        let today = date(2026, 10, 17);
        let tasks = vec![
            due("a", Some(date(2026, 10, 17))),
            due("b", Some(date(2026, 10, 19))),
            due("c", Some(date(2026, 10, 19))),
            due("d", None),
            due("e", Some(date(2026, 10, 24))),
        ];
        let week = week_window(today, 0, &tasks);
        assert_eq!(week.start, today);
        assert_eq!(week.month_label(), "October 2026");
        assert_snapshot!(strip(&week), @r"
        Sat 17* (1)
        Sun 18
        Mon 19 (2)
        Tue 20
        Wed 21
        Thu 22
        Fri 23
        ");
    }

    #[test]
    fn offsets_shift_by_whole_weeks() {
        let today = date(2026, 10, 17);
        let next = week_window(today, 1, &[]);
        assert_eq!(next.start, date(2026, 10, 24));
        assert!(next.days.iter().all(|d| !d.is_today));

        let prev = week_window(today, -2, &[]);
        assert_eq!(prev.start, date(2026, 10, 3));
        assert_eq!(prev.days.len(), 7);
    }

    #[test]
    fn month_label_follows_window_start() {
        let week = week_window(date(2026, 12, 28), 1, &[]);
        assert_eq!(week.month_label(), "January 2027");
    }

    #[test]
    fn extreme_offsets_clamp() {
        let today = date(2026, 10, 17);
        let far = week_window(today, i64::MAX, &[]);
        assert_eq!(far.days.len(), 7);
        assert_eq!(far.days[6].date, NaiveDate::MAX);

        let past = week_window(today, i64::MIN, &[]);
        assert_eq!(past.start, NaiveDate::MIN);
        assert_eq!(past.days.len(), 7);
    }

    #[test]
    fn offset_navigation() {
        let mut offset = CalendarOffset::default();
        offset.next();
        offset.next();
        offset.previous();
        assert_eq!(offset, CalendarOffset(1));
        offset.reset();
        assert_eq!(offset, CalendarOffset(0));
    }
}
