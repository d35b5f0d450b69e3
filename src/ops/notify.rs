use std::time::Duration;

use chrono::NaiveDate;

use crate::model::settings::{Permission, Settings};

pub const REMINDER_TITLE: &str = "NexusTasks Reminder";
pub const REMINDER_BODY: &str = "Don't forget to update your tasks today!";

/// How often the reminder check runs while watching
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Port to whatever can show a reminder to the user.
pub trait Notifier {
    /// Current permission as reported by the capability
    fn permission(&self) -> Permission;
    /// Ask for permission; returns the answer
    fn request_permission(&mut self) -> Permission;
    fn display(&mut self, title: &str, body: &str);
}

/// Per-day scheduler state, derived from the persisted gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// No reminder shown yet today
    Idle,
    /// Today's reminder has been shown
    Fired,
}

pub fn reminder_state(settings: &Settings, today: NaiveDate) -> ReminderState {
    if settings.last_notification_date == Some(today) {
        ReminderState::Fired
    } else {
        ReminderState::Idle
    }
}

/// What a single check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Notifications are switched off in settings
    Disabled,
    /// The capability has not granted permission
    NotPermitted,
    /// A reminder was already shown today
    AlreadyFired,
    /// The reminder was shown and the gate moved to today
    Fired,
}

impl CheckOutcome {
    /// True when the settings changed and need saving
    pub fn settings_changed(self) -> bool {
        self == CheckOutcome::Fired
    }
}

/// Show the daily reminder at most once per calendar day.
///
/// On `Fired` the caller must persist `settings`; the gate only survives a
/// restart once it is saved.
pub fn check_daily_reminder(
    settings: &mut Settings,
    today: NaiveDate,
    notifier: &mut dyn Notifier,
) -> CheckOutcome {
    if !settings.notifications_enabled {
        return CheckOutcome::Disabled;
    }
    if notifier.permission() != Permission::Granted {
        return CheckOutcome::NotPermitted;
    }
    if reminder_state(settings, today) == ReminderState::Fired {
        return CheckOutcome::AlreadyFired;
    }
    notifier.display(REMINDER_TITLE, REMINDER_BODY);
    settings.last_notification_date = Some(today);
    CheckOutcome::Fired
}

/// Run `check` immediately and then once per `interval`. Stops after
/// `max_checks` runs when given, otherwise runs until the process exits.
pub fn run_periodic<F: FnMut()>(interval: Duration, max_checks: Option<usize>, mut check: F) {
    let mut runs = 0usize;
    loop {
        check();
        runs += 1;
        if max_checks.is_some_and(|max| runs >= max) {
            return;
        }
        std::thread::sleep(interval);
    }
}
