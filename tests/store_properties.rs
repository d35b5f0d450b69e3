//! Store-wide properties checked through the public session API, backed by
//! in-memory storage.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

use nexus::io::storage::MemoryStorage;
use nexus::model::settings::Permission;
use nexus::model::task::{Priority, Task, TaskInput};
use nexus::ops::export::{export_json, task_sheet};
use nexus::ops::import::{ImportError, parse_json_import, parse_tabular_import};
use nexus::ops::notify::{CheckOutcome, Notifier};
use nexus::ops::view::{SortKey, StatusFilter};
use nexus::session::{Action, Outcome, Session};

#[derive(Default)]
struct CountingNotifier {
    shown: usize,
}

impl Notifier for CountingNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn display(&mut self, _title: &str, _body: &str) {
        self.shown += 1;
    }
}

type TestSession = Session<MemoryStorage, CountingNotifier>;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
}

fn session() -> TestSession {
    Session::open(MemoryStorage::new(), CountingNotifier::default())
}

fn seeded() -> TestSession {
    let mut s = session();
    let inputs = [
        TaskInput::new("Water plants").priority(Priority::Low),
        TaskInput::new("File taxes")
            .priority(Priority::High)
            .due("2026-04-15")
            .description("forms, receipts"),
        TaskInput::new("Call mom").due("2026-10-20"),
        TaskInput::new("Book flights").priority(Priority::High),
    ];
    for (i, input) in inputs.into_iter().enumerate() {
        s.apply(Action::Create(input), now() + Duration::minutes(i as i64))
            .unwrap();
    }
    s
}

fn created_id(s: &mut TestSession, title: &str) -> String {
    match s.apply(Action::Create(TaskInput::new(title)), now()).unwrap().outcome {
        Outcome::Created(task) => task.id,
        other => panic!("expected Created, got {:?}", other),
    }
}

fn assert_dense(s: &TestSession) {
    let orders: Vec<usize> = s.tasks().iter().map(|t| t.order).collect();
    let expected: Vec<usize> = (0..s.tasks().len()).collect();
    assert_eq!(orders, expected);
}

/// Removals leave gaps but never break the sequence
fn assert_increasing(s: &TestSession) {
    let orders: Vec<usize> = s.tasks().iter().map(|t| t.order).collect();
    assert!(orders.windows(2).all(|w| w[0] < w[1]), "{:?}", orders);
}

#[test]
fn order_follows_list_position() {
    let mut s = seeded();
    assert_dense(&s);

    let ids: Vec<String> = s.tasks().iter().map(|t| t.id.clone()).collect();
    s.apply(
        Action::Reorder {
            moved: ids[3].clone(),
            target: ids[0].clone(),
        },
        now(),
    )
    .unwrap();
    assert_dense(&s);

    s.apply(Action::Delete(ids[1].clone()), now()).unwrap();
    assert_increasing(&s);

    s.apply(Action::Toggle(ids[2].clone()), now()).unwrap();
    s.apply(Action::ClearCompleted, now()).unwrap();
    assert_increasing(&s);
    assert_eq!(s.tasks().len(), 2);

    let late = created_id(&mut s, "late arrival");
    assert_increasing(&s);
    assert_eq!(s.tasks()[0].title, "late arrival");
    assert_eq!(s.tasks()[0].order, 0);

    // a reorder closes the gaps
    let last = s.tasks()[2].id.clone();
    s.apply(Action::Reorder { moved: last, target: late }, now())
        .unwrap();
    assert_dense(&s);

    // every write went through to storage
    assert_eq!(s.storage().tasks, s.tasks().to_vec());
}

#[test]
fn create_then_delete_restores_membership() {
    let mut s = seeded();
    let before = s.tasks().to_vec();

    let id = created_id(&mut s, "short-lived");
    s.apply(Action::Delete(id.clone()), now()).unwrap();

    let ids = |tasks: &[Task]| {
        tasks.iter().map(|t| t.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(s.tasks()), ids(&before));
    assert!(!s.list().contains(&id));
    for (after, was) in s.tasks().iter().zip(&before) {
        assert_eq!(after.title, was.title);
        assert_eq!(after.completed, was.completed);
        // create shifted every survivor and delete does not shift back
        assert_eq!(after.order, was.order + 1);
    }
}

#[test]
fn ids_are_unique() {
    let mut s = seeded();
    let exported = export_json(s.tasks(), now()).unwrap();
    let records = parse_json_import(&exported).unwrap();
    s.apply(Action::Import(records), now()).unwrap();

    let mut ids: Vec<&str> = s.tasks().iter().map(|t| t.id.as_str()).collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
    assert_eq!(before, 8);
}

#[test]
fn view_changes_never_touch_the_list() {
    let mut s = seeded();
    let before = s.tasks().to_vec();
    let saves = s.storage().saves;

    for action in [
        Action::SetFilter(StatusFilter::Completed),
        Action::SetSort(SortKey::Alphabetical),
        Action::SetSearch("tax".into()),
        Action::SetSort(SortKey::DueDate),
        Action::CalendarNext,
        Action::CalendarPrevious,
        Action::CalendarReset,
    ] {
        s.apply(action, now()).unwrap();
        let _ = s.view();
    }

    assert_eq!(s.tasks(), &before[..]);
    assert_eq!(s.storage().saves, saves);
}

#[test]
fn view_count_matches_visible_tasks() {
    let mut s = seeded();
    s.apply(Action::SetSearch("  TAX ".into()), now()).unwrap();
    let view = s.view();
    assert_eq!(view.len(), 1);
    assert_eq!(view.iter().count(), view.len());

    s.apply(Action::SetSearch(String::new()), now()).unwrap();
    s.apply(Action::SetFilter(StatusFilter::Pending), now()).unwrap();
    assert_eq!(s.view().len(), s.stats().pending);
}

#[test]
fn json_round_trip_preserves_content() {
    let original = seeded();
    let exported = export_json(original.tasks(), now()).unwrap();

    let mut fresh = session();
    let records = parse_json_import(&exported).unwrap();
    let applied = fresh.apply(Action::Import(records), now()).unwrap();
    assert_eq!(applied.outcome, Outcome::Imported(4));

    let content = |s: &TestSession| {
        s.tasks()
            .iter()
            .map(|t| {
                (
                    t.title.clone(),
                    t.description.clone(),
                    t.priority,
                    t.due_date,
                    t.completed,
                    t.created_at,
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(content(&fresh), content(&original));
    for (a, b) in fresh.tasks().iter().zip(original.tasks()) {
        assert_ne!(a.id, b.id);
    }
}

#[test]
fn tabular_round_trip_keeps_core_fields() {
    let original = seeded();
    let mut csv = Vec::new();
    task_sheet(original.tasks()).write_csv(&mut csv).unwrap();

    let records = parse_tabular_import(csv.as_slice()).unwrap();
    let mut fresh = session();
    fresh.apply(Action::Import(records), now()).unwrap();

    let titles = |s: &TestSession| s.tasks().iter().map(|t| t.title.clone()).collect::<Vec<_>>();
    assert_eq!(titles(&fresh), titles(&original));
    assert_eq!(fresh.tasks()[0].priority, Priority::High);
    assert_eq!(
        fresh.tasks()[2].due_date,
        NaiveDate::from_ymd_opt(2026, 4, 15)
    );
}

#[test]
fn empty_tabular_import_leaves_store_unchanged() {
    let s = seeded();
    let before = s.tasks().to_vec();
    let saves = s.storage().saves;

    let err = parse_tabular_import("Title,Priority\n ,high\n".as_bytes()).unwrap_err();
    assert!(matches!(err, ImportError::NoData));
    assert_eq!(s.tasks(), &before[..]);
    assert_eq!(s.storage().saves, saves);
}

#[test]
fn import_appends_after_existing_tasks() {
    let mut s = seeded();
    let records = parse_json_import(r#"{"tasks": [{"title": "imported"}]}"#).unwrap();
    s.apply(Action::Import(records), now()).unwrap();
    let last = s.tasks().last().unwrap();
    assert_eq!(last.title, "imported");
    assert_eq!(last.order, 4);
}

#[test]
fn failed_validation_changes_nothing() {
    let mut s = seeded();
    let before = s.tasks().to_vec();
    assert!(s.apply(Action::Create(TaskInput::new("  ")), now()).is_err());
    assert!(
        s.apply(Action::Create(TaskInput::new("x").due("soon")), now())
            .is_err()
    );
    assert_eq!(s.tasks(), &before[..]);
}

#[test]
fn reminder_fires_at_most_once_per_day() {
    let mut s = seeded();
    let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

    assert_eq!(s.check_reminder(day).0, CheckOutcome::Disabled);
    s.apply(Action::SetNotifications(true), now()).unwrap();

    let outcomes: Vec<CheckOutcome> = (0..5).map(|_| s.check_reminder(day).0).collect();
    assert_eq!(outcomes[0], CheckOutcome::Fired);
    assert!(outcomes[1..].iter().all(|o| *o == CheckOutcome::AlreadyFired));
    assert_eq!(s.notifier().shown, 1);
    assert_eq!(s.storage().settings.last_notification_date, Some(day));

    // the gate survives a restart through storage
    let storage = MemoryStorage {
        settings: s.storage().settings.clone(),
        ..Default::default()
    };
    let mut reopened = Session::open(storage, CountingNotifier::default());
    assert_eq!(reopened.check_reminder(day).0, CheckOutcome::AlreadyFired);

    let next = day.succ_opt().unwrap();
    assert_eq!(reopened.check_reminder(next).0, CheckOutcome::Fired);
    assert_eq!(reopened.notifier().shown, 1);
}
