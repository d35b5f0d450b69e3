use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};

use crate::cli::commands::*;
use crate::cli::notifier::TerminalNotifier;
use crate::cli::output::*;
use crate::io::recovery::{
    self, atomic_write, log_import_failure, prune_recovery, read_recovery_entries,
};
use crate::io::storage::{FileStorage, resolve_data_dir};
use crate::model::list::IdLookupError;
use crate::model::task::{TaskInput, TaskPatch};
use crate::ops::export::{build_workbook, export_csv, export_json, export_stem};
use crate::ops::import::{ImportError, ImportFormat, import_from_path};
use crate::ops::notify::{CHECK_INTERVAL, CheckOutcome, run_periodic};
use crate::session::{Action, Outcome, Session};

type AppSession = Session<FileStorage, TerminalNotifier>;
type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let data_dir = resolve_data_dir(cli.data_dir.as_deref())
        .ok_or("no data directory: pass -C <dir> or set NEXUS_DIR")?;

    match cli.command {
        Commands::Recovery(args) => cmd_recovery(&data_dir, args, json),
        command => run_with_session(&data_dir, command, json),
    }
}

fn run_with_session(data_dir: &Path, command: Commands, json: bool) -> CmdResult {
    let mut session = open_session(data_dir)?;
    print_warnings(&mut session);

    let result = match command {
        // Task store
        Commands::Add(args) => cmd_add(&mut session, args, json),
        Commands::Edit(args) => cmd_edit(&mut session, args, json),
        Commands::Rm(args) => cmd_rm(&mut session, args, json),
        Commands::Toggle(args) => cmd_toggle(&mut session, args, json),
        Commands::Mv(args) => cmd_mv(&mut session, args),
        Commands::ClearCompleted => cmd_clear_completed(&mut session, json),
        Commands::ClearAll(args) => cmd_clear_all(&mut session, args, json),

        // Read commands
        Commands::List(args) => cmd_list(&mut session, args, json),
        Commands::Show(args) => cmd_show(&session, args, json),
        Commands::Stats => cmd_stats(&session, json),
        Commands::Calendar(args) => cmd_calendar(&mut session, args, json),

        // Import / export
        Commands::Export(args) => cmd_export(&session, args, json),
        Commands::Import(args) => cmd_import(&mut session, data_dir, args, json),

        // Settings and reminders
        Commands::Settings => cmd_settings(&session, json),
        Commands::Theme(args) => apply_setting(&mut session, Action::SetTheme(args.theme), json),
        Commands::Accent(args) => apply_setting(&mut session, Action::SetAccent(args.color), json),
        Commands::Sound => apply_setting(&mut session, Action::ToggleSound, json),
        Commands::Notifications(args) => apply_setting(
            &mut session,
            Action::SetNotifications(args.state == Switch::On),
            json,
        ),
        Commands::Remind(args) => cmd_remind(&mut session, args, json),

        Commands::Recovery(args) => cmd_recovery(data_dir, args, json),
    };

    print_warnings(&mut session);
    result
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_session(data_dir: &Path) -> Result<AppSession, Box<dyn std::error::Error>> {
    let storage = FileStorage::open(data_dir)?;
    let mut session = Session::open(storage, TerminalNotifier::new(false));
    let bell = session.settings().sound_enabled;
    session.notifier_mut().bell = bell;
    Ok(session)
}

fn print_warnings(session: &mut AppSession) {
    for warning in session.take_warnings() {
        eprintln!("warning: {}", warning);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Unknown ids pass through so the store reports them as not found; an
/// ambiguous prefix is an error.
fn resolve_target(session: &AppSession, raw: &str) -> Result<String, IdLookupError> {
    match session.resolve_id(raw) {
        Err(IdLookupError::NotFound(_)) => Ok(raw.to_string()),
        resolved => resolved,
    }
}

/// Sound cue for add, complete and delete
fn chime_for(session: &AppSession, outcome: &Outcome) {
    if outcome.plays_sound() {
        session.notifier().chime();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// Print the task an action touched, or warn that the id matched nothing.
fn report_task(outcome: Outcome, verb: &str, json: bool) -> CmdResult {
    let task = match outcome {
        Outcome::Created(t) | Outcome::Updated(t) | Outcome::Deleted(t) | Outcome::Toggled(t) => t,
        Outcome::NotFound(id) => {
            eprintln!("warning: task not found: {}", id);
            return Ok(());
        }
        other => return Err(format!("unexpected outcome: {:?}", other).into()),
    };
    if json {
        print_json(&task_to_json(&task, today()))
    } else {
        println!("{} {} {}", verb, short_id(&task.id), task.title);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task store commands
// ---------------------------------------------------------------------------

fn cmd_add(session: &mut AppSession, args: AddArgs, json: bool) -> CmdResult {
    let mut input = TaskInput::new(args.title.join(" ")).priority(args.priority);
    if let Some(description) = args.description {
        input = input.description(description);
    }
    if let Some(due) = args.due {
        input = input.due(due);
    }
    let applied = session.apply(Action::Create(input), Utc::now())?;
    chime_for(session, &applied.outcome);
    report_task(applied.outcome, "added", json)
}

fn cmd_edit(session: &mut AppSession, args: EditArgs, json: bool) -> CmdResult {
    let patch = TaskPatch {
        title: args.title,
        description: args.description,
        priority: args.priority,
        due_date: if args.no_due { Some(None) } else { args.due.map(Some) },
        completed: None,
    };
    if patch.is_empty() {
        return Err("nothing to change: pass --title, --description, --priority, --due or --no-due".into());
    }
    let id = resolve_target(session, &args.id)?;
    let applied = session.apply(Action::Update { id, patch }, Utc::now())?;
    report_task(applied.outcome, "updated", json)
}

fn cmd_rm(session: &mut AppSession, args: IdArg, json: bool) -> CmdResult {
    let id = resolve_target(session, &args.id)?;
    let applied = session.apply(Action::Delete(id), Utc::now())?;
    chime_for(session, &applied.outcome);
    report_task(applied.outcome, "deleted", json)
}

fn cmd_toggle(session: &mut AppSession, args: IdArg, json: bool) -> CmdResult {
    let id = resolve_target(session, &args.id)?;
    let applied = session.apply(Action::Toggle(id), Utc::now())?;
    chime_for(session, &applied.outcome);
    let verb = match &applied.outcome {
        Outcome::Toggled(t) if t.completed => "completed",
        _ => "reopened",
    };
    report_task(applied.outcome, verb, json)
}

fn cmd_mv(session: &mut AppSession, args: MvArgs) -> CmdResult {
    let moved = resolve_target(session, &args.id)?;
    let target = resolve_target(session, &args.before)?;
    match session.apply(Action::Reorder { moved, target }, Utc::now())?.outcome {
        Outcome::NotFound(id) => eprintln!("warning: task not found: {}", id),
        _ => println!("moved {} before {}", short_id(&args.id), short_id(&args.before)),
    }
    Ok(())
}

fn report_cleared(outcome: Outcome, what: &str, json: bool) -> CmdResult {
    let Outcome::Cleared(count) = outcome else {
        return Err(format!("unexpected outcome: {:?}", outcome).into());
    };
    if json {
        print_json(&serde_json::json!({ "removed": count }))
    } else {
        println!("removed {} {}", count, what);
        Ok(())
    }
}

fn cmd_clear_completed(session: &mut AppSession, json: bool) -> CmdResult {
    let applied = session.apply(Action::ClearCompleted, Utc::now())?;
    report_cleared(applied.outcome, "completed tasks", json)
}

fn cmd_clear_all(session: &mut AppSession, args: ClearAllArgs, json: bool) -> CmdResult {
    if !args.yes {
        return Err(format!(
            "this deletes all {} tasks; re-run with --yes to confirm",
            session.tasks().len()
        )
        .into());
    }
    let applied = session.apply(Action::ClearAll, Utc::now())?;
    report_cleared(applied.outcome, "tasks", json)
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(session: &mut AppSession, args: ListArgs, json: bool) -> CmdResult {
    let now = Utc::now();
    session.apply(Action::SetFilter(args.filter), now)?;
    session.apply(Action::SetSort(args.sort), now)?;
    session.apply(Action::SetSearch(args.search), now)?;

    let view = session.view();
    let total = session.tasks().len();
    if json {
        print_json(&list_to_json(&view, session.criteria(), total, today()))
    } else {
        print_lines(format_task_list(&view, total, today()));
        Ok(())
    }
}

fn cmd_show(session: &AppSession, args: IdArg, json: bool) -> CmdResult {
    let id = session.resolve_id(&args.id)?;
    let task = session
        .list()
        .get(&id)
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    if json {
        print_json(&task_to_json(task, today()))
    } else {
        print_lines(format_task_detail(task, today(), Utc::now()));
        Ok(())
    }
}

fn cmd_stats(session: &AppSession, json: bool) -> CmdResult {
    let stats = session.stats();
    if json {
        print_json(&stats_to_json(&stats))
    } else {
        print_lines(format_stats(&stats));
        Ok(())
    }
}

fn cmd_calendar(session: &mut AppSession, args: CalendarArgs, json: bool) -> CmdResult {
    session.apply(Action::CalendarGoto(args.offset), Utc::now())?;
    let week = session.calendar_week(today());
    if json {
        print_json(&calendar_to_json(&week, session.calendar_offset()))
    } else {
        print_lines(format_calendar(&week));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

fn cmd_export(session: &AppSession, args: ExportArgs, json: bool) -> CmdResult {
    let dir = match args.out {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let local = Local::now();
    let stem = export_stem(local.date_naive());
    let tasks = session.tasks();

    let mut written: Vec<PathBuf> = Vec::new();
    match args.format {
        ExportFormat::Json => {
            let path = dir.join(format!("{}.json", stem));
            atomic_write(&path, export_json(tasks, Utc::now())?.as_bytes())?;
            written.push(path);
        }
        ExportFormat::Csv => {
            let path = dir.join(format!("{}.csv", stem));
            atomic_write(&path, export_csv(tasks).as_bytes())?;
            written.push(path);
        }
        ExportFormat::Excel => {
            for sheet in build_workbook(tasks, local.naive_local()) {
                let path = dir.join(format!("{}-{}.csv", stem, sheet.name.to_lowercase()));
                let mut buf = Vec::new();
                sheet.write_csv(&mut buf)?;
                atomic_write(&path, &buf)?;
                written.push(path);
            }
        }
    }

    if json {
        print_json(&serde_json::json!({ "tasks": tasks.len(), "files": written }))
    } else {
        for path in &written {
            println!("exported {} tasks to {}", tasks.len(), path.display());
        }
        Ok(())
    }
}

fn cmd_import(
    session: &mut AppSession,
    data_dir: &Path,
    args: ImportArgs,
    json: bool,
) -> CmdResult {
    let format = args.format.map(|f| match f {
        ImportFormatArg::Json => ImportFormat::Json,
        ImportFormatArg::Tabular => ImportFormat::Tabular,
    });
    let merged = import_from_path(&args.file, format).and_then(|records| {
        session
            .apply(Action::Import(records), Utc::now())
            .map_err(ImportError::from)
    });
    let applied = match merged {
        Ok(applied) => applied,
        Err(e) => {
            log_import_failure(data_dir, &args.file, &e.to_string());
            return Err(format!("import failed: {}", e).into());
        }
    };
    let Outcome::Imported(count) = applied.outcome else {
        return Err(format!("unexpected outcome: {:?}", applied.outcome).into());
    };
    if json {
        print_json(&serde_json::json!({ "imported": count }))
    } else {
        println!("imported {} tasks from {}", count, args.file.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Settings and reminders
// ---------------------------------------------------------------------------

fn cmd_settings(session: &AppSession, json: bool) -> CmdResult {
    if json {
        print_json(session.settings())
    } else {
        print_lines(format_settings(session.settings()));
        Ok(())
    }
}

fn apply_setting(session: &mut AppSession, action: Action, json: bool) -> CmdResult {
    session.apply(action, Utc::now())?;
    cmd_settings(session, json)
}

fn describe_check(outcome: CheckOutcome) -> &'static str {
    match outcome {
        CheckOutcome::Disabled => "notifications are off (turn on with: nx notifications on)",
        CheckOutcome::NotPermitted => "notification permission has not been granted",
        CheckOutcome::AlreadyFired => "already reminded today",
        CheckOutcome::Fired => "reminder shown",
    }
}

fn cmd_remind(session: &mut AppSession, args: RemindArgs, json: bool) -> CmdResult {
    if !args.watch {
        let (outcome, _) = session.check_reminder(today());
        if json {
            return print_json(&serde_json::json!({ "outcome": format!("{:?}", outcome) }));
        }
        if outcome != CheckOutcome::Fired {
            println!("{}", describe_check(outcome));
        }
        return Ok(());
    }

    let interval = args
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or(CHECK_INTERVAL);
    run_periodic(interval, args.max_checks, || {
        session.reload_settings();
        let bell = session.settings().sound_enabled;
        session.notifier_mut().bell = bell;
        session.check_reminder(today());
        print_warnings(session);
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(data_dir: &Path, args: RecoveryCmd, json: bool) -> CmdResult {
    match args.action {
        Some(RecoveryAction::Prune(prune)) => {
            let removed = prune_recovery(data_dir, None, prune.all)?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }))
            } else {
                println!("removed {} recovery entries", removed);
                Ok(())
            }
        }
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(data_dir).display());
            Ok(())
        }
        None => {
            let entries = read_recovery_entries(data_dir, Some(args.limit.unwrap_or(10)));
            if json {
                let values: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                return print_json(&values);
            }
            if entries.is_empty() {
                println!("recovery log is empty");
            }
            for entry in &entries {
                print!("{}", entry.to_markdown());
            }
            Ok(())
        }
    }
}
