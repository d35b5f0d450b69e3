use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::settings::{AccentColor, Theme};
use crate::model::task::Priority;
use crate::ops::view::{SortKey, StatusFilter};

#[derive(Parser)]
#[command(name = "nx", about = concat!("nexus v", env!("CARGO_PKG_VERSION"), " - tasks, a week calendar and a daily nudge"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to the top of the list
    Add(AddArgs),
    /// Change a task's fields
    Edit(EditArgs),
    /// Delete a task
    Rm(IdArg),
    /// Flip a task between pending and completed
    #[command(visible_alias = "done")]
    Toggle(IdArg),
    /// Move a task so it sits just before another
    Mv(MvArgs),
    /// List tasks with filter, search and sort
    List(ListArgs),
    /// Show every field of a task
    Show(IdArg),
    /// Show totals and completion rate
    Stats,
    /// Show the seven-day calendar strip
    Calendar(CalendarArgs),
    /// Delete all completed tasks
    ClearCompleted,
    /// Delete every task
    ClearAll(ClearAllArgs),
    /// Write the task list to a file
    Export(ExportArgs),
    /// Append tasks from a JSON or CSV file
    Import(ImportArgs),
    /// Show current settings
    Settings,
    /// Set the color theme
    Theme(ThemeArgs),
    /// Set the accent color
    Accent(AccentArgs),
    /// Toggle sound effects
    Sound,
    /// Turn the daily reminder on or off
    Notifications(NotificationsArgs),
    /// Show today's reminder if it is due
    Remind(RemindArgs),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,
    /// high, medium or low
    #[arg(short, long, default_value_t = Priority::Medium)]
    pub priority: Priority,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID or unique prefix
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(short, long)]
    pub description: Option<String>,
    /// New priority
    #[arg(short, long)]
    pub priority: Option<Priority>,
    /// New due date (YYYY-MM-DD)
    #[arg(long, conflicts_with = "no_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub no_due: bool,
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID or unique prefix
    pub id: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub id: String,
    /// Task it should land in front of
    pub before: String,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// all, completed or pending
    #[arg(long, default_value_t = StatusFilter::All)]
    pub filter: StatusFilter,
    /// priority, date, due-date, alphabetical or manual
    #[arg(long, default_value_t = SortKey::Priority)]
    pub sort: SortKey,
    /// Only tasks whose title or description contains this text
    #[arg(long, default_value = "")]
    pub search: String,
}

#[derive(Args)]
pub struct CalendarArgs {
    /// Weeks away from the current one (negative for past weeks)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset: i64,
}

#[derive(Args)]
pub struct ClearAllArgs {
    /// Confirm deleting every task
    #[arg(long)]
    pub yes: bool,
}

// ---------------------------------------------------------------------------
// Import / export args
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Full task list with export metadata
    Json,
    /// One CSV file per sheet (tasks and summary)
    Excel,
    /// Short CSV with the main columns
    Csv,
}

#[derive(Args)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,
    /// Directory to write into (default: current directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImportFormatArg {
    Json,
    Tabular,
}

#[derive(Args)]
pub struct ImportArgs {
    /// File to import
    pub file: PathBuf,
    /// Decoder to use (default: from the file extension)
    #[arg(long, value_enum)]
    pub format: Option<ImportFormatArg>,
}

// ---------------------------------------------------------------------------
// Settings args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ThemeArgs {
    /// light or dark
    pub theme: Theme,
}

#[derive(Args)]
pub struct AccentArgs {
    /// blue, purple, green or orange
    pub color: AccentColor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Args)]
pub struct NotificationsArgs {
    pub state: Switch,
}

#[derive(Args)]
pub struct RemindArgs {
    /// Keep running and check once an hour
    #[arg(long)]
    pub watch: bool,
    /// Seconds between checks while watching
    #[arg(long, hide = true)]
    pub interval_secs: Option<u64>,
    /// Stop watching after this many checks
    #[arg(long, hide = true)]
    pub max_checks: Option<usize>,
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove entries older than 30 days
    Prune(RecoveryPruneArgs),
    /// Print the path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove every entry
    #[arg(long)]
    pub all: bool,
}
