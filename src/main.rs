use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use workplan_tracker::actions;
use workplan_tracker::config::TrackerConfig;
use workplan_tracker::extract::{SI_TRACKER_FILE, SI_TRACKER_SHEET, TaskSelection};
use workplan_tracker::filter::{FilterOptions, TaskFilter};
use workplan_tracker::model::{Region, Status, TaskTable};
use workplan_tracker::reconcile::ChangeSet;
use workplan_tracker::session::Session;
use workplan_tracker::store::TrackerStore;
use workplan_tracker::summary::{FinancialSummary, StatusSummary, status_by_program_area};
use workplan_tracker::update::{ProgressPolicy, StatusUpdate};
use workplan_tracker::{Result, TrackerError};

const ACTIVITY_WIDTH: usize = 60;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.global.verbose)?;
    let config = resolve_config(&cli.global)?;
    let store = TrackerStore::from_config(&config);

    match cli.command {
        Command::Extract(args) => execute_extract(&config, args),
        Command::Migrate => execute_migrate(&store),
        Command::Summary(args) => execute_summary(&store, &args.filter()),
        Command::List(args) => execute_list(&store, &args.filter()),
        Command::Export(args) => execute_export(&store, args),
        Command::Apply(args) => {
            let session = session(cli.global.user)?;
            let change_set = actions::apply_edit_file(&store, &args.edits, &session)?;
            report_changes(&change_set);
            Ok(())
        }
        Command::Update(args) => {
            let session = session(cli.global.user)?;
            execute_update(&store, args, &session)
        }
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = if verbose > 0 { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| TrackerError::Logging(error.to_string()))
}

fn resolve_config(args: &GlobalArgs) -> Result<TrackerConfig> {
    let mut config = TrackerConfig::load(args.config.as_deref())?;
    if let Some(tracker) = &args.tracker {
        config.tracker_file = tracker.clone();
    }
    if let Some(sheet) = &args.sheet {
        config.tracker_sheet = sheet.clone();
    }
    if let Some(backup_dir) = &args.backup_dir {
        config.backup_dir = backup_dir.clone();
    }
    Ok(config)
}

fn session(user: Option<String>) -> Result<Session> {
    Session::new(user.unwrap_or_default())
}

fn execute_extract(config: &TrackerConfig, args: ExtractArgs) -> Result<()> {
    let mut source_config = config.source.clone();
    if let Some(sheet) = args.source_sheet {
        source_config.sheet = sheet;
    }
    let input = args
        .input
        .or_else(|| source_config.file.clone())
        .ok_or_else(|| TrackerError::MissingInput(PathBuf::from("<workplan>")))?;

    let (selection, output, sheet) = if args.si {
        (
            TaskSelection::StrategicInformation,
            args.output.unwrap_or_else(|| PathBuf::from(SI_TRACKER_FILE)),
            SI_TRACKER_SHEET,
        )
    } else {
        (
            TaskSelection::All,
            args.output.unwrap_or_else(|| config.tracker_file.clone()),
            config.tracker_sheet.as_str(),
        )
    };

    let table = actions::extract_workplan(&input, &output, sheet, &source_config, selection)?;
    println!("Extracted {} tasks into {}", table.len(), output.display());
    Ok(())
}

fn execute_migrate(store: &TrackerStore) -> Result<()> {
    let table = actions::load_tracker(store)?;
    let options = FilterOptions::from_table(&table);
    let regions: Vec<&str> = options.regions.iter().map(|region| region.label()).collect();
    println!(
        "Tracker holds {} tasks across regions: {}",
        table.len(),
        regions.join(", ")
    );
    Ok(())
}

fn execute_summary(store: &TrackerStore, filter: &TaskFilter) -> Result<()> {
    let table = actions::load_tracker(store)?;
    let selection = filter.apply(&table);
    let summary = StatusSummary::from_table(&selection);

    let rule = "=".repeat(40);
    println!("{rule}");
    println!("       WORKPLAN PROGRESS SUMMARY       ");
    println!("{rule}");
    if *filter != TaskFilter::default() {
        let overall = StatusSummary::from_table(&table);
        println!(
            "Overall: {} tasks, {} completed ({:.1}%)",
            overall.total,
            overall.completed(),
            overall.percent(Status::Completed)
        );
        println!("Current Selection:");
    }
    println!("Total Tasks: {}", summary.total);
    for status in Status::ALL {
        println!(
            "{status}: {} ({:.1}%)",
            summary.count(status),
            summary.percent(status)
        );
    }
    println!("{rule}");

    println!("\nStatus by Program Area");
    for row in status_by_program_area(&selection) {
        let counts: Vec<String> = Status::ALL
            .iter()
            .map(|status| format!("{status}: {}", row.summary.count(*status)))
            .collect();
        println!(
            "  {} (total {}): {}",
            row.program_area,
            row.summary.total,
            counts.join(", ")
        );
    }

    let financial = FinancialSummary::from_table(&selection);
    println!("\nFinancial Summary");
    println!("  Total Budget: {}", format_money(financial.total()));
    println!("  Q1 Budget:    {}", format_money(financial.total_q1));
    println!("  Q2 Budget:    {}", format_money(financial.total_q2));
    for area in &financial.by_area {
        println!(
            "  {}: Q1 {} | Q2 {} | Total {}",
            area.program_area,
            format_money(area.q1),
            format_money(area.q2),
            format_money(area.total())
        );
    }
    Ok(())
}

fn execute_list(store: &TrackerStore, filter: &TaskFilter) -> Result<()> {
    let table = actions::load_tracker(store)?;
    let tasks = filter.apply(&table);
    print_tasks(&tasks);
    Ok(())
}

fn execute_export(store: &TrackerStore, args: ExportArgs) -> Result<()> {
    let view = actions::export_view(store, &args.filters.filter(), &args.output)?;
    println!("Exported {} tasks to {}", view.len(), args.output.display());
    Ok(())
}

fn execute_update(store: &TrackerStore, args: UpdateArgs, session: &Session) -> Result<()> {
    let status_update = StatusUpdate {
        id: args.id,
        status: Status::parse_choice(&args.status)?,
        comment: args.comment,
        progress: args.progress,
    };
    let policy = if args.keep_progress {
        ProgressPolicy::Keep
    } else {
        ProgressPolicy::SyncWithStatus
    };
    let change_set = actions::update_task(store, &status_update, policy, session)?;
    report_changes(&change_set);
    Ok(())
}

fn report_changes(change_set: &ChangeSet) {
    if change_set.is_empty() {
        println!("No changes detected.");
    } else {
        println!("Saved changes to {} task(s).", change_set.len());
    }
    if !change_set.unmatched.is_empty() {
        let ids: Vec<String> = change_set.unmatched.iter().map(u32::to_string).collect();
        println!("Skipped unknown task IDs: {}", ids.join(", "));
    }
}

fn print_tasks(table: &TaskTable) {
    if table.is_empty() {
        println!("No tasks found.");
        return;
    }

    let rule = "-".repeat(100);
    println!("\nListing {} tasks:", table.len());
    println!("{rule}");
    println!(
        "{:>5}  {:<13}  {:<11}  {:>4}  {:<63}  {:>10}  {:>10}",
        "ID", "Region", "Status", "%", "Activities", "Q1", "Q2"
    );
    for task in &table.tasks {
        println!(
            "{:>5}  {:<13}  {:<11}  {:>4}  {:<63}  {:>10.2}  {:>10.2}",
            task.id,
            task.region.map(Region::label).unwrap_or(""),
            task.status.label(),
            task.progress,
            truncate(&task.activities, ACTIVITY_WIDTH),
            task.budget_q1,
            task.budget_q2
        );
    }
    println!("{rule}");
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let head: String = value.chars().take(width).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}

fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{fraction}")
}

fn parse_region(value: &str) -> std::result::Result<Region, String> {
    value.parse().map_err(|error: TrackerError| error.to_string())
}

fn parse_status(value: &str) -> std::result::Result<Status, String> {
    Status::parse_choice(value).map_err(|error| error.to_string())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Track status, progress and comments for workplan tasks."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tracker workbook path.
    #[arg(long, global = true)]
    tracker: Option<PathBuf>,

    /// Tracker sheet name.
    #[arg(long, global = true)]
    sheet: Option<String>,

    /// Directory receiving tracker backups.
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Email address recorded in the audit columns.
    #[arg(long, global = true, env = "TRACKER_USER")]
    user: Option<String>,

    /// Increase log verbosity.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Extract tasks from the workplan into a new tracker workbook.
    Extract(ExtractArgs),
    /// Load the tracker, splitting it into regions if that has not happened yet.
    Migrate,
    /// Show status counts and the budget summary, optionally for a selection.
    Summary(FilterArgs),
    /// List tasks, optionally filtered.
    List(FilterArgs),
    /// Write the filtered tasks as an editable JSON view.
    Export(ExportArgs),
    /// Apply an edited JSON view to the tracker.
    Apply(ApplyArgs),
    /// Change the status of a single task.
    Update(UpdateArgs),
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Workplan workbook; defaults to `source.file` from the configuration.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Workplan sheet name.
    #[arg(long)]
    source_sheet: Option<String>,

    /// Output tracker path; defaults to the configured tracker file, or
    /// `SI_Manager_Tracker.xlsx` with `--si`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep only strategic-information tasks, assigned to the SI manager.
    #[arg(long)]
    si: bool,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Only tasks in this region.
    #[arg(long, value_parser = parse_region)]
    region: Option<Region>,

    /// Only tasks with this status (name or 1-4).
    #[arg(long, value_parser = parse_status)]
    status: Option<Status>,

    /// Only tasks in this program area.
    #[arg(long)]
    program_area: Option<String>,

    /// Case-insensitive search over activities and sub-activities.
    #[arg(long)]
    search: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> TaskFilter {
        TaskFilter {
            region: self.region,
            status: self.status,
            program_area: self.program_area.clone(),
            search: self.search.clone(),
        }
    }
}

#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    filters: FilterArgs,

    /// JSON file receiving the editable view.
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct ApplyArgs {
    /// Edited JSON view produced by `export`.
    #[arg(long)]
    edits: PathBuf,
}

#[derive(clap::Args)]
struct UpdateArgs {
    /// Task ID.
    #[arg(long)]
    id: u32,

    /// New status: 1 Pending, 2 In Progress, 3 Completed, 4 Delayed, or the name.
    #[arg(long)]
    status: String,

    /// Comment appended to the existing comments.
    #[arg(long)]
    comment: Option<String>,

    /// Explicit progress percentage.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    progress: Option<u8>,

    /// Do not pin progress to 0/100 for Pending/Completed.
    #[arg(long)]
    keep_progress: bool,
}
