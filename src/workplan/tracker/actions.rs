use std::path::Path;

use chrono::Local;
use tracing::{info, instrument};

use crate::workplan::tracker::config::SourceConfig;
use crate::workplan::tracker::error::{Result, TrackerError};
use crate::workplan::tracker::extract::{self, TaskSelection};
use crate::workplan::tracker::filter::TaskFilter;
use crate::workplan::tracker::io::edits;
use crate::workplan::tracker::io::excel_read;
use crate::workplan::tracker::io::excel_write::{self, SheetStyle};
use crate::workplan::tracker::model::TaskTable;
use crate::workplan::tracker::reconcile::{self, ChangeSet};
use crate::workplan::tracker::session::Session;
use crate::workplan::tracker::store::TrackerStore;
use crate::workplan::tracker::update::{self, ProgressPolicy, StatusUpdate};

/// Extracts the workplan sheet into a freshly styled tracker workbook.
/// Nothing is written when the source file or sheet is missing.
#[instrument(
    level = "info",
    skip_all,
    fields(source = %source.display(), output = %output.display(), selection = ?selection)
)]
pub fn extract_workplan(
    source: &Path,
    output: &Path,
    tracker_sheet: &str,
    config: &SourceConfig,
    selection: TaskSelection,
) -> Result<TaskTable> {
    if !source.exists() {
        return Err(TrackerError::MissingInput(source.to_path_buf()));
    }

    let sheet = excel_read::read_sheet(source, &config.sheet, config.header_row)?;
    info!(row_count = sheet.rows.len(), "read workplan sheet");
    let table = extract::build_tracker(&sheet, selection)?;
    info!(task_count = table.len(), "extracted tasks");

    excel_write::write_sheet(
        output,
        &table.to_sheet(tracker_sheet),
        SheetStyle::Styled {
            header_fill: config.header_fill,
            max_column_width: config.max_column_width,
        },
    )?;
    Ok(table)
}

/// Loads the tracker, treating an absent file as an error.
pub fn load_tracker(store: &TrackerStore) -> Result<TaskTable> {
    store
        .load()?
        .ok_or_else(|| TrackerError::MissingInput(store.tracker_file().to_path_buf()))
}

/// Writes the filtered, editable view of the tracker to a JSON file.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn export_view(store: &TrackerStore, filter: &TaskFilter, output: &Path) -> Result<TaskTable> {
    let table = load_tracker(store)?;
    let view = filter.apply(&table);
    edits::write_view(output, &view)?;
    info!(task_count = view.len(), "exported editable view");
    Ok(view)
}

/// Reconciles an edited JSON view with the tracker and saves on change.
#[instrument(level = "info", skip_all, fields(edits = %edits_path.display()))]
pub fn apply_edit_file(
    store: &TrackerStore,
    edits_path: &Path,
    session: &Session,
) -> Result<ChangeSet> {
    if !edits_path.exists() {
        return Err(TrackerError::MissingInput(edits_path.to_path_buf()));
    }
    let task_edits = edits::read_edits(edits_path)?;
    let mut table = load_tracker(store)?;
    reconcile::reconcile(
        store,
        &mut table,
        &task_edits,
        session,
        Local::now().naive_local(),
    )
}

/// Applies one status update and saves on change.
#[instrument(level = "info", skip_all, fields(id = status_update.id, status = %status_update.status))]
pub fn update_task(
    store: &TrackerStore,
    status_update: &StatusUpdate,
    policy: ProgressPolicy,
    session: &Session,
) -> Result<ChangeSet> {
    let mut table = load_tracker(store)?;
    update::update_task(
        store,
        &mut table,
        status_update,
        policy,
        session,
        Local::now().naive_local(),
    )
}
