use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::workplan::tracker::config::TrackerConfig;
use crate::workplan::tracker::error::Result;
use crate::workplan::tracker::io::excel_read;
use crate::workplan::tracker::io::excel_write::{self, SheetStyle};
use crate::workplan::tracker::migrate;
use crate::workplan::tracker::model::{Cell, Column, SheetTable, TaskTable};

pub const BACKUP_PREFIX: &str = "tracker_backup_";
pub const BACKUP_EXTENSION: &str = "xlsx";
const BACKUP_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Loads and saves the tracker workbook, backing up the previous file before
/// every overwrite.
///
/// There is no locking: two writers racing on the same file end with the last
/// write winning.
#[derive(Debug, Clone)]
pub struct TrackerStore {
    tracker_file: PathBuf,
    sheet: String,
    backup_dir: PathBuf,
    keep: usize,
}

impl TrackerStore {
    pub fn new(
        tracker_file: impl Into<PathBuf>,
        sheet: impl Into<String>,
        backup_dir: impl Into<PathBuf>,
        keep: usize,
    ) -> Self {
        Self {
            tracker_file: tracker_file.into(),
            sheet: sheet.into(),
            backup_dir: backup_dir.into(),
            keep,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(
            config.tracker_file.clone(),
            config.tracker_sheet.clone(),
            config.backup_dir.clone(),
            config.backup_keep,
        )
    }

    pub fn tracker_file(&self) -> &Path {
        &self.tracker_file
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Reads the tracker. Returns `Ok(None)` when the tracker file does not
    /// exist. A tracker without a `Region` column is split into regions and
    /// saved straight away, so the split happens once per tracker file.
    #[instrument(level = "info", skip_all, fields(tracker = %self.tracker_file.display()))]
    pub fn load(&self) -> Result<Option<TaskTable>> {
        if !self.tracker_file.exists() {
            debug!("tracker file absent");
            return Ok(None);
        }

        let sheet = excel_read::read_sheet(&self.tracker_file, &self.sheet, 0)?;
        let table = clean_loaded(sheet)?;
        info!(task_count = table.len(), "loaded tracker");

        if migrate::needs_region_split(&table) {
            let migrated = migrate::split_regions(&table);
            info!(
                task_count = migrated.len(),
                "split tasks into regions; persisting migration"
            );
            self.save(&migrated)?;
            return Ok(Some(migrated));
        }

        Ok(Some(table))
    }

    /// Backs up the current file, rotates old backups and rewrites the whole
    /// tracker. A failed backup is logged and does not prevent the save.
    #[instrument(
        level = "info",
        skip_all,
        fields(tracker = %self.tracker_file.display(), task_count = table.len())
    )]
    pub fn save(&self, table: &TaskTable) -> Result<()> {
        match self.create_backup(Local::now().naive_local()) {
            Ok(Some(path)) => debug!(backup = %path.display(), "backup created"),
            Ok(None) => debug!("no existing tracker to back up"),
            Err(error) => warn!(%error, "failed to create backup; saving anyway"),
        }

        if let Err(error) = self.cleanup_old_backups() {
            debug!(%error, "backup cleanup skipped");
        }

        excel_write::write_sheet(
            &self.tracker_file,
            &table.to_sheet(&self.sheet),
            SheetStyle::Plain,
        )?;
        info!("tracker saved");
        Ok(())
    }

    /// Copies the current tracker to `tracker_backup_<YYYYMMDD_HHMMSS>.xlsx`.
    /// Names already taken within the same second get a `_NNN` suffix.
    pub fn create_backup(&self, now: NaiveDateTime) -> Result<Option<PathBuf>> {
        if !self.tracker_file.exists() {
            return Ok(None);
        }

        fs::create_dir_all(&self.backup_dir)?;
        let stamp = now.format(BACKUP_TIMESTAMP).to_string();
        let mut candidate = self
            .backup_dir
            .join(format!("{BACKUP_PREFIX}{stamp}.{BACKUP_EXTENSION}"));
        let mut counter = 1;
        while candidate.exists() {
            candidate = self
                .backup_dir
                .join(format!("{BACKUP_PREFIX}{stamp}_{counter:03}.{BACKUP_EXTENSION}"));
            counter += 1;
        }

        fs::copy(&self.tracker_file, &candidate)?;
        Ok(Some(candidate))
    }

    /// Backup files, newest first. Ties in modification time break on name.
    pub fn list_backups(&self) -> io::Result<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_backup_file(&path) {
                continue;
            }
            backups.push((entry.metadata()?.modified()?, path));
        }

        backups.sort_by(|lhs, rhs| rhs.cmp(lhs));
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Deletes all but the `keep` most recent backups.
    fn cleanup_old_backups(&self) -> io::Result<usize> {
        let backups = self.list_backups()?;
        let mut removed = 0;
        for path in backups.iter().skip(self.keep) {
            fs::remove_file(path)?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn is_backup_file(path: &Path) -> bool {
    let is_xlsx = path
        .extension()
        .is_some_and(|extension| extension == BACKUP_EXTENSION);
    let has_prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(BACKUP_PREFIX));
    is_xlsx && has_prefix
}

/// Normalises a freshly read tracker sheet: drops empty rows and empty
/// columns (except `Comments`), trims program areas and drops tasks without
/// one.
pub fn clean_loaded(mut sheet: SheetTable) -> Result<TaskTable> {
    sheet.rows.retain(|row| !row.iter().all(Cell::is_empty));

    if !sheet.rows.is_empty() {
        let keep: Vec<bool> = sheet
            .columns
            .iter()
            .enumerate()
            .map(|(col_idx, header)| {
                Column::from_header(header) == Column::Comments
                    || sheet
                        .rows
                        .iter()
                        .any(|row| !SheetTable::cell(row, col_idx).is_empty())
            })
            .collect();

        sheet.columns = retain_indices(std::mem::take(&mut sheet.columns), &keep);
        sheet.rows = std::mem::take(&mut sheet.rows)
            .into_iter()
            .map(|row| retain_indices(row, &keep))
            .collect();
    }

    // Rows without a program area are notes or totals; they are dropped
    // before typed parsing so their other cells are never interpreted.
    if let Some(area_idx) = sheet
        .columns
        .iter()
        .position(|header| Column::from_header(header) == Column::ProgramArea)
    {
        sheet
            .rows
            .retain(|row| !SheetTable::cell(row, area_idx).as_text().trim().is_empty());
    }

    let mut table = TaskTable::from_sheet(&sheet)?;
    for task in &mut table.tasks {
        let trimmed = task.program_area.trim();
        if trimmed.len() != task.program_area.len() {
            task.program_area = trimmed.to_string();
        }
    }

    Ok(table)
}

fn retain_indices<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| keep.get(*idx).copied().unwrap_or(false))
        .map(|(_, item)| item)
        .collect()
}
