//! Merging of an edited subset of tasks back into the full tracker.
//!
//! Reconciliation is split into a pure [`diff`] that yields a [`ChangeSet`]
//! and an [`apply`] that patches the table, so the merge can be exercised
//! without touching the file system. [`reconcile`] combines both with a save.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::workplan::tracker::error::Result;
use crate::workplan::tracker::model::{Column, Status, Task, TaskId, TaskTable};
use crate::workplan::tracker::session::Session;
use crate::workplan::tracker::store::TrackerStore;

/// The user-editable fields of one task, addressed by ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEdit {
    #[serde(rename = "ID")]
    pub id: TaskId,
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "Progress (%)", default)]
    pub progress: u8,
    #[serde(rename = "Comments", default)]
    pub comments: String,
}

impl TaskEdit {
    /// Current editable values of `task`.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            status: task.status,
            progress: task.progress,
            comments: task.comments.clone(),
        }
    }
}

/// A detected difference between the tracker and an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChange {
    pub id: TaskId,
    pub before: TaskEdit,
    pub after: TaskEdit,
}

impl TaskChange {
    pub fn changed_fields(&self) -> Vec<Column> {
        let mut fields = Vec::new();
        if self.before.status != self.after.status {
            fields.push(Column::Status);
        }
        if self.before.progress != self.after.progress {
            fields.push(Column::Progress);
        }
        if self.before.comments != self.after.comments {
            fields.push(Column::Comments);
        }
        fields
    }
}

/// Outcome of comparing edits against the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changes: Vec<TaskChange>,
    /// Edited IDs that no tracker row carries. They are reported, never applied.
    pub unmatched: Vec<TaskId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Compares each edit with the tracker rows sharing its ID. An edit becomes a
/// change when Status, Progress or Comments differ on any matching row.
pub fn diff(table: &TaskTable, edits: &[TaskEdit]) -> ChangeSet {
    let mut change_set = ChangeSet::default();

    for edit in edits {
        let mut matched = false;
        let mut before = None;
        for task in table.tasks.iter().filter(|task| task.id == edit.id) {
            matched = true;
            let current = TaskEdit::from_task(task);
            if current != *edit {
                before = Some(current);
                break;
            }
        }

        if !matched {
            change_set.unmatched.push(edit.id);
        } else if let Some(before) = before {
            change_set.changes.push(TaskChange {
                id: edit.id,
                before,
                after: edit.clone(),
            });
        }
    }

    change_set
}

/// Writes every change into `table` together with the audit fields. The
/// modification time is truncated to whole seconds.
pub fn apply(table: &mut TaskTable, change_set: &ChangeSet, session: &Session, at: NaiveDateTime) {
    if change_set.is_empty() {
        return;
    }

    for column in [
        Column::Status,
        Column::Progress,
        Column::Comments,
        Column::LastModifiedBy,
        Column::LastModifiedDate,
    ] {
        table.ensure_column(column);
    }

    let at = at.with_nanosecond(0).unwrap_or(at);
    for change in &change_set.changes {
        for task in table.matching_mut(change.id) {
            task.status = change.after.status;
            task.progress = change.after.progress;
            task.comments = change.after.comments.clone();
            task.last_modified_by = session.user().to_string();
            task.last_modified_date = Some(at);
        }
    }
}

/// Diffs `edits` against `table`, applies the changes and saves through
/// `store` when at least one row changed. Nothing is written otherwise.
///
/// If the save fails the in-memory table keeps the applied changes, so the
/// caller can retry the save.
#[instrument(level = "info", skip_all, fields(edit_count = edits.len(), user = session.user()))]
pub fn reconcile(
    store: &TrackerStore,
    table: &mut TaskTable,
    edits: &[TaskEdit],
    session: &Session,
    at: NaiveDateTime,
) -> Result<ChangeSet> {
    let change_set = diff(table, edits);

    if !change_set.unmatched.is_empty() {
        warn!(unmatched = ?change_set.unmatched, "edited IDs not found in tracker; skipped");
    }

    if change_set.is_empty() {
        debug!("no changes detected");
        return Ok(change_set);
    }

    apply(table, &change_set, session, at);
    info!(changed = change_set.len(), "applying task changes");
    store.save(table)?;
    Ok(change_set)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn table() -> TaskTable {
        let tasks = (1..=3)
            .map(|id| {
                let mut task = Task::new(id);
                task.program_area = "HTS".into();
                task
            })
            .collect();
        TaskTable::new(
            vec![
                Column::Id,
                Column::ProgramArea,
                Column::Status,
                Column::Progress,
                Column::Comments,
            ],
            tasks,
        )
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_nano_opt(9, 30, 15, 123_000_000)
            .unwrap()
    }

    #[test]
    fn identical_edits_produce_no_changes() {
        let table = table();
        let edits: Vec<TaskEdit> = table.tasks.iter().map(TaskEdit::from_task).collect();

        let change_set = diff(&table, &edits);

        assert!(change_set.is_empty());
        assert!(change_set.unmatched.is_empty());
    }

    #[test]
    fn comment_change_updates_only_that_row() {
        let mut table = table();
        let original = table.clone();
        let mut edit = TaskEdit::from_task(&table.tasks[1]);
        edit.comments = "kits delivered".into();

        let change_set = diff(&table, &[edit]);
        assert_eq!(change_set.len(), 1);
        assert_eq!(change_set.changes[0].changed_fields(), vec![Column::Comments]);

        let session = Session::new("si.manager@example.org").unwrap();
        apply(&mut table, &change_set, &session, timestamp());

        let changed = &table.tasks[1];
        assert_eq!(changed.comments, "kits delivered");
        assert_eq!(changed.last_modified_by, "si.manager@example.org");
        assert_eq!(
            changed.last_modified_date,
            Some(
                NaiveDate::from_ymd_opt(2025, 11, 20)
                    .unwrap()
                    .and_hms_opt(9, 30, 15)
                    .unwrap()
            )
        );
        assert_eq!(table.tasks[0], original.tasks[0]);
        assert_eq!(table.tasks[2], original.tasks[2]);
        assert!(table.has_column(&Column::LastModifiedBy));
        assert!(table.has_column(&Column::LastModifiedDate));
    }

    #[test]
    fn unknown_ids_are_reported_not_applied() {
        let mut table = table();
        let original = table.clone();
        let edit = TaskEdit {
            id: 42,
            status: Status::Completed,
            progress: 100,
            comments: String::new(),
        };

        let change_set = diff(&table, &[edit]);
        assert!(change_set.is_empty());
        assert_eq!(change_set.unmatched, vec![42]);

        let session = Session::new("si.manager@example.org").unwrap();
        apply(&mut table, &change_set, &session, timestamp());
        assert_eq!(table, original);
    }
}
