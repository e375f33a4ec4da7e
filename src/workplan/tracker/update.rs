use chrono::NaiveDateTime;

use crate::workplan::tracker::error::{Result, TrackerError};
use crate::workplan::tracker::model::{Status, TaskId, TaskTable};
use crate::workplan::tracker::reconcile::{self, ChangeSet, TaskEdit};
use crate::workplan::tracker::session::Session;
use crate::workplan::tracker::store::TrackerStore;

/// Separator placed between an existing comment and an appended one.
pub const COMMENT_SEPARATOR: &str = " | ";

/// How progress reacts to a status change made through [`update_task`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressPolicy {
    /// Completed sets 100, Pending sets 0, other statuses leave progress alone.
    #[default]
    SyncWithStatus,
    /// Progress only changes when given explicitly.
    Keep,
}

/// A status change for one task, optionally with a comment to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: TaskId,
    pub status: Status,
    pub comment: Option<String>,
    /// Explicit progress; takes precedence over the policy.
    pub progress: Option<u8>,
}

/// Appends `addition` to `current`, or returns it alone when `current` is blank.
pub fn append_comment(current: &str, addition: &str) -> String {
    let current = current.trim();
    if current.is_empty() {
        addition.to_string()
    } else {
        format!("{current}{COMMENT_SEPARATOR}{addition}")
    }
}

/// Resolves `update` against the current task into a full edit.
pub fn build_edit(
    table: &TaskTable,
    update: &StatusUpdate,
    policy: ProgressPolicy,
) -> Result<TaskEdit> {
    let task = table
        .get(update.id)
        .ok_or(TrackerError::TaskNotFound(update.id))?;

    let mut edit = TaskEdit::from_task(task);
    edit.status = update.status;
    edit.progress = match (update.progress, policy) {
        (Some(progress), _) => progress.min(100),
        (None, ProgressPolicy::SyncWithStatus) => match update.status {
            Status::Completed => 100,
            Status::Pending => 0,
            Status::InProgress | Status::Delayed => task.progress,
        },
        (None, ProgressPolicy::Keep) => task.progress,
    };

    if let Some(comment) = update.comment.as_deref().map(str::trim) {
        if !comment.is_empty() {
            edit.comments = append_comment(&task.comments, comment);
        }
    }

    Ok(edit)
}

/// Applies a single-task update through the reconciler, so audit fields and
/// saving behave exactly as for bulk edits. Unknown IDs are an error here.
pub fn update_task(
    store: &TrackerStore,
    table: &mut TaskTable,
    update: &StatusUpdate,
    policy: ProgressPolicy,
    session: &Session,
    at: NaiveDateTime,
) -> Result<ChangeSet> {
    let edit = build_edit(table, update, policy)?;
    reconcile::reconcile(store, table, &[edit], session, at)
}
