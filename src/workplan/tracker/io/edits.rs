use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::workplan::tracker::error::Result;
use crate::workplan::tracker::model::{Region, Status, Task, TaskId, TaskTable};
use crate::workplan::tracker::reconcile::TaskEdit;

/// Editable projection of a task: the three user-editable fields plus enough
/// context to recognise the row.
#[derive(Debug, Serialize)]
struct TaskView<'a> {
    #[serde(rename = "ID")]
    id: TaskId,
    #[serde(rename = "Region", skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
    #[serde(rename = "Status")]
    status: Status,
    #[serde(rename = "Progress (%)")]
    progress: u8,
    #[serde(rename = "Comments")]
    comments: &'a str,
    #[serde(rename = "Program Area")]
    program_area: &'a str,
    #[serde(rename = "Activities")]
    activities: &'a str,
    #[serde(rename = "ACMS Sub-Activities")]
    sub_activities: &'a str,
    #[serde(rename = "Oct -Dec 2025")]
    budget_q1: f64,
    #[serde(rename = "Jan - Mar 2026")]
    budget_q2: f64,
}

impl<'a> From<&'a Task> for TaskView<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: task.id,
            region: task.region,
            status: task.status,
            progress: task.progress,
            comments: &task.comments,
            program_area: &task.program_area,
            activities: &task.activities,
            sub_activities: &task.sub_activities,
            budget_q1: task.budget_q1,
            budget_q2: task.budget_q2,
        }
    }
}

/// Writes the editable view of `table` as a pretty-printed JSON array.
pub fn write_view(path: &Path, table: &TaskTable) -> Result<()> {
    let views: Vec<TaskView<'_>> = table.tasks.iter().map(TaskView::from).collect();
    let json_string = serde_json::to_string_pretty(&views)?;
    fs::write(path, json_string)?;
    Ok(())
}

/// Reads an edited view back. Fields other than ID, Status, Progress (%) and
/// Comments are ignored; progress is clamped to 100.
pub fn read_edits(path: &Path) -> Result<Vec<TaskEdit>> {
    let source = fs::read_to_string(path)?;
    parse_edits(&source)
}

pub fn parse_edits(source: &str) -> Result<Vec<TaskEdit>> {
    let mut edits: Vec<TaskEdit> = serde_json::from_str(source)?;
    for edit in &mut edits {
        edit.progress = edit.progress.min(100);
    }
    Ok(edits)
}
