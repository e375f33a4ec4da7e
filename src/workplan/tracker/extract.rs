//! Flattening of the hierarchical workplan sheet into tracker rows.
//!
//! The workplan records an activity, its code, program area and category once
//! per group; the rows beneath inherit them implicitly. Extraction makes that
//! inheritance explicit, keeps the columns the tracker cares about and adds
//! the tracking columns every task starts with.

use std::collections::HashMap;

use crate::workplan::tracker::error::Result;
use crate::workplan::tracker::model::{Cell, Column, SheetTable, Task, TaskId, TaskTable};

/// Group-level columns whose blanks inherit the value above them.
pub const FORWARD_FILL_COLUMNS: [Column; 4] = [
    Column::Activities,
    Column::CodeSubActivities,
    Column::ProgramArea,
    Column::SubActivityCategory,
];

/// Workplan columns copied into the tracker, in tracker order.
pub const EXTRACTED_COLUMNS: [Column; 10] = [
    Column::Activities,
    Column::CodeSubActivities,
    Column::SubActivities,
    Column::ProgramArea,
    Column::ImplementationLevel,
    Column::SubActivityCategory,
    Column::BudgetQ1,
    Column::BudgetQ2,
    Column::Outputs,
    Column::OutputIndicators,
];

/// Columns appended after the extracted ones.
pub const TRACKING_COLUMNS: [Column; 4] = [
    Column::Status,
    Column::Progress,
    Column::Comments,
    Column::AssignedTo,
];

/// Which workplan rows become tracker tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSelection {
    /// Every non-empty row.
    #[default]
    All,
    /// Strategic-information rows only, assigned to the SI manager.
    StrategicInformation,
}

/// Case-insensitive keyword lists for [`TaskSelection::StrategicInformation`].
/// A row is selected when any of the three columns contains one of its keywords.
const SI_PROGRAM_AREA_KEYWORDS: [&str; 5] = [
    "si",
    "strategic information",
    "m&e",
    "data",
    "cross-cutting(si/h)",
];
const SI_ACTIVITY_KEYWORDS: [&str; 1] = ["objective 7"];
const SI_SUB_ACTIVITY_KEYWORDS: [&str; 5] = ["data", "si ", "strategic information", "m&e", "dqa"];

/// Default output workbook for a strategic-information extraction.
pub const SI_TRACKER_FILE: &str = "SI_Manager_Tracker.xlsx";
/// Sheet name used by that workbook.
pub const SI_TRACKER_SHEET: &str = "SI_Tasks";

/// Assignee written on every task picked by [`TaskSelection::StrategicInformation`].
pub const SI_ASSIGNEE: &str = "SI Manager";

impl TaskSelection {
    /// Whether `task`, populated from the extracted columns, is kept.
    pub fn selects(&self, task: &Task) -> bool {
        match self {
            TaskSelection::All => true,
            TaskSelection::StrategicInformation => {
                contains_any(&task.program_area, &SI_PROGRAM_AREA_KEYWORDS)
                    || contains_any(&task.activities, &SI_ACTIVITY_KEYWORDS)
                    || contains_any(&task.sub_activities, &SI_SUB_ACTIVITY_KEYWORDS)
            }
        }
    }

    fn assignee(&self) -> Option<&'static str> {
        match self {
            TaskSelection::All => None,
            TaskSelection::StrategicInformation => Some(SI_ASSIGNEE),
        }
    }
}

fn contains_any(value: &str, keywords: &[&str]) -> bool {
    let value = value.to_lowercase();
    keywords.iter().any(|keyword| value.contains(keyword))
}

/// Replaces every empty cell with the nearest non-empty cell above it.
/// Leading empties have nothing to inherit and stay empty.
pub fn forward_fill(cells: &mut [Cell]) {
    let mut last: Option<Cell> = None;
    for cell in cells.iter_mut() {
        if matches!(cell, Cell::Empty) {
            if let Some(value) = &last {
                *cell = value.clone();
            }
        } else {
            last = Some(cell.clone());
        }
    }
}

/// Builds the initial tracker table from the raw workplan sheet. Rows are
/// selected after forward-filling, so child rows match on inherited values.
pub fn build_tracker(sheet: &SheetTable, selection: TaskSelection) -> Result<TaskTable> {
    let mut positions: HashMap<Column, usize> = HashMap::new();
    for (col_idx, header) in sheet.columns.iter().enumerate() {
        positions.entry(Column::from_header(header)).or_insert(col_idx);
    }

    let width = sheet.columns.len();
    let mut rows: Vec<Vec<Cell>> = sheet
        .rows
        .iter()
        .map(|row| {
            let mut padded = row.clone();
            padded.resize(width.max(row.len()), Cell::Empty);
            padded
        })
        .collect();

    for column in &FORWARD_FILL_COLUMNS {
        if let Some(&col_idx) = positions.get(column) {
            let mut cells: Vec<Cell> = rows.iter().map(|row| row[col_idx].clone()).collect();
            forward_fill(&mut cells);
            for (row, cell) in rows.iter_mut().zip(cells) {
                row[col_idx] = cell;
            }
        }
    }

    rows.retain(|row| !row.iter().all(Cell::is_empty));

    let selected: Vec<(Column, usize)> = EXTRACTED_COLUMNS
        .iter()
        .filter_map(|column| positions.get(column).map(|&idx| (column.clone(), idx)))
        .collect();

    let mut tasks = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut task = Task::new((tasks.len() + 1) as TaskId);
        for (column, col_idx) in &selected {
            task.set_cell(column, &row[*col_idx])?;
        }
        if !selection.selects(&task) {
            continue;
        }
        if let Some(assignee) = selection.assignee() {
            task.assigned_to = assignee.to_string();
        }
        tasks.push(task);
    }

    let mut columns = Vec::with_capacity(selected.len() + 1 + TRACKING_COLUMNS.len());
    columns.push(Column::Id);
    columns.extend(selected.into_iter().map(|(column, _)| column));
    columns.extend(TRACKING_COLUMNS);

    Ok(TaskTable::new(columns, tasks))
}
