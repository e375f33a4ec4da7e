#![allow(dead_code)]

use std::path::Path;

use workplan_tracker::io::excel_write::{self, SheetStyle};
use workplan_tracker::model::{Cell, Column, Region, SheetTable, Status, Task, TaskTable};
use workplan_tracker::session::Session;
use workplan_tracker::store::TrackerStore;

pub const TRACKER_SHEET: &str = "All_Tasks";

pub fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

pub fn write_plain_sheet(path: &Path, sheet: &str, columns: &[&str], rows: Vec<Vec<Cell>>) {
    let table = SheetTable {
        sheet_name: sheet.to_string(),
        columns: columns.iter().map(|column| column.to_string()).collect(),
        rows,
    };
    excel_write::write_sheet(path, &table, SheetStyle::Plain).expect("fixture workbook written");
}

pub fn store_in(dir: &Path) -> TrackerStore {
    TrackerStore::new(
        dir.join("tracker.xlsx"),
        TRACKER_SHEET,
        dir.join("backups"),
        10,
    )
}

pub fn session() -> Session {
    Session::new("si.manager@example.org").expect("valid session")
}

/// A post-migration tracker with one task per region.
pub fn regional_table() -> TaskTable {
    let tasks = Region::ALL
        .into_iter()
        .enumerate()
        .map(|(idx, region)| {
            let mut task = Task::new((idx + 1) as u32);
            task.region = Some(region);
            task.activities = "Community testing".into();
            task.sub_activities = format!("Train testers in {region}");
            task.program_area = "HTS".into();
            task.budget_q1 = 100.0;
            task.budget_q2 = 30.0;
            task.status = if idx == 1 {
                Status::Completed
            } else {
                Status::Pending
            };
            task.progress = if idx == 1 { 100 } else { 0 };
            task
        })
        .collect();

    TaskTable::new(
        vec![
            Column::Id,
            Column::Region,
            Column::Activities,
            Column::SubActivities,
            Column::ProgramArea,
            Column::BudgetQ1,
            Column::BudgetQ2,
            Column::Status,
            Column::Progress,
            Column::Comments,
        ],
        tasks,
    )
}
