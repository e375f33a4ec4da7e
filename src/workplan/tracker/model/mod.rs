use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::workplan::tracker::error::{Result, TrackerError};

/// Identifier assigned to a task row. IDs are sequential, start at 1 and are
/// the only key used to match edits back onto the tracker.
pub type TaskId = u32;

/// Rendering used for the `Last Modified Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Geographic partition every workplan task is delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    Adamawa,
    #[serde(rename = "Extreme North")]
    ExtremeNorth,
}

impl Region {
    /// Regions in the order rows are expanded by the migration.
    pub const ALL: [Region; 3] = [Region::North, Region::Adamawa, Region::ExtremeNorth];

    pub fn label(self) -> &'static str {
        match self {
            Region::North => "North",
            Region::Adamawa => "Adamawa",
            Region::ExtremeNorth => "Extreme North",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Region {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Region::ALL
            .into_iter()
            .find(|region| region.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TrackerError::InvalidLiteral {
                column: Column::Region.header().to_string(),
                value: value.to_string(),
            })
    }
}

/// Implementation status of a task.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Status {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Delayed,
}

impl Status {
    /// Statuses in menu order (1-4).
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Completed,
        Status::Delayed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
            Status::Delayed => "Delayed",
        }
    }

    /// Resolves a status from its 1-based menu number.
    pub fn from_menu_choice(choice: u8) -> Option<Status> {
        match choice {
            1..=4 => Some(Status::ALL[usize::from(choice - 1)]),
            _ => None,
        }
    }

    /// Accepts either a menu number (`"3"`) or a status name (`"completed"`).
    pub fn parse_choice(input: &str) -> Result<Status> {
        match input.trim().parse::<u8>() {
            Ok(choice) => Status::from_menu_choice(choice).ok_or_else(|| {
                TrackerError::InvalidLiteral {
                    column: Column::Status.header().to_string(),
                    value: input.to_string(),
                }
            }),
            Err(_) => input.parse(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TrackerError::InvalidLiteral {
                column: Column::Status.header().to_string(),
                value: value.to_string(),
            })
    }
}

/// Columns of the tracker sheet, addressed by their exact header text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Region,
    Activities,
    CodeSubActivities,
    SubActivities,
    ProgramArea,
    ImplementationLevel,
    SubActivityCategory,
    BudgetQ1,
    BudgetQ2,
    Outputs,
    OutputIndicators,
    Status,
    Progress,
    Comments,
    AssignedTo,
    LastModifiedBy,
    LastModifiedDate,
    /// Any column the tracker does not interpret; carried through unchanged.
    Other(String),
}

impl Column {
    const KNOWN: [Column; 18] = [
        Column::Id,
        Column::Region,
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
        Column::Status,
        Column::Progress,
        Column::Comments,
        Column::AssignedTo,
        Column::LastModifiedBy,
        Column::LastModifiedDate,
    ];

    pub fn header(&self) -> &str {
        match self {
            Column::Id => "ID",
            Column::Region => "Region",
            Column::Activities => "Activities",
            Column::CodeSubActivities => "Code Sub -activities",
            Column::SubActivities => "ACMS Sub-Activities",
            Column::ProgramArea => "Program Area",
            Column::ImplementationLevel => {
                "Level of Activity Implementation (Above-Site, Site-Level)"
            }
            Column::SubActivityCategory => "Sub-Activity Category",
            Column::BudgetQ1 => "Oct -Dec 2025",
            Column::BudgetQ2 => "Jan - Mar 2026",
            Column::Outputs => "Outputs",
            Column::OutputIndicators => "Output Indicators",
            Column::Status => "Status",
            Column::Progress => "Progress (%)",
            Column::Comments => "Comments",
            Column::AssignedTo => "Assigned To",
            Column::LastModifiedBy => "Last Modified By",
            Column::LastModifiedDate => "Last Modified Date",
            Column::Other(name) => name.as_str(),
        }
    }

    /// Maps a header cell onto a column. Unknown headers become [`Column::Other`].
    pub fn from_header(header: &str) -> Column {
        let trimmed = header.trim();
        Column::KNOWN
            .into_iter()
            .find(|column| column.header() == trimmed)
            .unwrap_or_else(|| Column::Other(trimmed.to_string()))
    }
}

/// A single spreadsheet cell value as seen by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Text cell, collapsing the empty string into [`Cell::Empty`].
    pub fn text(value: impl Into<String>) -> Cell {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    /// Whitespace-only text counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Rendered form of the cell; empty cells render as `""`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.clone(),
            Cell::Number(value) => value.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Text(value) => value.trim().parse::<f64>().ok(),
            Cell::Number(value) => Some(*value),
        }
    }
}

/// Coerces a budget cell: text, empty, non-finite or negative values become 0.
pub fn coerce_budget(cell: &Cell) -> f64 {
    cell.as_number()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(0.0)
}

/// A table that is materialised as (or was read from) an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    /// Returns the cell at `col_idx`, treating short rows as empty.
    pub fn cell(row: &[Cell], col_idx: usize) -> &Cell {
        row.get(col_idx).unwrap_or(&Cell::Empty)
    }
}

/// One workplan task row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub region: Option<Region>,
    pub activities: String,
    pub code_sub_activities: String,
    pub sub_activities: String,
    pub program_area: String,
    pub implementation_level: String,
    pub sub_activity_category: String,
    pub budget_q1: f64,
    pub budget_q2: f64,
    pub outputs: String,
    pub output_indicators: String,
    pub status: Status,
    pub progress: u8,
    pub comments: String,
    pub assigned_to: String,
    pub last_modified_by: String,
    pub last_modified_date: Option<NaiveDateTime>,
    pub extra: BTreeMap<String, Cell>,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn total_budget(&self) -> f64 {
        self.budget_q1 + self.budget_q2
    }

    /// Renders the value stored for `column` as a sheet cell.
    pub fn cell(&self, column: &Column) -> Cell {
        match column {
            Column::Id => Cell::Number(f64::from(self.id)),
            Column::Region => self
                .region
                .map(|region| Cell::Text(region.label().to_string()))
                .unwrap_or(Cell::Empty),
            Column::Activities => Cell::text(self.activities.as_str()),
            Column::CodeSubActivities => Cell::text(self.code_sub_activities.as_str()),
            Column::SubActivities => Cell::text(self.sub_activities.as_str()),
            Column::ProgramArea => Cell::text(self.program_area.as_str()),
            Column::ImplementationLevel => Cell::text(self.implementation_level.as_str()),
            Column::SubActivityCategory => Cell::text(self.sub_activity_category.as_str()),
            Column::BudgetQ1 => Cell::Number(self.budget_q1),
            Column::BudgetQ2 => Cell::Number(self.budget_q2),
            Column::Outputs => Cell::text(self.outputs.as_str()),
            Column::OutputIndicators => Cell::text(self.output_indicators.as_str()),
            Column::Status => Cell::Text(self.status.label().to_string()),
            Column::Progress => Cell::Number(f64::from(self.progress)),
            Column::Comments => Cell::text(self.comments.as_str()),
            Column::AssignedTo => Cell::text(self.assigned_to.as_str()),
            Column::LastModifiedBy => Cell::text(self.last_modified_by.as_str()),
            Column::LastModifiedDate => self
                .last_modified_date
                .map(|date| Cell::Text(date.format(DATE_FORMAT).to_string()))
                .unwrap_or(Cell::Empty),
            Column::Other(name) => self.extra.get(name).cloned().unwrap_or(Cell::Empty),
        }
    }

    /// Interprets `cell` for `column` and stores it on the task.
    pub fn set_cell(&mut self, column: &Column, cell: &Cell) -> Result<()> {
        match column {
            Column::Id => self.id = parse_id(cell)?,
            Column::Region => {
                self.region = if cell.is_empty() {
                    None
                } else {
                    Some(cell.as_text().parse()?)
                }
            }
            Column::Activities => self.activities = cell.as_text(),
            Column::CodeSubActivities => self.code_sub_activities = cell.as_text(),
            Column::SubActivities => self.sub_activities = cell.as_text(),
            Column::ProgramArea => self.program_area = cell.as_text(),
            Column::ImplementationLevel => self.implementation_level = cell.as_text(),
            Column::SubActivityCategory => self.sub_activity_category = cell.as_text(),
            Column::BudgetQ1 => self.budget_q1 = coerce_budget(cell),
            Column::BudgetQ2 => self.budget_q2 = coerce_budget(cell),
            Column::Outputs => self.outputs = cell.as_text(),
            Column::OutputIndicators => self.output_indicators = cell.as_text(),
            Column::Status => {
                self.status = if cell.is_empty() {
                    Status::Pending
                } else {
                    cell.as_text().parse()?
                }
            }
            Column::Progress => self.progress = parse_progress(cell)?,
            Column::Comments => self.comments = cell.as_text(),
            Column::AssignedTo => self.assigned_to = cell.as_text(),
            Column::LastModifiedBy => self.last_modified_by = cell.as_text(),
            Column::LastModifiedDate => self.last_modified_date = parse_date(cell)?,
            Column::Other(name) => {
                self.extra.insert(name.clone(), cell.clone());
            }
        }
        Ok(())
    }
}

fn parse_id(cell: &Cell) -> Result<TaskId> {
    let invalid = || TrackerError::InvalidLiteral {
        column: Column::Id.header().to_string(),
        value: cell.as_text(),
    };
    let value = cell.as_number().ok_or_else(invalid)?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(TaskId::MAX) {
        return Err(invalid());
    }
    Ok(value as TaskId)
}

/// Progress is stored as whole percent. A number strictly between 0 and 1 is
/// a percent-formatted cell (Excel stores `50%` as `0.5`) and is scaled up;
/// text may carry a trailing `%`.
fn parse_progress(cell: &Cell) -> Result<u8> {
    if cell.is_empty() {
        return Ok(0);
    }
    let invalid = || TrackerError::InvalidLiteral {
        column: Column::Progress.header().to_string(),
        value: cell.as_text(),
    };
    let value = match cell {
        Cell::Text(text) => text
            .trim()
            .trim_end_matches('%')
            .trim_end()
            .parse::<f64>()
            .map_err(|_| invalid())?,
        _ => {
            let value = cell.as_number().ok_or_else(invalid)?;
            if value > 0.0 && value < 1.0 {
                value * 100.0
            } else {
                value
            }
        }
    };
    if value.is_nan() {
        return Err(invalid());
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

fn parse_date(cell: &Cell) -> Result<Option<NaiveDateTime>> {
    if cell.is_empty() {
        return Ok(None);
    }
    let text = cell.as_text();
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT)
        .map(Some)
        .map_err(|_| TrackerError::InvalidLiteral {
            column: Column::LastModifiedDate.header().to_string(),
            value: text,
        })
}

/// The full working set of tasks together with the columns present in the
/// tracker sheet, in sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTable {
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
}

impl TaskTable {
    pub fn new(columns: Vec<Column>, tasks: Vec<Task>) -> Self {
        Self { columns, tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn has_column(&self, column: &Column) -> bool {
        self.columns.contains(column)
    }

    /// Appends `column` unless it is already present.
    pub fn ensure_column(&mut self, column: Column) {
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Every row carrying `id`; IDs are unique so this is normally one row.
    pub fn matching_mut(&mut self, id: TaskId) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut().filter(move |task| task.id == id)
    }

    /// Builds a table holding only the tasks accepted by `keep`, with the
    /// same columns.
    pub fn subset(&self, mut keep: impl FnMut(&Task) -> bool) -> TaskTable {
        TaskTable {
            columns: self.columns.clone(),
            tasks: self.tasks.iter().filter(|task| keep(task)).cloned().collect(),
        }
    }

    /// Converts a raw sheet into tasks. The sheet must carry an `ID` column;
    /// repeated headers keep their first occurrence.
    pub fn from_sheet(sheet: &SheetTable) -> Result<TaskTable> {
        let mut seen = HashSet::new();
        let mut mapped: Vec<(usize, Column)> = Vec::new();
        for (col_idx, header) in sheet.columns.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            let column = Column::from_header(header);
            if seen.insert(column.clone()) {
                mapped.push((col_idx, column));
            }
        }

        if !seen.contains(&Column::Id) {
            return Err(TrackerError::InvalidWorkbook(format!(
                "sheet '{}' has no '{}' column",
                sheet.sheet_name,
                Column::Id.header()
            )));
        }

        let mut tasks = Vec::with_capacity(sheet.rows.len());
        for row in &sheet.rows {
            let mut task = Task::default();
            for (col_idx, column) in &mapped {
                task.set_cell(column, SheetTable::cell(row, *col_idx))?;
            }
            tasks.push(task);
        }

        let columns = mapped.into_iter().map(|(_, column)| column).collect();
        Ok(TaskTable { columns, tasks })
    }

    /// Renders the table as a sheet with one header row.
    pub fn to_sheet(&self, sheet_name: &str) -> SheetTable {
        let columns = self
            .columns
            .iter()
            .map(|column| column.header().to_string())
            .collect();
        let rows = self
            .tasks
            .iter()
            .map(|task| self.columns.iter().map(|column| task.cell(column)).collect())
            .collect();

        SheetTable {
            sheet_name: sheet_name.to_string(),
            columns,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_names_and_menu_numbers() {
        assert_eq!(Status::parse_choice("2").unwrap(), Status::InProgress);
        assert_eq!(Status::parse_choice(" completed ").unwrap(), Status::Completed);
        assert!(Status::parse_choice("5").is_err());
        assert!(Status::parse_choice("Done").is_err());
    }

    #[test]
    fn budget_coercion_treats_invalid_values_as_zero() {
        assert_eq!(coerce_budget(&Cell::Number(120.5)), 120.5);
        assert_eq!(coerce_budget(&Cell::Text(" 90 ".into())), 90.0);
        assert_eq!(coerce_budget(&Cell::Text("TBD".into())), 0.0);
        assert_eq!(coerce_budget(&Cell::Empty), 0.0);
        assert_eq!(coerce_budget(&Cell::Number(-4.0)), 0.0);
    }

    #[test]
    fn from_sheet_keeps_unknown_columns_and_defaults_empty_cells() {
        let sheet = SheetTable {
            sheet_name: "All_Tasks".into(),
            columns: vec![
                "ID".into(),
                "Status".into(),
                "Progress (%)".into(),
                "Donor".into(),
            ],
            rows: vec![vec![
                Cell::Number(7.0),
                Cell::Empty,
                Cell::Number(140.0),
                Cell::Text("PEPFAR".into()),
            ]],
        };

        let table = TaskTable::from_sheet(&sheet).unwrap();
        let task = &table.tasks[0];
        assert_eq!(task.id, 7);
        assert_eq!(task.status, Status::Pending);
        assert_eq!(task.progress, 100);
        assert_eq!(
            task.extra.get("Donor"),
            Some(&Cell::Text("PEPFAR".into()))
        );
        assert_eq!(table.to_sheet("All_Tasks").columns, sheet.columns);
    }

    #[test]
    fn progress_accepts_percent_formatted_cells() {
        assert_eq!(parse_progress(&Cell::Number(0.5)).unwrap(), 50);
        assert_eq!(parse_progress(&Cell::Number(0.125)).unwrap(), 13);
        assert_eq!(parse_progress(&Cell::Number(1.0)).unwrap(), 1);
        assert_eq!(parse_progress(&Cell::Number(75.0)).unwrap(), 75);
        assert_eq!(parse_progress(&Cell::Text(" 40 % ".into())).unwrap(), 40);
        assert_eq!(parse_progress(&Cell::Empty).unwrap(), 0);
        assert!(parse_progress(&Cell::Text("half".into())).is_err());
    }

    #[test]
    fn from_sheet_requires_an_id_column() {
        let sheet = SheetTable {
            sheet_name: "All_Tasks".into(),
            columns: vec!["Status".into()],
            rows: Vec::new(),
        };

        assert!(matches!(
            TaskTable::from_sheet(&sheet),
            Err(TrackerError::InvalidWorkbook(_))
        ));
    }
}
