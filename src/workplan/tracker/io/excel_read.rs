use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::workplan::tracker::error::{Result, TrackerError};
use crate::workplan::tracker::model::{Cell, DATE_FORMAT, SheetTable};

/// Reads a single sheet into a [`SheetTable`]. `header_row` is the zero-based
/// sheet row holding the headers; anything above it is ignored and every row
/// below it becomes a data row.
pub fn read_sheet(path: &Path, sheet: &str, header_row: u32) -> Result<SheetTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, sheet)?;

    let start_row = range.start().map(|(row, _)| row).unwrap_or(0);
    if header_row < start_row {
        return Err(TrackerError::InvalidWorkbook(format!(
            "header row {header_row} of sheet '{sheet}' is empty"
        )));
    }
    let skip = (header_row - start_row) as usize;

    let mut rows = range.rows().skip(skip);
    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| cell_from_data(cell).as_text().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    if columns.iter().all(|header| header.is_empty()) {
        return Err(TrackerError::InvalidWorkbook(format!(
            "sheet '{sheet}' has no header row"
        )));
    }

    let rows = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(SheetTable {
        sheet_name: sheet.to_string(),
        columns,
        rows,
    })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| TrackerError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(TrackerError::from)?;
    Ok(range)
}

fn cell_from_data(cell: &DataType) -> Cell {
    match cell {
        DataType::String(value) => Cell::text(value.as_str()),
        DataType::Float(value) => Cell::Number(*value),
        DataType::Int(value) => Cell::Number(*value as f64),
        DataType::Bool(value) => Cell::Text(value.to_string()),
        DataType::DateTime(serial) => match excel_serial_to_datetime(*serial) {
            Some(datetime) => Cell::Text(datetime.format(DATE_FORMAT).to_string()),
            None => Cell::Number(*serial),
        },
        DataType::Empty => Cell::Empty,
        other => Cell::text(other.to_string()),
    }
}

/// Converts an Excel serial date (days since 1899-12-30) to second precision.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round();
    if !seconds.is_finite() {
        return None;
    }
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds as i64)?)
}
