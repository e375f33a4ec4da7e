use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::workplan::tracker::error::Result;
use crate::workplan::tracker::model::{Cell, SheetTable};

/// How a sheet is decorated when written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetStyle {
    /// Values only; used for every tracker save.
    Plain,
    /// Filled bold header row and columns sized to their content.
    Styled {
        header_fill: u32,
        max_column_width: usize,
    },
}

/// Writes the provided table as the only sheet of a new workbook at `path`,
/// replacing any existing file.
pub fn write_sheet(path: &Path, table: &SheetTable, style: SheetStyle) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(&table.sheet_name)?;

    match style {
        SheetStyle::Plain => {
            for (col_idx, header) in table.columns.iter().enumerate() {
                worksheet.write_string(0, col_idx as u16, header)?;
            }
        }
        SheetStyle::Styled {
            header_fill,
            max_column_width,
        } => {
            let header_format = Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(header_fill));
            for (col_idx, header) in table.columns.iter().enumerate() {
                worksheet.write_string_with_format(0, col_idx as u16, header, &header_format)?;
            }
            for (col_idx, width) in column_widths(table, max_column_width)
                .into_iter()
                .enumerate()
            {
                worksheet.set_column_width(col_idx as u16, width as f64)?;
            }
        }
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, (row_idx + 1) as u32, col_idx as u16, cell)?;
        }
    }

    workbook_writer.save(path)?;
    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(value) => {
            worksheet.write_string(row, col, value)?;
        }
        Cell::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
    }
    Ok(())
}

/// Width per column: the longest rendered value (header included) plus two,
/// capped at `max_width`.
pub fn column_widths(table: &SheetTable, max_width: usize) -> Vec<usize> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(col_idx, header)| {
            let longest = table
                .rows
                .iter()
                .map(|row| SheetTable::cell(row, col_idx).as_text().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            (longest + 2).min(max_width)
        })
        .collect()
}
