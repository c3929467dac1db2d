use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};

use crate::error::{Result, ToolError};
use crate::io::workbook::{CellValue, SheetTable, WorkbookData};
use crate::model::CellGrid;

/// Worksheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook: Xlsx<_> = open_workbook(path)?;
    Ok(workbook.sheet_names().to_vec())
}

/// Reads one worksheet as a grid anchored at A1.
pub fn read_sheet(path: &Path, name: &str) -> Result<CellGrid> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, name)?;
    Ok(range_to_grid(&range))
}

/// Reads every worksheet of the workbook with cell types and formulas kept.
pub fn read_workbook(path: &Path) -> Result<WorkbookData> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();
    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet_name in sheet_names {
        let values = read_required_sheet(&mut workbook, &sheet_name)?;
        let formulas = match workbook.worksheet_formula(&sheet_name) {
            Some(result) => result?,
            None => Range::empty(),
        };
        tables.push(SheetTable {
            rows: typed_rows(&values, &formulas),
            sheet_name,
        });
    }
    Ok(WorkbookData { tables })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::SheetNotFound(name.to_string()))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

/// The used range may start below or right of A1; pad so grid positions
/// match sheet positions.
fn range_to_grid(range: &Range<DataType>) -> CellGrid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut grid: CellGrid = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(|cell| cell_to_string(Some(cell))));
        while cells.last().is_some_and(String::is_empty) {
            cells.pop();
        }
        grid.push(cells);
    }
    while grid.last().is_some_and(Vec::is_empty) {
        grid.pop();
    }
    grid
}

/// Merges values and formulas into rows anchored at A1. A formula replaces
/// the value of its cell, which is kept as the cached result.
fn typed_rows(values: &Range<DataType>, formulas: &Range<String>) -> Vec<Vec<CellValue>> {
    let mut rows = Vec::new();

    if let Some((row_start, col_start)) = values.start() {
        for (row, col, cell) in values.used_cells() {
            let value = typed_cell(cell);
            place(
                &mut rows,
                row_start as usize + row,
                col_start as usize + col,
                value,
            );
        }
    }

    if let Some((row_start, col_start)) = formulas.start() {
        for (row, col, formula) in formulas.used_cells() {
            let position = (row_start + row as u32, col_start + col as u32);
            let cached = cell_to_string(values.get_value(position));
            let value = CellValue::Formula {
                formula: formula.clone(),
                cached,
            };
            place(&mut rows, position.0 as usize, position.1 as usize, value);
        }
    }

    rows
}

fn place(rows: &mut Vec<Vec<CellValue>>, row: usize, col: usize, value: CellValue) {
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, CellValue::Empty);
    }
    cells[col] = value;
}

fn typed_cell(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(value) if value.is_empty() => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(serial) => CellValue::Date(*serial),
        DataType::Duration(days) => CellValue::Duration(*days),
        other => CellValue::Text(other.to_string()),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formulas_override_values_and_keep_the_cached_result() {
        let mut values: Range<DataType> = Range::new((0, 0), (0, 2));
        values.set_value((0, 0), DataType::DateTime(45413.0));
        values.set_value((0, 1), DataType::Float(42.5));
        values.set_value((0, 2), DataType::Float(85.0));
        let mut formulas: Range<String> = Range::new((0, 2), (0, 2));
        formulas.set_value((0, 2), "B1*2".to_string());

        let rows = typed_rows(&values, &formulas);
        assert_eq!(
            rows,
            vec![vec![
                CellValue::Date(45413.0),
                CellValue::Number(42.5),
                CellValue::Formula {
                    formula: "B1*2".into(),
                    cached: "85".into(),
                },
            ]]
        );
    }

    #[test]
    fn ranges_below_a1_are_padded() {
        let mut values: Range<DataType> = Range::new((1, 1), (1, 1));
        values.set_value((1, 1), DataType::String("Shiraz".into()));

        assert_eq!(
            typed_rows(&values, &Range::empty()),
            vec![vec![], vec![CellValue::Empty, CellValue::Text("Shiraz".into())]]
        );
        assert_eq!(range_to_grid(&values), vec![vec![], vec!["".to_string(), "Shiraz".into()]]);
    }
}
