use std::path::Path;

use rust_xlsxwriter::{Format, Formula, Workbook};

use crate::error::Result;
use crate::io::workbook::{CellValue, WorkbookData};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

/// Writes the provided workbook data to the given path, keeping each cell's
/// type. Empty cells are left unwritten.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();
    let date = Format::new().set_num_format(DATE_FORMAT);
    let date_time = Format::new().set_num_format(DATE_TIME_FORMAT);
    let duration = Format::new().set_num_format(DURATION_FORMAT);

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let (row_num, col_num) = (row_idx as u32, col_idx as u16);
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(text) => {
                        worksheet.write_string(row_num, col_num, text)?;
                    }
                    CellValue::Number(number) => {
                        worksheet.write_number(row_num, col_num, *number)?;
                    }
                    CellValue::Bool(flag) => {
                        worksheet.write_boolean(row_num, col_num, *flag)?;
                    }
                    CellValue::Date(serial) => {
                        let format = if serial.fract() == 0.0 { &date } else { &date_time };
                        worksheet.write_number_with_format(row_num, col_num, *serial, format)?;
                    }
                    CellValue::Duration(days) => {
                        worksheet.write_number_with_format(row_num, col_num, *days, &duration)?;
                    }
                    CellValue::Formula { formula, cached } => {
                        let formula = Formula::new(formula.as_str()).set_result(cached.as_str());
                        worksheet.write_formula(row_num, col_num, formula)?;
                    }
                }
            }
        }
    }

    workbook_writer.save(path)?;
    Ok(())
}
