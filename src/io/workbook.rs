use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::{Result, ToolError};
use crate::io::{SpreadsheetBackend, excel_read, excel_write};
use crate::model::{CellGrid, SheetInfo, ValueRange};

/// A workbook cell with its Excel type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date serial number.
    Date(f64),
    /// Elapsed time in days.
    Duration(f64),
    /// Formula text without the leading `=`, and its last computed value.
    Formula { formula: String, cached: String },
}

/// A worksheet held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Every worksheet of a workbook, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

impl WorkbookData {
    /// Writes each range into its worksheet as text, growing rows as needed.
    pub fn apply(&mut self, ranges: &[ValueRange]) -> Result<()> {
        for range in ranges {
            let table = self
                .tables
                .iter_mut()
                .find(|table| table.sheet_name == range.sheet)
                .ok_or_else(|| ToolError::SheetNotFound(range.sheet.clone()))?;

            for (row_offset, values) in range.values.iter().enumerate() {
                let row_index = range.row + row_offset;
                if table.rows.len() <= row_index {
                    table.rows.resize_with(row_index + 1, Vec::new);
                }
                let row = &mut table.rows[row_index];
                for (col_offset, value) in values.iter().enumerate() {
                    let col_index = range.col + col_offset;
                    if row.len() <= col_index {
                        row.resize(col_index + 1, CellValue::Empty);
                    }
                    row[col_index] = if value.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(value.clone())
                    };
                }
            }
        }
        Ok(())
    }
}

/// Backend over a local `.xlsx` file. Writes rewrite the whole workbook to
/// the output path, which then becomes the source for later reads. Cell
/// values, types and formulas are carried over; styling is not, so the
/// output must be a different file from the input.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    source: PathBuf,
    output: PathBuf,
}

impl XlsxWorkbook {
    /// Opens `path`; results are written to `output`.
    pub fn open(path: &Path, output: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        if is_same_file(path, output)? {
            return Err(ToolError::Config(format!(
                "output {} would overwrite the input workbook",
                output.display()
            )));
        }
        Ok(Self {
            source: path.to_path_buf(),
            output: output.to_path_buf(),
        })
    }
}

fn is_same_file(path: &Path, output: &Path) -> Result<bool> {
    if path == output {
        return Ok(true);
    }
    if !output.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(path)? == fs::canonicalize(output)?)
}

impl SpreadsheetBackend for XlsxWorkbook {
    fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        let names = excel_read::sheet_names(&self.source)?;
        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, title)| SheetInfo {
                title,
                gid: index as u64,
            })
            .collect())
    }

    fn read_values(&self, sheet: &str) -> Result<CellGrid> {
        excel_read::read_sheet(&self.source, sheet)
    }

    #[instrument(level = "debug", skip_all, fields(output = %self.output.display()))]
    fn write_values(&mut self, ranges: &[ValueRange]) -> Result<()> {
        let mut data = excel_read::read_workbook(&self.source)?;
        data.apply(ranges)?;
        debug!(range_count = ranges.len(), "ranges applied");
        excel_write::write_workbook(&self.output, &data)?;
        info!(output = %self.output.display(), "workbook written");
        self.source = self.output.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_grows_rows_and_columns() {
        let mut data = WorkbookData {
            tables: vec![SheetTable {
                sheet_name: "Wines".into(),
                rows: vec![vec![text("Name"), CellValue::Number(12.5)]],
            }],
        };
        data.apply(&[
            ValueRange::cell("Wines", 0, 3, "RRP (AUD)"),
            ValueRange::cell("Wines", 2, 1, "$5.00"),
        ])
        .unwrap();

        let rows = &data.tables[0].rows;
        assert_eq!(
            rows[0],
            vec![
                text("Name"),
                CellValue::Number(12.5),
                CellValue::Empty,
                text("RRP (AUD)"),
            ]
        );
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec![CellValue::Empty, text("$5.00")]);
    }

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[test]
    fn apply_rejects_unknown_sheet() {
        let mut data = WorkbookData::default();
        let err = data
            .apply(&[ValueRange::cell("Missing", 0, 0, "x")])
            .unwrap_err();
        assert!(matches!(err, ToolError::SheetNotFound(name) if name == "Missing"));
    }

    #[test]
    fn open_requires_existing_file() {
        let err = XlsxWorkbook::open(Path::new("no/such/book.xlsx"), Path::new("out.xlsx"))
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingInput(_)));
    }

    #[test]
    fn open_refuses_to_overwrite_the_input() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("prices.xlsx");
        fs::write(&input, b"placeholder").unwrap();

        let err = XlsxWorkbook::open(&input, &input).unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));

        let dotted = temp_dir.path().join(".").join("prices.xlsx");
        let err = XlsxWorkbook::open(&input, &dotted).unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));

        let output = temp_dir.path().join("prices-aud.xlsx");
        assert!(XlsxWorkbook::open(&input, &output).is_ok());
    }
}
