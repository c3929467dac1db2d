//! Spreadsheet backends the normalizer reads from and writes to.

pub mod auth;
pub mod excel_read;
pub mod excel_write;
pub mod google;
pub mod workbook;

use crate::error::Result;
use crate::model::{CellGrid, SheetInfo, ValueRange};

/// Cell level access to a spreadsheet.
pub trait SpreadsheetBackend {
    /// Worksheets in display order.
    fn list_sheets(&self) -> Result<Vec<SheetInfo>>;

    /// All values of a worksheet, row-major, starting at A1.
    fn read_values(&self, sheet: &str) -> Result<CellGrid>;

    /// Overwrites the given ranges in place.
    fn write_values(&mut self, ranges: &[ValueRange]) -> Result<()>;
}
