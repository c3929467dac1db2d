//! Conversion between raw sheet cells and typed [`Row`]s.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use crate::config::{ColumnLayout, Config};
use crate::error::{Result, ToolError};
use crate::model::{CellGrid, Row, ValueRange};
use crate::normalize::format_aud;
use crate::normalize::price_text::{currency_for, is_placeholder, parse_price_text};

/// Column positions of one price group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupColumns {
    pub source_header: String,
    pub source: usize,
    pub aud: usize,
    pub per_unit: usize,
}

/// The configured [`ColumnLayout`] resolved against a sheet's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub name: Option<usize>,
    pub currency: Option<usize>,
    pub units: Option<usize>,
    pub groups: Vec<GroupColumns>,
    /// Output headers missing from the sheet, appended after its last column.
    pub new_headers: Vec<(usize, String)>,
}

impl SheetLayout {
    /// Locates the configured columns by header name in the first row of
    /// `grid`. Price groups whose source column is absent are skipped; at
    /// least one must be present. Missing output columns go after the widest
    /// row so they never land on data.
    pub fn resolve(grid: &[Vec<String>], layout: &ColumnLayout) -> Result<Self> {
        let headers = grid.first().map(Vec::as_slice).unwrap_or_default();
        let width = grid.iter().map(Vec::len).max().unwrap_or_default();
        let mut index = HeaderIndex::new(headers, width);

        let name = layout.name.as_deref().and_then(|name| index.find(name));
        let currency = layout.currency.as_deref().and_then(|name| index.find(name));
        let units = layout.units.as_deref().and_then(|name| index.find(name));

        let mut groups = Vec::new();
        for group in &layout.prices {
            let Some(source) = index.find(&group.source) else {
                warn!(column = %group.source, "price column not found; skipping");
                continue;
            };
            let aud = index.find_or_append(&group.aud);
            let per_unit = index.find_or_append(&group.per_unit);
            groups.push(GroupColumns {
                source_header: group.source.clone(),
                source,
                aud,
                per_unit,
            });
        }

        if groups.is_empty() {
            let names: Vec<&str> = layout
                .prices
                .iter()
                .map(|group| group.source.as_str())
                .collect();
            return Err(ToolError::MissingColumn(names.join(", ")));
        }

        Ok(Self {
            name,
            currency,
            units,
            groups,
            new_headers: index.appended(),
        })
    }
}

struct HeaderIndex {
    headers: Vec<String>,
    original_len: usize,
}

impl HeaderIndex {
    fn new(headers: &[String], width: usize) -> Self {
        let mut headers = headers.to_vec();
        if headers.len() < width {
            headers.resize(width, String::new());
        }
        Self {
            original_len: headers.len(),
            headers,
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.headers.iter().position(|header| header.trim() == name)
    }

    fn find_or_append(&mut self, name: &str) -> usize {
        if let Some(position) = self.find(name) {
            return position;
        }
        self.headers.push(name.trim().to_string());
        self.headers.len() - 1
    }

    fn appended(&self) -> Vec<(usize, String)> {
        self.headers
            .iter()
            .enumerate()
            .skip(self.original_len)
            .map(|(position, header)| (position, header.clone()))
            .collect()
    }
}

/// Result of reading every data row of a sheet.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub rows: Vec<Row>,
    /// Cells that failed validation, one error per cell.
    pub errors: Vec<ToolError>,
    /// Price cells without any currency, which are left as they are.
    pub untouched: usize,
}

enum PriceCell {
    Blank,
    Unpriced,
    Priced(Row),
}

/// Validates the data rows below the header into typed rows.
pub fn parse_rows(grid: &CellGrid, layout: &SheetLayout, config: &Config) -> ParsedRows {
    let mut parsed = ParsedRows::default();

    for (index, cells) in grid.iter().enumerate().skip(1) {
        let line = index + 1;
        let label = layout
            .name
            .map(|col| cell(cells, col).trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Row {line}"));

        for (group_index, group) in layout.groups.iter().enumerate() {
            let reader = CellReader {
                cells,
                line,
                label: &label,
                layout,
                config,
            };
            match reader.price(group_index, group) {
                Ok(PriceCell::Priced(row)) => parsed.rows.push(row),
                Ok(PriceCell::Unpriced) => parsed.untouched += 1,
                Ok(PriceCell::Blank) => {}
                Err(error) => parsed.errors.push(error),
            }
        }
    }

    parsed
}

struct CellReader<'a> {
    cells: &'a [String],
    line: usize,
    label: &'a str,
    layout: &'a SheetLayout,
    config: &'a Config,
}

impl CellReader<'_> {
    fn price(&self, group_index: usize, group: &GroupColumns) -> Result<PriceCell> {
        let text = cell(self.cells, group.source);
        if is_placeholder(text) {
            return Ok(PriceCell::Blank);
        }

        let parsed = parse_price_text(text, self.config.case_size).ok_or_else(|| {
            ToolError::InvalidPrice {
                line: self.line,
                value: text.trim().to_string(),
            }
        })?;

        let currency = self
            .optional(self.layout.currency)
            .map(currency_for)
            .or(parsed.currency);
        let Some(currency) = currency else {
            debug!(
                line = self.line,
                column = %group.source_header,
                value = text,
                "no currency; leaving price untouched"
            );
            return Ok(PriceCell::Unpriced);
        };

        let units = match self.optional(self.layout.units) {
            Some(value) => parse_unit_count(value, self.line)?,
            None => match parsed.case_size {
                Some(size) => size,
                None if self.is_promo_case(parsed.amount) => self.config.case_size,
                None => 1,
            },
        };

        let row = Row::new(self.line, parsed.amount, currency, units)
            .with_label(self.label)
            .with_group(group_index);
        Ok(PriceCell::Priced(row))
    }

    fn optional(&self, col: Option<usize>) -> Option<&str> {
        col.map(|col| cell(self.cells, col).trim())
            .filter(|value| !value.is_empty())
    }

    /// Promo listings above the threshold are quoted per case.
    fn is_promo_case(&self, amount: Decimal) -> bool {
        self.layout.name.is_some()
            && self.label.to_lowercase().contains("promo")
            && amount > self.config.promo_threshold
    }
}

/// Parses a unit count cell. Whole numbers written as decimals ("12.0") are
/// accepted; anything else non-positive or non-numeric is rejected.
pub fn parse_unit_count(value: &str, line: usize) -> Result<u32> {
    let invalid = || ToolError::InvalidUnitCount {
        line,
        value: value.to_string(),
    };
    let trimmed = value.trim();

    let units = match trimmed.parse::<u32>() {
        Ok(units) => units,
        Err(_) => {
            let decimal: Decimal = trimmed.parse().map_err(|_| invalid())?;
            if !decimal.fract().is_zero() || decimal < Decimal::ZERO {
                return Err(invalid());
            }
            decimal.to_u32().ok_or_else(invalid)?
        }
    };

    if units == 0 {
        return Err(invalid());
    }
    Ok(units)
}

/// Builds the cell writes for normalized rows, skipping cells that already
/// hold the rendered value. Missing output headers are written only when at
/// least one price cell changes.
pub fn build_updates(
    sheet: &str,
    grid: &CellGrid,
    layout: &SheetLayout,
    rows: &[Row],
) -> Vec<ValueRange> {
    let mut updates = Vec::new();

    for row in rows {
        let Some(group) = layout.groups.get(row.group) else {
            continue;
        };
        let row_index = row.line - 1;
        let current = grid.get(row_index).map(Vec::as_slice).unwrap_or_default();

        for (col, value) in [(group.aud, row.aud_price), (group.per_unit, row.per_unit_price)] {
            let Some(value) = value else {
                continue;
            };
            let rendered = format_aud(value);
            if cell(current, col).trim() != rendered {
                updates.push(ValueRange::cell(sheet, row_index, col, rendered));
            }
        }
    }

    if updates.is_empty() {
        return updates;
    }

    let mut with_headers: Vec<ValueRange> = layout
        .new_headers
        .iter()
        .map(|(col, header)| ValueRange::cell(sheet, 0, *col, header.clone()))
        .collect();
    with_headers.extend(updates);
    with_headers
}

fn cell(cells: &[String], col: usize) -> &str {
    cells.get(col).map(String::as_str).unwrap_or("")
}
