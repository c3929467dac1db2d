use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::io::SpreadsheetBackend;
use crate::model::{SheetInfo, SheetTarget};
use crate::normalize::grid::{SheetLayout, build_updates, parse_rows};
use crate::normalize::{format_aud, normalize_row};

/// How a run treats invalid rows and whether it writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute and log changes without writing them.
    pub dry_run: bool,
    /// Leave invalid rows untouched instead of aborting the run.
    pub skip_invalid: bool,
}

/// Outcome of processing one worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sheet: String,
    /// Prices converted into AUD.
    pub normalized: usize,
    /// Price cells without a currency, left as they are.
    pub untouched: usize,
    /// Invalid price cells skipped under [`RunOptions::skip_invalid`].
    pub skipped: usize,
    /// Cells written, including appended headers.
    pub updated_cells: usize,
}

/// Resolves a [`SheetTarget`] to a worksheet title.
pub fn resolve_sheet(backend: &dyn SpreadsheetBackend, target: &SheetTarget) -> Result<String> {
    let sheets = backend.list_sheets()?;
    let found = match target {
        SheetTarget::Name(name) => sheets.iter().find(|sheet| &sheet.title == name),
        SheetTarget::Gid(gid) => sheets.iter().find(|sheet| sheet.gid == *gid),
        SheetTarget::First => sheets.first(),
    };

    match found {
        Some(sheet) => Ok(sheet.title.clone()),
        None => {
            for line in describe_sheets(&sheets) {
                warn!(available = %line, "sheet not found");
            }
            Err(ToolError::SheetNotFound(target.to_string()))
        }
    }
}

/// One `N. title (GID: gid)` line per worksheet.
pub fn describe_sheets(sheets: &[SheetInfo]) -> Vec<String> {
    sheets
        .iter()
        .enumerate()
        .map(|(index, sheet)| format!("{}. {} (GID: {})", index + 1, sheet.title, sheet.gid))
        .collect()
}

/// Reads a worksheet, normalizes every price and writes the results back.
///
/// Rows are validated before anything is written. Unless
/// [`RunOptions::skip_invalid`] is set, a single invalid row aborts the run
/// with [`ToolError::InvalidRows`] and the sheet is left unchanged.
#[instrument(
    level = "info",
    skip_all,
    fields(sheet = %sheet, dry_run = options.dry_run)
)]
pub fn process_sheet(
    backend: &mut dyn SpreadsheetBackend,
    sheet: &str,
    config: &Config,
    options: RunOptions,
) -> Result<RunSummary> {
    let mut summary = RunSummary {
        sheet: sheet.to_string(),
        ..RunSummary::default()
    };

    let rates = config.rate_table()?;
    let grid = backend.read_values(sheet)?;
    if grid.is_empty() {
        info!("no data found");
        return Ok(summary);
    }

    let layout = SheetLayout::resolve(&grid, &config.columns)?;
    let parsed = parse_rows(&grid, &layout, config);
    info!(
        row_count = grid.len() - 1,
        price_count = parsed.rows.len(),
        "rows read"
    );

    let mut errors = parsed.errors;
    let mut normalized = Vec::with_capacity(parsed.rows.len());
    for row in &parsed.rows {
        match normalize_row(row, &rates) {
            Ok(row) => normalized.push(row),
            Err(error) => errors.push(error),
        }
    }

    if !errors.is_empty() {
        for error in &errors {
            warn!(%error, "invalid row");
        }
        if !options.skip_invalid {
            return Err(ToolError::InvalidRows(errors));
        }
    }

    for row in &normalized {
        let (Some(aud), Some(per_unit)) = (row.aud_price, row.per_unit_price) else {
            continue;
        };
        info!(
            line = row.line,
            label = %row.label,
            from = %format!("{} {}", row.currency, row.raw_price),
            units = row.units,
            aud = %format_aud(aud),
            per_unit = %format_aud(per_unit),
            "price normalized"
        );
    }

    let updates = build_updates(sheet, &grid, &layout, &normalized);
    summary.normalized = normalized.len();
    summary.untouched = parsed.untouched;
    summary.skipped = errors.len();

    if updates.is_empty() {
        info!("no price updates necessary");
    } else if options.dry_run {
        info!(update_count = updates.len(), "dry run; nothing written");
    } else {
        backend.write_values(&updates)?;
        summary.updated_cells = updates.len();
        info!(update_count = updates.len(), "cells updated");
    }

    Ok(summary)
}
