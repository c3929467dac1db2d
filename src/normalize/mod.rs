//! The price normalization pass: currency conversion into AUD followed by
//! the case to per-unit split.
//!
//! [`grid`] turns untyped sheet cells into [`Row`]s and back into cell
//! updates; [`price_text`] reads the free-text price cells.

pub mod grid;
pub mod price_text;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Result, ToolError};
use crate::model::Row;
use crate::rates::CurrencyRateTable;

/// Normalizes every row, failing on the first row that cannot be converted.
pub fn normalize(rows: &[Row], rates: &CurrencyRateTable) -> Result<Vec<Row>> {
    rows.iter().map(|row| normalize_row(row, rates)).collect()
}

/// Computes the AUD and per-unit prices of a single row.
///
/// Prices already in AUD are carried over unchanged; converted prices and
/// split case prices are rounded half-up to cents. A single unit costs
/// exactly the AUD price.
pub fn normalize_row(row: &Row, rates: &CurrencyRateTable) -> Result<Row> {
    if row.units == 0 {
        return Err(ToolError::InvalidUnitCount {
            line: row.line,
            value: row.units.to_string(),
        });
    }
    if !rates.contains(&row.currency) {
        return Err(ToolError::UnknownCurrency {
            line: row.line,
            code: row.currency.to_string(),
        });
    }

    let out_of_range = || ToolError::InvalidPrice {
        line: row.line,
        value: format!("{} {}", row.currency, row.raw_price),
    };
    let aud = rates
        .to_aud(row.raw_price, &row.currency)
        .ok_or_else(out_of_range)?;

    let aud_price = if row.currency.is_aud() {
        aud
    } else {
        round_currency(aud)
    };
    let per_unit_price = if row.units > 1 {
        let per_unit = aud
            .checked_div(Decimal::from(row.units))
            .ok_or_else(out_of_range)?;
        round_currency(per_unit)
    } else {
        aud_price
    };

    let mut normalized = row.clone();
    normalized.aud_price = Some(aud_price);
    normalized.per_unit_price = Some(per_unit_price);
    Ok(normalized)
}

/// Rounds to two decimal places, midpoints away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Renders an AUD amount the way it is written back into the sheet.
pub fn format_aud(value: Decimal) -> String {
    let mut rounded = round_currency(value);
    rounded.rescale(2);
    format!("${rounded}")
}
