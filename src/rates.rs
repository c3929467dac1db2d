//! Exchange rates into AUD.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::{Result, ToolError};
use crate::model::CurrencyCode;

/// Mapping from currency code to the multiplier that converts an amount in
/// that currency into AUD. AUD itself always maps to exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRateTable {
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl CurrencyRateTable {
    /// A table that only knows AUD.
    pub fn new() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(CurrencyCode::aud(), Decimal::ONE);
        Self { rates }
    }

    /// Adds or replaces a rate, returning the updated table.
    pub fn with_rate(mut self, code: impl Into<CurrencyCode>, rate: Decimal) -> Result<Self> {
        self.insert(code, rate)?;
        Ok(self)
    }

    /// Adds or replaces a rate. Rates must be positive and AUD cannot be
    /// assigned anything other than one.
    pub fn insert(&mut self, code: impl Into<CurrencyCode>, rate: Decimal) -> Result<()> {
        let code = code.into();
        if rate <= Decimal::ZERO {
            return Err(ToolError::InvalidRate {
                code: code.to_string(),
                reason: format!("rate must be positive, got {rate}"),
            });
        }
        if code.is_aud() && rate != Decimal::ONE {
            return Err(ToolError::InvalidRate {
                code: code.to_string(),
                reason: format!("AUD must map to 1, got {rate}"),
            });
        }
        self.rates.insert(code, rate);
        Ok(())
    }

    pub fn rate(&self, code: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Converts `amount` into AUD. `None` for an unknown currency or a result
    /// outside the decimal range.
    pub fn to_aud(&self, amount: Decimal, code: &CurrencyCode) -> Option<Decimal> {
        if code.is_aud() {
            return Some(amount);
        }
        self.rate(code)?.checked_mul(amount)
    }

    /// Converts an AUD `amount` back into `code` using the inverse rate.
    pub fn from_aud(&self, amount: Decimal, code: &CurrencyCode) -> Option<Decimal> {
        if code.is_aud() {
            return Some(amount);
        }
        amount.checked_div(self.rate(code)?)
    }
}

impl Default for CurrencyRateTable {
    /// Rates the price sheets were originally maintained with.
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(CurrencyCode::aud(), Decimal::ONE);
        rates.insert(CurrencyCode::new("ZAR"), Decimal::new(86, 3));
        rates.insert(CurrencyCode::new("USD"), Decimal::new(166, 2));
        rates.insert(CurrencyCode::new("EUR"), Decimal::new(181, 2));
        rates.insert(CurrencyCode::new("GBP"), Decimal::new(213, 2));
        Self { rates }
    }
}
