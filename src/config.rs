use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};
use crate::rates::CurrencyRateTable;

/// Run configuration, loaded from TOML or built from defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Spreadsheet used when no URL is given on the command line.
    pub spreadsheet_id: Option<String>,
    /// Service account key file (JSON) used to authenticate.
    pub key_file: PathBuf,
    /// Rates merged over the built-in table, keyed by currency code.
    pub rates: BTreeMap<String, Decimal>,
    pub columns: ColumnLayout,
    /// Bottles in a case when a price is marked "/ Case" without a count.
    pub case_size: u32,
    /// Promo prices above this amount are treated as case prices.
    pub promo_threshold: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            key_file: PathBuf::from("keys/service-account.json"),
            rates: BTreeMap::new(),
            columns: ColumnLayout::default(),
            case_size: 12,
            promo_threshold: Decimal::new(90, 0),
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let source = fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.case_size == 0 {
            return Err(ToolError::Config("case_size must be at least 1".into()));
        }
        if self.columns.prices.is_empty() {
            return Err(ToolError::Config("at least one price column is required".into()));
        }
        for group in &self.columns.prices {
            let blank = [&group.source, &group.aud, &group.per_unit]
                .iter()
                .any(|header| header.trim().is_empty());
            if blank {
                return Err(ToolError::Config(format!(
                    "price column '{}' needs source, aud and per_unit headers",
                    group.source
                )));
            }
        }
        self.rate_table().map(|_| ())
    }

    /// Built-in rates with the configured overrides applied.
    pub fn rate_table(&self) -> Result<CurrencyRateTable> {
        let mut table = CurrencyRateTable::default();
        for (code, rate) in &self.rates {
            table.insert(code.as_str(), *rate)?;
        }
        Ok(table)
    }
}

/// Header names the sheet is expected to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnLayout {
    /// Product name column, used for log labels and promo detection.
    pub name: Option<String>,
    /// Explicit currency column; when absent the price text is inspected.
    pub currency: Option<String>,
    /// Explicit unit count column; when absent the price text is inspected.
    pub units: Option<String>,
    pub prices: Vec<PriceGroup>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            name: Some("Wine Name".into()),
            currency: Some("Currency".into()),
            units: Some("Units".into()),
            prices: vec![
                PriceGroup::new("RRP", "RRP (AUD)", "RRP per bottle"),
                PriceGroup::new(
                    "Discount RRP",
                    "Discount RRP (AUD)",
                    "Discount RRP per bottle",
                ),
            ],
        }
    }
}

/// A source price column together with the two columns its results go to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceGroup {
    pub source: String,
    pub aud: String,
    pub per_unit: String,
}

impl PriceGroup {
    pub fn new(source: &str, aud: &str, per_unit: &str) -> Self {
        Self {
            source: source.to_string(),
            aud: aud.to_string(),
            per_unit: per_unit.to_string(),
        }
    }
}
