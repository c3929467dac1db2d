use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// Untyped cell values as returned by a spreadsheet backend, row-major.
pub type CellGrid = Vec<Vec<String>>;

static SPREADSHEET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("valid regex"));
static SHEET_GID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&#]gid=(\d+)").expect("valid regex"));

/// ISO-4217 style currency code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Code of the currency every price is normalized into.
    pub const AUD: &'static str = "AUD";

    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    pub fn aud() -> Self {
        Self(Self::AUD.to_string())
    }

    pub fn is_aud(&self) -> bool {
        self.0 == Self::AUD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// A single price read from the sheet, typed and validated.
///
/// `raw_price` and `currency` are never modified by normalization so the
/// original values remain available for auditing the written results.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based line number in the worksheet.
    pub line: usize,
    /// Product name used in log output.
    pub label: String,
    /// Index of the price column group the value was read from.
    pub group: usize,
    pub raw_price: Decimal,
    pub currency: CurrencyCode,
    /// Units per case, at least 1.
    pub units: u32,
    pub aud_price: Option<Decimal>,
    pub per_unit_price: Option<Decimal>,
}

impl Row {
    /// Creates a row with no computed prices.
    pub fn new(line: usize, raw_price: Decimal, currency: impl Into<CurrencyCode>, units: u32) -> Self {
        Self {
            line,
            label: format!("Row {line}"),
            group: 0,
            raw_price,
            currency: currency.into(),
            units,
            aud_price: None,
            per_unit_price: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }
}

/// Worksheet selector within a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetTarget {
    Name(String),
    Gid(u64),
    /// The first worksheet, which is what the spreadsheet opens on by default.
    First,
}

impl fmt::Display for SheetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetTarget::Name(name) => write!(f, "'{name}'"),
            SheetTarget::Gid(gid) => write!(f, "GID {gid}"),
            SheetTarget::First => write!(f, "first sheet"),
        }
    }
}

/// Identifies the worksheet a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub target: SheetTarget,
}

impl SheetRef {
    /// Parses a Google Sheets URL such as
    /// `https://docs.google.com/spreadsheets/d/<id>/edit?gid=<gid>`.
    ///
    /// A GID in the URL takes precedence over `sheet`; without either the
    /// first worksheet is selected.
    pub fn from_url(url: &str, sheet: Option<&str>) -> Result<Self> {
        let spreadsheet_id = SPREADSHEET_ID
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|id| id.as_str().to_string())
            .ok_or_else(|| ToolError::InvalidUrl(url.to_string()))?;

        let gid = SHEET_GID
            .captures(url)
            .and_then(|caps| caps.get(1))
            .and_then(|gid| gid.as_str().parse::<u64>().ok());

        let target = match (gid, sheet) {
            (Some(gid), _) => SheetTarget::Gid(gid),
            (None, Some(name)) => SheetTarget::Name(name.to_string()),
            (None, None) => SheetTarget::First,
        };

        Ok(Self {
            spreadsheet_id,
            target,
        })
    }
}

/// Worksheet metadata as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub title: String,
    pub gid: u64,
}

/// A rectangular block of values anchored at a zero-based cell position.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub sheet: String,
    pub row: usize,
    pub col: usize,
    pub values: CellGrid,
}

impl ValueRange {
    /// A range covering one cell.
    pub fn cell(sheet: &str, row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            sheet: sheet.to_string(),
            row,
            col,
            values: vec![vec![value.into()]],
        }
    }

    /// Renders the range in A1 notation, e.g. `'Price List'!C2:D3`.
    pub fn a1(&self) -> String {
        let height = self.values.len().max(1);
        let width = self.values.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let start = cell_a1(self.row, self.col);
        let sheet = quote_sheet_name(&self.sheet);
        if height == 1 && width == 1 {
            format!("{sheet}!{start}")
        } else {
            let end = cell_a1(self.row + height - 1, self.col + width - 1);
            format!("{sheet}!{start}:{end}")
        }
    }
}

/// Converts a zero-based column index into spreadsheet letters (0 → A, 26 → AA).
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn cell_a1(row: usize, col: usize) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

/// Quotes a worksheet name for use in A1 ranges.
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_with_gid_selects_sheet_by_gid() {
        let url = "https://docs.google.com/spreadsheets/d/1Abc-_xyz/edit?gid=42#gid=42";
        let sheet_ref = SheetRef::from_url(url, Some("ignored")).unwrap();
        assert_eq!(sheet_ref.spreadsheet_id, "1Abc-_xyz");
        assert_eq!(sheet_ref.target, SheetTarget::Gid(42));
    }

    #[test]
    fn url_without_gid_falls_back_to_name_then_first() {
        let url = "https://docs.google.com/spreadsheets/d/abc123/edit";
        let named = SheetRef::from_url(url, Some("Wines")).unwrap();
        assert_eq!(named.target, SheetTarget::Name("Wines".into()));

        let first = SheetRef::from_url(url, None).unwrap();
        assert_eq!(first.target, SheetTarget::First);
    }

    #[test]
    fn url_without_spreadsheet_id_is_rejected() {
        let err = SheetRef::from_url("https://example.com/sheet", None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidUrl(_)));
    }

    #[test]
    fn column_letters_cover_multi_letter_columns() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn a1_quotes_sheet_names() {
        let single = ValueRange::cell("Bob's List", 1, 2, "$1.00");
        assert_eq!(single.a1(), "'Bob''s List'!C2");

        let block = ValueRange {
            sheet: "Wines".into(),
            row: 0,
            col: 0,
            values: vec![vec!["a".into(), "b".into()], vec!["c".into(), "d".into()]],
        };
        assert_eq!(block.a1(), "'Wines'!A1:B2");
    }

    #[test]
    fn currency_codes_are_normalized() {
        assert_eq!(CurrencyCode::new(" usd ").as_str(), "USD");
        assert!(CurrencyCode::from("aud").is_aud());
    }
}
