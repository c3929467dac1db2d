//! Reading free-text price cells such as `R1,620,00 for 6x 750ml` or
//! `€45 / Case`.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::model::CurrencyCode;

static PACK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfor\s+(\d+)\s*x(?:\s*\d+\s*ml)?").expect("valid regex")
});
static CASE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:/|\bper)\s*case\b").expect("valid regex"));

const PLACEHOLDERS: [&str; 3] = ["N/A", "Not available", "Not specified"];

const PREFIXES: [(&str, &str); 5] = [
    ("AU$", "AUD"),
    ("A$", "AUD"),
    ("US$", "USD"),
    ("R", "ZAR"),
    ("$", "USD"),
];
const SYMBOLS: [(&str, &str); 4] = [("R", "ZAR"), ("$", "USD"), ("€", "EUR"), ("£", "GBP")];
const CODES: [&str; 5] = ["AUD", "USD", "EUR", "GBP", "ZAR"];
const MINUS_SIGNS: [char; 3] = ['-', '\u{2212}', '\u{2013}'];

/// Amount, currency and pack size found in a price cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceText {
    pub amount: Decimal,
    pub currency: Option<CurrencyCode>,
    /// Bottles covered by the price when the cell marks it as a case price.
    pub case_size: Option<u32>,
}

/// Blank cells and the placeholders used for missing prices.
pub fn is_placeholder(text: &str) -> bool {
    let text = text.trim();
    text.is_empty()
        || PLACEHOLDERS
            .iter()
            .any(|placeholder| text.eq_ignore_ascii_case(placeholder))
}

/// Parses a price cell. `default_case_size` applies to cells marked
/// "/ Case" or "per case" without an explicit count.
///
/// Returns `None` when no amount can be read from the text.
pub fn parse_price_text(text: &str, default_case_size: u32) -> Option<PriceText> {
    let mut rest = text.trim().to_string();
    let mut case_size = None;

    if let Some(caps) = PACK_MARKER.captures(&rest) {
        case_size = Some(caps[1].parse::<u32>().ok()?);
        rest = PACK_MARKER.replace(&rest, "").into_owned();
    }
    if CASE_MARKER.is_match(&rest) {
        case_size = case_size.or(Some(default_case_size));
        rest = CASE_MARKER.replace_all(&rest, "").into_owned();
    }

    let (currency, number) = split_currency(rest.trim());
    let amount = parse_amount(number)?;

    Some(PriceText {
        amount,
        currency,
        case_size,
    })
}

/// Maps a currency column value, which may be a code or a bare symbol.
pub fn currency_for(value: &str) -> CurrencyCode {
    let value = value.trim();
    SYMBOLS
        .iter()
        .chain(PREFIXES.iter())
        .find(|(symbol, _)| *symbol == value)
        .map(|(_, code)| CurrencyCode::new(code))
        .unwrap_or_else(|| CurrencyCode::new(value))
}

fn split_currency(text: &str) -> (Option<CurrencyCode>, &str) {
    for code in CODES {
        if let Some(rest) = text.strip_suffix(code) {
            return (Some(CurrencyCode::new(code)), rest);
        }
        if let Some(rest) = text.strip_prefix(code) {
            return (Some(CurrencyCode::new(code)), rest);
        }
    }
    for (prefix, code) in PREFIXES.iter().chain(SYMBOLS.iter()) {
        if let Some(rest) = text.strip_prefix(prefix) {
            return (Some(CurrencyCode::new(code)), rest);
        }
    }
    for (symbol, code) in SYMBOLS {
        if let Some(rest) = text.strip_suffix(symbol) {
            return (Some(CurrencyCode::new(code)), rest);
        }
    }
    (None, text)
}

/// A lone comma followed by one or two digits is a decimal comma; any other
/// comma is a thousands separator. Negative amounts and ranges such as
/// `R10-R15` are not read.
fn parse_amount(text: &str) -> Option<Decimal> {
    if text.contains(MINUS_SIGNS) {
        return None;
    }
    let cleaned: String = text
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',')
        .collect();

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        match cleaned.rsplit_once(',') {
            Some((head, tail)) if !tail.is_empty() && tail.len() <= 2 => {
                format!("{}.{}", head.replace(',', ""), tail)
            }
            _ => cleaned.replace(',', ""),
        }
    } else {
        cleaned.replace(',', "")
    };

    if !normalized.chars().any(|ch| ch.is_ascii_digit()) {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn reads_leading_symbols() {
        let rand = parse_price_text("R250", 12).unwrap();
        assert_eq!(rand.amount, dec("250"));
        assert_eq!(rand.currency, Some(CurrencyCode::new("ZAR")));
        assert_eq!(rand.case_size, None);

        let euro = parse_price_text("€19.50", 12).unwrap();
        assert_eq!(euro.currency, Some(CurrencyCode::new("EUR")));
        assert_eq!(euro.amount, dec("19.50"));

        let aud = parse_price_text("A$30", 12).unwrap();
        assert_eq!(aud.currency, Some(CurrencyCode::aud()));
    }

    #[test]
    fn reads_trailing_codes_and_symbols() {
        let gbp = parse_price_text("12.40 GBP", 12).unwrap();
        assert_eq!(gbp.currency, Some(CurrencyCode::new("GBP")));
        assert_eq!(gbp.amount, dec("12.40"));

        let aud = parse_price_text("45 AUD", 12).unwrap();
        assert_eq!(aud.currency, Some(CurrencyCode::aud()));

        let pound = parse_price_text("8.99£", 12).unwrap();
        assert_eq!(pound.currency, Some(CurrencyCode::new("GBP")));
    }

    #[test]
    fn case_markers_use_default_case_size() {
        let slash = parse_price_text("$120 / Case", 12).unwrap();
        assert_eq!(slash.amount, dec("120"));
        assert_eq!(slash.case_size, Some(12));

        let per = parse_price_text("€60 per case", 6).unwrap();
        assert_eq!(per.case_size, Some(6));
        assert_eq!(per.amount, dec("60"));
    }

    #[test]
    fn pack_marker_sets_case_size_and_decimal_comma() {
        let parsed = parse_price_text("R1,620,00 for 6x 750ml", 12).unwrap();
        assert_eq!(parsed.currency, Some(CurrencyCode::new("ZAR")));
        assert_eq!(parsed.case_size, Some(6));
        assert_eq!(parsed.amount, dec("1620.00"));
    }

    #[test]
    fn distinguishes_thousands_from_decimal_commas() {
        assert_eq!(parse_price_text("R100,50", 12).unwrap().amount, dec("100.50"));
        assert_eq!(parse_price_text("R1,620", 12).unwrap().amount, dec("1620"));
        assert_eq!(parse_price_text("$1,234.56", 12).unwrap().amount, dec("1234.56"));
    }

    #[test]
    fn plain_numbers_have_no_currency() {
        let parsed = parse_price_text("24.00", 12).unwrap();
        assert_eq!(parsed.currency, None);
        assert_eq!(parsed.amount, dec("24.00"));
    }

    #[test]
    fn unreadable_amounts_are_rejected() {
        assert_eq!(parse_price_text("call for price", 12), None);
        assert_eq!(parse_price_text("$1.2.3", 12), None);
    }

    #[test]
    fn negative_amounts_and_ranges_are_rejected() {
        assert_eq!(parse_price_text("-$5", 12), None);
        assert_eq!(parse_price_text("$-5.00", 12), None);
        assert_eq!(parse_price_text("R10-R15", 12), None);
        assert_eq!(parse_price_text("\u{2212}12 EUR", 12), None);
    }

    #[test]
    fn placeholders_are_recognised() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("  N/A "));
        assert!(is_placeholder("not specified"));
        assert!(!is_placeholder("R10"));
    }

    #[test]
    fn currency_column_accepts_symbols() {
        assert_eq!(currency_for("€"), CurrencyCode::new("EUR"));
        assert_eq!(currency_for("usd"), CurrencyCode::new("USD"));
        assert_eq!(currency_for("XYZ"), CurrencyCode::new("XYZ"));
    }
}
