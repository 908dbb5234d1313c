use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct AverageCell {
    raw: String,
    price: Option<f64>,
}

/// Average acquisition prices exactly as the user entered them in the sheet, keyed by symbol.
///
/// The raw text (a formula included) is kept so the column can be written back untouched;
/// [`AveragePrices::price`] gives the numeric view used for PnL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AveragePrices {
    cells: BTreeMap<String, AverageCell>,
}

/// A cell holding `=...` is a formula whose value only the spreadsheet can compute.
pub fn is_formula(raw: &str) -> bool {
    raw.trim_start().starts_with('=')
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

impl AveragePrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank cells are ignored. A symbol seen twice keeps its first value. Formulas get no
    /// price until [`AveragePrices::set_computed`] supplies their value.
    pub fn insert<S: AsRef<str>, V: Into<String>>(&mut self, symbol: S, raw: V) {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return;
        }
        let price = if is_formula(&raw) {
            None
        } else {
            parse_price(&raw)
        };
        self.cells
            .entry(normalize(symbol.as_ref()))
            .or_insert(AverageCell { raw, price });
    }

    /// Numeric value the spreadsheet computed for a formula cell.
    pub fn set_computed(&mut self, symbol: &str, computed: &str) {
        if let Some(cell) = self.cells.get_mut(&normalize(symbol)) {
            if is_formula(&cell.raw) && cell.price.is_none() {
                cell.price = parse_price(computed);
            }
        }
    }

    pub fn raw(&self, symbol: &str) -> Option<&str> {
        self.cells.get(symbol).map(|cell| cell.raw.as_str())
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.cells.get(symbol).and_then(|cell| cell.price)
    }

    pub fn has_formulas(&self) -> bool {
        self.cells.values().any(|cell| is_formula(&cell.raw))
    }

    /// `(symbol, raw)` pairs in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(symbol, cell)| (symbol.as_str(), cell.raw.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Parses a price cell that may carry currency signs, spaces and either `,` or `.` as the
/// decimal separator.
///
/// ```
/// use crypto_portfolio::domain::average_prices::parse_price;
/// assert_eq!(parse_price("$45,000.50"), Some(45000.5));
/// assert_eq!(parse_price("45000,5"), Some(45000.5));
/// assert_eq!(parse_price("n/a"), None);
/// ```
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£'))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Whichever separator comes last is the decimal one
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() > 1 => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        (None, _) => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|price| price.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        assert_eq!(parse_price("45000"), Some(45000.0));
        assert_eq!(parse_price("0.00012"), Some(0.00012));
    }

    #[test]
    fn test_parse_currency_and_spaces() {
        assert_eq!(parse_price(" $ 1 200 "), Some(1200.0));
        assert_eq!(parse_price("€2,5"), Some(2.5));
    }

    #[test]
    fn test_parse_thousand_separators() {
        assert_eq!(parse_price("1,234,567"), Some(1234567.0));
        assert_eq!(parse_price("45.000,50"), Some(45000.5));
        assert_eq!(parse_price("45,000.50"), Some(45000.5));
    }

    #[test]
    fn test_parse_rejects_text() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
        assert_eq!(parse_price("ask Bob"), None);
        assert_eq!(parse_price("NaN"), None);
    }

    #[test]
    fn test_insert_normalizes_symbol_and_skips_blank() {
        let mut prices = AveragePrices::new();
        prices.insert(" btc ", "45000");
        prices.insert("ETH", "  ");

        assert_eq!(prices.raw("BTC"), Some("45000"));
        assert_eq!(prices.price("BTC"), Some(45000.0));
        assert_eq!(prices.raw("ETH"), None);
        assert_eq!(prices.len(), 1);
    }

    #[test]
    fn test_first_value_wins() {
        let mut prices = AveragePrices::new();
        prices.insert("BTC", "45000");
        prices.insert("BTC", "1");
        assert_eq!(prices.price("BTC"), Some(45000.0));
    }

    #[test]
    fn test_unparseable_text_is_kept_raw() {
        let mut prices = AveragePrices::new();
        prices.insert("SOL", "see notes");
        assert_eq!(prices.raw("SOL"), Some("see notes"));
        assert_eq!(prices.price("SOL"), None);
    }

    #[test]
    fn test_formula_keeps_raw_and_takes_computed_price() {
        let mut prices = AveragePrices::new();
        prices.insert("BTC", "=AVERAGE(Buys!B2:B9)");
        prices.insert("ETH", "1800");

        assert!(prices.has_formulas());
        assert_eq!(prices.price("BTC"), None);

        prices.set_computed("btc", "41234.5");
        prices.set_computed("ETH", "1");

        assert_eq!(prices.raw("BTC"), Some("=AVERAGE(Buys!B2:B9)"));
        assert_eq!(prices.price("BTC"), Some(41234.5));
        assert_eq!(prices.price("ETH"), Some(1800.0));
    }

    #[test]
    fn test_iter_is_sorted() {
        let mut prices = AveragePrices::new();
        prices.insert("SOL", "20");
        prices.insert("ADA", "0.4");
        assert_eq!(
            prices.iter().collect::<Vec<_>>(),
            vec![("ADA", "0.4"), ("SOL", "20")]
        );
    }
}
