//! Mapping between a [`PortfolioSnapshot`] and the rows of the portfolio tab.
//!
//! ```text
//! row 1      header
//! row 2..    one row per holding
//!            blank separator
//!            TOTAL
//!            blank separator    \ only when the tab holds average prices for
//!            retained symbols   / symbols missing from this report
//! ```
//!
//! Column C belongs to the user. A symbol that drops out of a report keeps its row below
//! TOTAL so its average price is still there when the symbol comes back.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

use crate::domain::{
    average_prices::AveragePrices,
    holding::{Holding, PortfolioSnapshot, PortfolioTotal, TOTAL_LABEL},
    sheets::{cell_range::CellRange, column::Column, row::Row},
};

pub const HEADERS: [&str; 9] = [
    "Asset",
    "Quantity",
    "Average Price",
    "Current Price",
    "Current Value",
    "Invested Total",
    "PnL %",
    "PnL (abs)",
    "Last Updated",
];

pub const ASSET_COLUMN: usize = 0;
pub const AVERAGE_PRICE_COLUMN: usize = 2;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row plus the blank separator and the TOTAL row.
const FIXED_ROWS: usize = 3;

pub fn last_column() -> Column {
    Column::from_index(HEADERS.len() as u32 - 1)
}

/// Rows a report fills: header, holdings, TOTAL and the retained block below it.
pub fn content_rows(holding_count: usize, retained_count: usize) -> usize {
    let retained_block = if retained_count == 0 {
        0
    } else {
        retained_count + 1
    };
    holding_count + FIXED_ROWS + retained_block
}

/// Everything the tab may hold, from the header down.
pub fn read_range() -> CellRange {
    CellRange::open_ended(Column::A, Row::from_row(1), last_column())
}

/// The block a write of `row_count` rows covers.
pub fn write_range(row_count: usize) -> CellRange {
    CellRange::new(
        Column::A,
        Row::from_row(1),
        last_column(),
        Row::from_row(row_count.max(1) as u32),
    )
}

/// What the tab currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistingSheet {
    pub average_prices: AveragePrices,
    /// Rows with any content, header included.
    pub occupied_rows: usize,
}

/// Reads the Asset and Average Price columns below the header. The TOTAL row and rows
/// without an asset are ignored.
pub fn parse_existing_rows(rows: &[Vec<String>]) -> ExistingSheet {
    let mut average_prices = AveragePrices::new();

    for row in rows.iter().skip(1) {
        let symbol = row
            .get(ASSET_COLUMN)
            .map(|cell| cell.trim())
            .unwrap_or_default();
        if symbol.is_empty() || symbol.eq_ignore_ascii_case(TOTAL_LABEL) {
            continue;
        }
        if let Some(raw) = row.get(AVERAGE_PRICE_COLUMN) {
            average_prices.insert(symbol, raw.as_str());
        }
    }

    let occupied_rows = rows
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map_or(0, |last| last + 1);

    ExistingSheet {
        average_prices,
        occupied_rows,
    }
}

/// Feeds the values Sheets computed for formula cells back into `average_prices`.
/// `computed_rows` is the tab read with its formulas evaluated.
pub fn resolve_formulas(average_prices: &mut AveragePrices, computed_rows: &[Vec<String>]) {
    for row in computed_rows.iter().skip(1) {
        let (Some(symbol), Some(computed)) = (row.get(ASSET_COLUMN), row.get(AVERAGE_PRICE_COLUMN))
        else {
            continue;
        };
        average_prices.set_computed(symbol, computed);
    }
}

fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map_or_else(|| text(""), Value::Number)
}

fn rounded(value: f64, decimals: i32) -> Value {
    number(round(value, decimals))
}

fn optional(value: Option<f64>, decimals: i32) -> Value {
    value.map_or_else(|| text(""), |value| rounded(value, decimals))
}

fn text<S: Into<String>>(value: S) -> Value {
    Value::String(value.into())
}

fn timestamp(at: &DateTime<Utc>) -> Value {
    text(at.format(TIMESTAMP_FORMAT).to_string())
}

fn blank_row() -> Vec<Value> {
    vec![text(""); HEADERS.len()]
}

fn holding_row(holding: &Holding, previous_average_prices: &AveragePrices) -> Vec<Value> {
    vec![
        text(holding.symbol.as_str()),
        rounded(holding.quantity, 8),
        text(
            previous_average_prices
                .raw(&holding.symbol)
                .unwrap_or_default(),
        ),
        number(holding.current_price),
        rounded(holding.current_value, 2),
        optional(holding.invested_total, 2),
        optional(holding.pnl_percent, 4),
        optional(holding.pnl_absolute, 2),
        timestamp(&holding.last_updated),
    ]
}

fn total_row(total: &PortfolioTotal) -> Vec<Value> {
    vec![
        text(TOTAL_LABEL),
        text(""),
        text(""),
        text(""),
        rounded(total.current_value, 2),
        rounded(total.invested_total, 2),
        optional(total.pnl_percent, 4),
        rounded(total.pnl_absolute, 2),
        timestamp(&total.last_updated),
    ]
}

fn retained_row(symbol: &str, raw_average_price: &str) -> Vec<Value> {
    let mut row = blank_row();
    row[ASSET_COLUMN] = text(symbol);
    row[AVERAGE_PRICE_COLUMN] = text(raw_average_price);
    row
}

/// Average prices of symbols the report no longer holds, in symbol order.
fn retained_average_prices<'a>(
    snapshot: &PortfolioSnapshot,
    previous_average_prices: &'a AveragePrices,
) -> Vec<(&'a str, &'a str)> {
    previous_average_prices
        .iter()
        .filter(|(symbol, _)| {
            !snapshot
                .holdings
                .iter()
                .any(|holding| holding.symbol == *symbol)
        })
        .collect()
}

/// What one write puts in the tab.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetValues {
    pub rows: Vec<Vec<Value>>,
    /// Rows with content, trailing blank padding excluded.
    pub content_rows: usize,
}

/// Full contents of the write: header, holdings, separator, TOTAL, the retained average
/// prices, then blank rows down to `previously_occupied` so a shorter report clears what the
/// last one left behind.
pub fn build_sheet_values(
    snapshot: &PortfolioSnapshot,
    previous_average_prices: &AveragePrices,
    previously_occupied: usize,
) -> SheetValues {
    let retained = retained_average_prices(snapshot, previous_average_prices);
    let content_rows = content_rows(snapshot.holdings.len(), retained.len());
    let mut rows = Vec::with_capacity(content_rows.max(previously_occupied));

    rows.push(HEADERS.iter().map(|header| text(*header)).collect());
    rows.extend(
        snapshot
            .holdings
            .iter()
            .map(|holding| holding_row(holding, previous_average_prices)),
    );
    rows.push(blank_row());
    rows.push(total_row(&snapshot.total));

    if !retained.is_empty() {
        rows.push(blank_row());
        rows.extend(
            retained
                .iter()
                .map(|(symbol, raw)| retained_row(symbol, raw)),
        );
    }

    while rows.len() < previously_occupied {
        rows.push(blank_row());
    }

    SheetValues { rows, content_rows }
}
