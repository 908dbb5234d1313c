//! Cell formatting applied after each write through `spreadsheets.batchUpdate`.
//!
//! Formats are set on whole blocks with `repeatCell`, one request per block. Column C is
//! never part of a request: its cells and their formats belong to the user.

use google_sheets4::{
    api::{
        CellData, CellFormat, Color, GridRange, NumberFormat, RepeatCellRequest, Request,
        TextFormat,
    },
    FieldMask,
};

use crate::domain::{
    holding::PortfolioSnapshot,
    sheets::{cell_range::CellRange, column::Column, row::Row},
};

use super::portfolio_layout::{self, AVERAGE_PRICE_COLUMN};

const QUANTITY_COLUMN: u32 = 1;
const CURRENT_PRICE_COLUMN: u32 = 3;
const CURRENT_VALUE_COLUMN: u32 = 4;
const INVESTED_COLUMN: u32 = 5;
const PNL_PERCENT_COLUMN: u32 = 6;
const PNL_ABSOLUTE_COLUMN: u32 = 7;

const QUANTITY_PATTERN: &str = "#,##0.00000000";
const PRICE_PATTERN: &str = "#,##0.00######";
const AMOUNT_PATTERN: &str = "#,##0.00";
/// PnL % is written in percent units already, so the `%` is a literal.
const PERCENT_PATTERN: &str = "0.00\"%\"";

const BOLD_FIELD: &str = "userEnteredFormat.textFormat.bold";
const COLOR_FIELD: &str = "userEnteredFormat.textFormat.foregroundColor";
const NUMBER_FORMAT_FIELD: &str = "userEnteredFormat.numberFormat";

/// Zero-based, end-exclusive grid coordinates of `range` in the tab `sheet_id`.
pub fn grid_range(sheet_id: i32, range: &CellRange) -> GridRange {
    GridRange {
        sheet_id: Some(sheet_id),
        start_column_index: Some(range.start_col.index() as i32),
        end_column_index: Some(range.end_col.index() as i32 + 1),
        start_row_index: Some(range.start_row.index() as i32),
        end_row_index: range.end_row.map(|row| row.index() as i32 + 1),
    }
}

fn block(first_col: u32, last_col: u32, first_row: usize, last_row: usize) -> CellRange {
    CellRange::new(
        Column::from_index(first_col),
        Row::from_row(first_row as u32),
        Column::from_index(last_col),
        Row::from_row(last_row as u32),
    )
}

/// The same rows, split around column C.
fn blocks_without_average_price(first_row: usize, last_row: usize) -> [CellRange; 2] {
    let average_price = AVERAGE_PRICE_COLUMN as u32;
    [
        block(0, average_price - 1, first_row, last_row),
        block(
            average_price + 1,
            portfolio_layout::last_column().index(),
            first_row,
            last_row,
        ),
    ]
}

fn repeat_cell(sheet_id: i32, range: &CellRange, format: CellFormat, field: &str) -> Request {
    Request {
        repeat_cell: Some(RepeatCellRequest {
            range: Some(grid_range(sheet_id, range)),
            cell: Some(CellData {
                user_entered_format: Some(format),
                ..Default::default()
            }),
            fields: Some(FieldMask::new(&[field])),
        }),
        ..Default::default()
    }
}

fn bold(bold: bool) -> CellFormat {
    CellFormat {
        text_format: Some(TextFormat {
            bold: Some(bold),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn number_format(pattern: &str) -> CellFormat {
    CellFormat {
        number_format: Some(NumberFormat {
            type_: Some("NUMBER".to_string()),
            pattern: Some(pattern.to_string()),
        }),
        ..Default::default()
    }
}

fn rgb(red: f32, green: f32, blue: f32) -> Color {
    Color {
        red: Some(red),
        green: Some(green),
        blue: Some(blue),
        alpha: None,
    }
}

/// Green for a gain, red for a loss, black otherwise.
fn pnl_color(pnl: Option<f64>) -> Color {
    match pnl {
        Some(value) if value > 0.0 => rgb(0.0, 0.6, 0.2),
        Some(value) if value < 0.0 => rgb(0.8, 0.0, 0.0),
        _ => rgb(0.0, 0.0, 0.0),
    }
}

fn foreground(color: Color) -> CellFormat {
    CellFormat {
        text_format: Some(TextFormat {
            foreground_color: Some(color),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Requests formatting the tab after `snapshot` was written to it. `content_rows` is the
/// count [`portfolio_layout::build_sheet_values`] reported for that write.
pub fn format_requests(
    sheet_id: i32,
    snapshot: &PortfolioSnapshot,
    content_rows: usize,
) -> Vec<Request> {
    let first_data_row = 2;
    let total_row = snapshot.holdings.len() + 3;
    let last_row = content_rows.max(total_row);
    let mut requests = Vec::new();

    for range in blocks_without_average_price(first_data_row, last_row) {
        requests.push(repeat_cell(sheet_id, &range, bold(false), BOLD_FIELD));
        requests.push(repeat_cell(
            sheet_id,
            &range,
            foreground(pnl_color(None)),
            COLOR_FIELD,
        ));
    }
    for row in [1, total_row] {
        for range in blocks_without_average_price(row, row) {
            requests.push(repeat_cell(sheet_id, &range, bold(true), BOLD_FIELD));
        }
    }

    let number_formats = [
        (QUANTITY_COLUMN, QUANTITY_COLUMN, QUANTITY_PATTERN),
        (CURRENT_PRICE_COLUMN, CURRENT_PRICE_COLUMN, PRICE_PATTERN),
        (CURRENT_VALUE_COLUMN, INVESTED_COLUMN, AMOUNT_PATTERN),
        (PNL_PERCENT_COLUMN, PNL_PERCENT_COLUMN, PERCENT_PATTERN),
        (PNL_ABSOLUTE_COLUMN, PNL_ABSOLUTE_COLUMN, AMOUNT_PATTERN),
    ];
    for (first_col, last_col, pattern) in number_formats {
        requests.push(repeat_cell(
            sheet_id,
            &block(first_col, last_col, first_data_row, total_row),
            number_format(pattern),
            NUMBER_FORMAT_FIELD,
        ));
    }

    let pnl_rows = snapshot
        .holdings
        .iter()
        .enumerate()
        .map(|(position, holding)| (position + first_data_row, holding.pnl_absolute))
        .chain(std::iter::once((total_row, Some(snapshot.total.pnl_absolute))));
    for (row, pnl) in pnl_rows {
        if pnl.map_or(true, |value| value == 0.0) {
            continue;
        }
        requests.push(repeat_cell(
            sheet_id,
            &block(PNL_PERCENT_COLUMN, PNL_ABSOLUTE_COLUMN, row, row),
            foreground(pnl_color(pnl)),
            COLOR_FIELD,
        ));
    }

    requests
}
