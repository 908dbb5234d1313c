use super::{
    a1_notation::{with_sheet_name, A1Notation, ToA1Notation},
    column::Column,
    row::Row,
};

/// Rectangular block of cells. `end_row: None` leaves the range open downwards (`A2:C`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub start_col: Column,
    pub start_row: Row,
    pub end_col: Column,
    pub end_row: Option<Row>,
}

impl CellRange {
    pub fn new(start_col: Column, start_row: Row, end_col: Column, end_row: Row) -> Self {
        Self {
            start_col,
            start_row,
            end_col,
            end_row: Some(end_row),
        }
    }

    pub fn open_ended(start_col: Column, start_row: Row, end_col: Column) -> Self {
        Self {
            start_col,
            start_row,
            end_col,
            end_row: None,
        }
    }
}

impl ToA1Notation for CellRange {
    fn to_a1_notation(&self, sheet_name: Option<&str>) -> A1Notation {
        let end_row = self.end_row.map(|row| row.to_string()).unwrap_or_default();
        let local = format!(
            "{}{}:{}{}",
            self.start_col, self.start_row, self.end_col, end_row
        );
        with_sheet_name(local, sheet_name)
    }
}
