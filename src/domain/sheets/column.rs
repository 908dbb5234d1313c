use std::fmt::Formatter;

/// 1-based spreadsheet column, displayed as letters (1 = A, 27 = AA).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(u32);

impl Column {
    pub const A: Column = Column(1);

    /// Zero-based constructor, matching the order of the portfolio layout.
    pub fn from_index(index: u32) -> Self {
        Column(index.saturating_add(1))
    }

    pub fn index(&self) -> u32 {
        self.0 - 1
    }

    pub fn letters(&self) -> String {
        let mut number = self.0;
        let mut result = Vec::new();
        while number > 0 {
            let remainder = (number - 1) % 26;
            result.push((remainder as u8 + b'A') as char);
            number = (number - remainder - 1) / 26;
        }
        result.iter().rev().collect()
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letters())
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Column({}, {})", self.0, self)
    }
}
