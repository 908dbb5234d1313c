use std::fmt::Formatter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Notation(pub String);

impl std::fmt::Display for A1Notation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for A1Notation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<A1Notation> for String {
    fn from(a1_notation: A1Notation) -> Self {
        a1_notation.0
    }
}

pub trait ToA1Notation {
    fn to_a1_notation(&self, sheet_name: Option<&str>) -> A1Notation;
}

/// Quotes a tab name for use in a range, doubling embedded single quotes.
///
/// ```
/// use crypto_portfolio::domain::sheets::a1_notation::quote_sheet_name;
/// assert_eq!(quote_sheet_name("Portfolio"), "'Portfolio'");
/// assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
/// ```
pub fn quote_sheet_name(sheet_name: &str) -> String {
    format!("'{}'", sheet_name.replace('\'', "''"))
}

pub fn with_sheet_name(local: String, sheet_name: Option<&str>) -> A1Notation {
    match sheet_name {
        Some(sheet_name) => A1Notation(format!("{}!{}", quote_sheet_name(sheet_name), local)),
        None => A1Notation(local),
    }
}
