//! Typed A1-style cell ranges

use crate::column::{index_to_label, label_to_index};
use crate::error::{LedgerError, Result};
use std::fmt;

/// A single corner of a range: a column and an optional row.
///
/// A missing row means "open": `A` as a start is row 1, as an end it is the
/// last row of the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: u32,
    pub row: Option<u32>,
}

impl CellRef {
    pub fn new(column: u32, row: u32) -> Self {
        Self {
            column,
            row: Some(row),
        }
    }

    pub fn column_only(column: u32) -> Self {
        Self { column, row: None }
    }

    /// Parse `B`, `B12` or `$B$12`
    pub fn parse(s: &str) -> Result<Self> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);

        let column = label_to_index(letters);
        if column == 0 {
            return Err(LedgerError::invalid_input(format!(
                "Invalid cell reference: '{}'",
                s
            )));
        }

        let row = if digits.is_empty() {
            None
        } else {
            let row: u32 = digits.parse().map_err(|_| {
                LedgerError::invalid_input(format!("Invalid cell reference: '{}'", s))
            })?;
            if row == 0 {
                return Err(LedgerError::invalid_input(format!(
                    "Row numbers start at 1: '{}'",
                    s
                )));
            }
            Some(row)
        };

        Ok(Self { column, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", index_to_label(self.column))?;
        if let Some(row) = self.row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// A rectangular range on a named sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: String,
    pub start: CellRef,
    pub end: Option<CellRef>,
}

impl CellRange {
    /// A single cell
    pub fn cell(sheet: impl Into<String>, column: u32, row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            start: CellRef::new(column, row),
            end: None,
        }
    }

    /// Rows `start_row..=end_row` of one column
    pub fn column_span(sheet: impl Into<String>, column: u32, start_row: u32, end_row: u32) -> Self {
        Self {
            sheet: sheet.into(),
            start: CellRef::new(column, start_row),
            end: Some(CellRef::new(column, end_row)),
        }
    }

    /// Parse an unqualified A1 range such as `A1:B10`, `A:Z` or `B3`
    pub fn parse(sheet: impl Into<String>, a1: &str) -> Result<Self> {
        let mut parts = a1.splitn(2, ':');
        let start = CellRef::parse(parts.next().unwrap_or_default())?;
        let end = match parts.next() {
            Some(end) => Some(CellRef::parse(end)?),
            None => None,
        };
        Ok(Self {
            sheet: sheet.into(),
            start,
            end,
        })
    }

    pub fn first_row(&self) -> u32 {
        self.start.row.unwrap_or(1)
    }

    /// Last row covered, or `None` when the range runs to the bottom of the sheet
    pub fn last_row(&self) -> Option<u32> {
        match self.end {
            Some(end) => end.row,
            None => self.start.row,
        }
    }

    pub fn first_column(&self) -> u32 {
        self.start.column
    }

    pub fn last_column(&self) -> u32 {
        self.end.map(|end| end.column).unwrap_or(self.start.column)
    }

    /// Fully qualified A1 notation, e.g. `'Master Prices'!K2:K21`
    pub fn to_a1(&self) -> String {
        match self.end {
            Some(end) => format!("{}!{}:{}", quote_sheet(&self.sheet), self.start, end),
            None => format!("{}!{}", quote_sheet(&self.sheet), self.start),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Quote a sheet name for use in A1 notation
pub fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}
