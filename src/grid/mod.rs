//! The remote tabular-data service as seen by the ledger engines
//!
//! Everything the engines need from a spreadsheet backend goes through
//! [`GridClient`]. Writes are unconditional overwrites; re-issuing the same
//! write leaves the grid in the same state.

pub mod memory;
pub mod sheets;

use crate::error::Result;
use crate::range::CellRange;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rows of cell values as exchanged with the service
pub type ValueRows = Vec<Vec<serde_json::Value>>;

/// Structure of one tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetProperties {
    pub title: String,
    pub sheet_id: i64,
    pub row_count: u32,
    pub column_count: u32,
}

/// How cell contents are rendered on read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Formula text for formula cells, values otherwise
    Formula,
    /// Computed values without number formatting
    UnformattedValue,
    /// Computed values as displayed
    FormattedValue,
}

impl RenderMode {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Formula => "FORMULA",
            Self::UnformattedValue => "UNFORMATTED_VALUE",
            Self::FormattedValue => "FORMATTED_VALUE",
        }
    }
}

/// How written values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Stored literally; a leading `=` does not make a formula
    Raw,
    /// Parsed as if typed by a user; `=...` becomes a live formula
    UserEntered,
}

impl InputMode {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

/// A structural change applied through a batch update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralUpdate {
    /// Set the tab's column count to exactly `column_count`
    ResizeColumns { sheet_id: i64, column_count: u32 },
}

/// Zero-based, half-open grid coordinates used by copy-paste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpan {
    pub sheet_id: i64,
    pub start_row: u32,
    pub end_row: u32,
    pub start_column: u32,
    pub end_column: u32,
}

impl GridSpan {
    /// Span over 1-based inclusive rows `first_row..=last_row` of 1-based `column`
    pub fn column_rows(sheet_id: i64, column: u32, first_row: u32, last_row: u32) -> Self {
        Self {
            sheet_id,
            start_row: first_row.saturating_sub(1),
            end_row: last_row,
            start_column: column.saturating_sub(1),
            end_column: column,
        }
    }
}

/// Minimum capability set of the remote grid service
pub trait GridClient {
    /// Tab title to structure, in sheet order
    fn get_structure(&self, spreadsheet_id: &str) -> Result<IndexMap<String, SheetProperties>>;

    fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &CellRange,
        render: RenderMode,
    ) -> Result<ValueRows>;

    /// Overwrite cells starting at the top-left of `range`
    fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &CellRange,
        values: &ValueRows,
        input: InputMode,
    ) -> Result<()>;

    fn clear_values(&self, spreadsheet_id: &str, range: &CellRange) -> Result<()>;

    fn batch_update(&self, spreadsheet_id: &str, requests: &[StructuralUpdate]) -> Result<()>;

    /// Paste the computed values of `source` over `destination`
    fn copy_values(&self, spreadsheet_id: &str, source: &GridSpan, destination: &GridSpan) -> Result<()>;
}

/// Render a cell value the way it would appear in a metadata table
pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
