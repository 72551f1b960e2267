//! Row chunking for bounded remote requests

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Why a chunked pass over a ledger column did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The tab has a header row and nothing else within the row ceiling
    NoDataRows,
    /// The column label does not parse to an index of at least 1
    InvalidColumn,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDataRows => f.write_str("no data rows"),
            Self::InvalidColumn => f.write_str("invalid column"),
        }
    }
}

/// Rows available for processing: the declared row count, capped by
/// `max_rows` unless it is 0
pub fn effective_rows(row_count: u32, max_rows: u32) -> u32 {
    if max_rows > 0 {
        row_count.min(max_rows)
    } else {
        row_count
    }
}

/// A contiguous, inclusive block of data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChunk {
    /// 1-based position of this chunk in the sequence
    pub index: usize,
    pub start_row: u32,
    pub end_row: u32,
}

impl RowChunk {
    pub fn len(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterates the data rows `2..=last_row` in ascending chunks of at most `size` rows.
///
/// Row 1 is the header row and is never part of a chunk.
#[derive(Debug, Clone)]
pub struct RowChunks {
    processed_through: u32,
    last_row: u32,
    size: u32,
    index: usize,
}

impl RowChunks {
    pub fn new(last_row: u32, size: u32) -> Self {
        Self {
            processed_through: 1,
            last_row,
            size: size.max(1),
            index: 0,
        }
    }

    /// Number of data rows covered by all chunks
    pub fn data_rows(&self) -> u32 {
        self.last_row.saturating_sub(1)
    }
}

impl Iterator for RowChunks {
    type Item = RowChunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.processed_through >= self.last_row {
            return None;
        }
        let start_row = self.processed_through + 1;
        let end_row = self
            .processed_through
            .saturating_add(self.size)
            .min(self.last_row);
        self.processed_through = end_row;
        self.index += 1;
        Some(RowChunk {
            index: self.index,
            start_row,
            end_row,
        })
    }
}

/// Reshape a single-column read into exactly one cell per chunk row.
///
/// Reads come back with trailing blanks trimmed; padding with empty strings
/// makes the following write cover, and so overwrite, every row of the chunk.
pub fn pad_column(values: Vec<Vec<Value>>, chunk: &RowChunk) -> Vec<Vec<Value>> {
    let mut rows: Vec<Vec<Value>> = values
        .into_iter()
        .take(chunk.len() as usize)
        .map(|row| vec![row.into_iter().next().unwrap_or_else(|| Value::String(String::new()))])
        .collect();
    rows.resize_with(chunk.len() as usize, || vec![Value::String(String::new())]);
    rows
}
