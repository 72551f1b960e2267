//! Value freezing: replacing a column's live formulas with their results

use crate::chunk::{pad_column, RowChunk, RowChunks, SkipReason};
use crate::column::column_index;
use crate::error::Result;
use crate::grid::{GridClient, GridSpan, InputMode, RenderMode, SheetProperties};
use crate::progress::ChunkProgress;
use crate::range::CellRange;
use serde::{Deserialize, Serialize};

/// Default rows per freeze request
pub const DEFAULT_FREEZE_CHUNK_SIZE: u32 = 2000;

/// How a chunk of formulas is turned into literal values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeMethod {
    /// Read computed values, write them back as raw values
    ReadWrite,
    /// Server-side copy-paste of values onto the same range
    #[default]
    CopyPaste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezeSettings {
    pub chunk_size: u32,
    pub method: FreezeMethod,
    pub show_progress: bool,
}

impl Default for FreezeSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_FREEZE_CHUNK_SIZE,
            method: FreezeMethod::default(),
            show_progress: false,
        }
    }
}

/// Result of freezing one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FreezeOutcome {
    Frozen {
        column: String,
        rows: u32,
        chunks: usize,
    },
    Skipped {
        column: String,
        reason: SkipReason,
    },
}

/// Freezes ledger columns in bounded, ascending row chunks
pub struct FreezeEngine<'a, G: GridClient> {
    grid: &'a G,
    spreadsheet_id: &'a str,
    settings: FreezeSettings,
}

impl<'a, G: GridClient> FreezeEngine<'a, G> {
    pub fn new(grid: &'a G, spreadsheet_id: &'a str, settings: FreezeSettings) -> Self {
        Self {
            grid,
            spreadsheet_id,
            settings,
        }
    }

    /// Freeze rows `2..=effective_rows` of `column_label` on `tab`.
    ///
    /// Safe to re-run: freezing an already frozen range rewrites the same values.
    pub fn freeze_column(
        &self,
        tab: &SheetProperties,
        column_label: &str,
        effective_rows: u32,
    ) -> Result<FreezeOutcome> {
        let Some(column) = column_index(column_label) else {
            log::warn!("Invalid freeze column for {}: '{}' (skipped)", tab.title, column_label);
            return Ok(FreezeOutcome::Skipped {
                column: column_label.to_string(),
                reason: SkipReason::InvalidColumn,
            });
        };
        if effective_rows <= 1 {
            log::warn!("No data rows to freeze: {} (skipped)", tab.title);
            return Ok(FreezeOutcome::Skipped {
                column: column_label.to_string(),
                reason: SkipReason::NoDataRows,
            });
        }

        log::info!(
            "Freeze start: {} ({}2:{}{})",
            tab.title,
            column_label,
            column_label,
            effective_rows
        );

        let chunks = RowChunks::new(effective_rows, self.settings.chunk_size);
        let mut progress = ChunkProgress::new(
            chunks.data_rows() as u64,
            &format!("freeze {}!{}", tab.title, column_label),
            self.settings.show_progress,
        );

        let mut count = 0;
        for chunk in chunks {
            log::info!(
                "Freeze chunk start: {} rows {}-{}",
                tab.title,
                chunk.start_row,
                chunk.end_row
            );
            match self.settings.method {
                FreezeMethod::ReadWrite => {
                    freeze_rows(self.grid, self.spreadsheet_id, &tab.title, column, &chunk)?
                }
                FreezeMethod::CopyPaste => {
                    let span = GridSpan::column_rows(tab.sheet_id, column, chunk.start_row, chunk.end_row);
                    self.grid.copy_values(self.spreadsheet_id, &span, &span)?;
                }
            }
            log::info!(
                "Freeze chunk done: {} ({}) rows {}-{}",
                tab.title,
                chunk.index,
                chunk.start_row,
                chunk.end_row
            );
            progress.advance(chunk.len() as u64);
            count = chunk.index;
        }
        progress.finish("frozen");

        log::info!("Freeze completed: {} ({})", tab.title, column_label);
        Ok(FreezeOutcome::Frozen {
            column: column_label.to_string(),
            rows: effective_rows - 1,
            chunks: count,
        })
    }
}

/// Overwrite one chunk of `column` with its own computed values
pub(crate) fn freeze_rows<G: GridClient>(
    grid: &G,
    spreadsheet_id: &str,
    sheet: &str,
    column: u32,
    chunk: &RowChunk,
) -> Result<()> {
    let range = CellRange::column_span(sheet, column, chunk.start_row, chunk.end_row);

    log::info!(
        "Chunk value read start: {} ({}-{})",
        sheet,
        chunk.start_row,
        chunk.end_row
    );
    let values = grid.get_values(spreadsheet_id, &range, RenderMode::UnformattedValue)?;
    log::info!(
        "Chunk value read done: {} ({}-{})",
        sheet,
        chunk.start_row,
        chunk.end_row
    );

    grid.update_values(spreadsheet_id, &range, &pad_column(values, chunk), InputMode::Raw)
}
