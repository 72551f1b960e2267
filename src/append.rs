//! Appending a new dated column to a ledger tab
//!
//! The previous column's formulas are carried into the new column chunk by
//! chunk, and optionally the previous column is frozen in the same pass.
//! Metadata is not touched here: the caller records the returned label once
//! the append has fully succeeded.

use crate::chunk::{effective_rows, pad_column, RowChunk, RowChunks, SkipReason};
use crate::column::{column_index, index_to_label, MAX_COLUMN};
use crate::error::Result;
use crate::freeze::freeze_rows;
use crate::grid::{GridClient, InputMode, RenderMode, SheetProperties, StructuralUpdate};
use crate::progress::ChunkProgress;
use crate::range::CellRange;
use serde::Serialize;
use serde_json::Value;

/// Default rows per append request
pub const DEFAULT_APPEND_CHUNK_SIZE: u32 = 500;

/// Default ceiling on rows processed per tab
pub const DEFAULT_MAX_ROWS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendSettings {
    pub chunk_size: u32,
    /// Ceiling on rows processed per tab; 0 means no ceiling
    pub max_rows: u32,
    /// Replace the previous column's formulas with values while copying
    pub freeze_previous: bool,
    pub show_progress: bool,
}

impl Default for AppendSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_APPEND_CHUNK_SIZE,
            max_rows: DEFAULT_MAX_ROWS,
            freeze_previous: true,
            show_progress: false,
        }
    }
}

/// Positions computed for one append; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendPlan {
    pub previous_column: u32,
    pub previous_column_label: String,
    pub new_column: u32,
    pub new_column_label: String,
    pub header_value: String,
    pub effective_rows: u32,
}

impl AppendPlan {
    /// Plan an append onto `tab` after `last_column_label`.
    ///
    /// Returns the reason instead when there is nothing safe to do.
    pub fn compute(
        tab: &SheetProperties,
        last_column_label: &str,
        header_value: &str,
        max_rows: u32,
    ) -> std::result::Result<Self, SkipReason> {
        // The new column must itself be addressable
        let previous_column = column_index(last_column_label)
            .filter(|column| *column < MAX_COLUMN)
            .ok_or(SkipReason::InvalidColumn)?;

        let effective_rows = effective_rows(tab.row_count, max_rows);
        if effective_rows <= 1 {
            return Err(SkipReason::NoDataRows);
        }

        let new_column = previous_column.checked_add(1).ok_or(SkipReason::InvalidColumn)?;
        Ok(Self {
            previous_column,
            previous_column_label: index_to_label(previous_column),
            new_column,
            new_column_label: index_to_label(new_column),
            header_value: header_value.to_string(),
            effective_rows,
        })
    }

    pub fn needs_expansion(&self, tab: &SheetProperties) -> bool {
        self.new_column > tab.column_count
    }

    pub fn chunks(&self, chunk_size: u32) -> RowChunks {
        RowChunks::new(self.effective_rows, chunk_size)
    }
}

/// Result of one append
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppendOutcome {
    Appended {
        column: String,
        header: String,
        chunks: usize,
        expanded: bool,
    },
    Skipped {
        column: String,
        reason: SkipReason,
    },
}

impl AppendOutcome {
    /// The tab's last column after this outcome
    pub fn column(&self) -> &str {
        match self {
            Self::Appended { column, .. } | Self::Skipped { column, .. } => column,
        }
    }
}

/// Extends ledger tabs by one column per run
pub struct AppendEngine<'a, G: GridClient> {
    grid: &'a G,
    spreadsheet_id: &'a str,
    settings: AppendSettings,
}

impl<'a, G: GridClient> AppendEngine<'a, G> {
    pub fn new(grid: &'a G, spreadsheet_id: &'a str, settings: AppendSettings) -> Self {
        Self {
            grid,
            spreadsheet_id,
            settings,
        }
    }

    pub fn settings(&self) -> &AppendSettings {
        &self.settings
    }

    /// Append a column headed `header_value` after `last_column_label`.
    ///
    /// Any failed request aborts the whole tab. Re-running with the same
    /// inputs rewrites the same header and cells, so a retry after a partial
    /// run converges on the state of a single successful run.
    pub fn append_column(
        &self,
        tab: &SheetProperties,
        last_column_label: &str,
        header_value: &str,
    ) -> Result<AppendOutcome> {
        log::info!("Master tab start: {}", tab.title);

        let plan = match AppendPlan::compute(tab, last_column_label, header_value, self.settings.max_rows) {
            Ok(plan) => plan,
            Err(reason) => {
                match reason {
                    SkipReason::InvalidColumn => log::warn!(
                        "Invalid previous column for {}: '{}' (skipped)",
                        tab.title,
                        last_column_label
                    ),
                    SkipReason::NoDataRows => log::warn!("No data rows in master tab: {} (skipped)", tab.title),
                }
                return Ok(AppendOutcome::Skipped {
                    column: last_column_label.to_string(),
                    reason,
                });
            }
        };

        let expanded = plan.needs_expansion(tab);
        if expanded {
            log::info!(
                "Master tab expand columns: {} ({} -> {})",
                tab.title,
                tab.column_count,
                plan.new_column
            );
            self.grid.batch_update(
                self.spreadsheet_id,
                &[StructuralUpdate::ResizeColumns {
                    sheet_id: tab.sheet_id,
                    column_count: plan.new_column,
                }],
            )?;
        }

        log::info!("Master tab header update: {} ({}1 = {})", tab.title, plan.new_column_label, header_value);
        self.grid.update_values(
            self.spreadsheet_id,
            &CellRange::cell(tab.title.as_str(), plan.new_column, 1),
            &vec![vec![Value::String(plan.header_value.clone())]],
            InputMode::Raw,
        )?;

        let chunks = plan.chunks(self.settings.chunk_size);
        log::info!(
            "Master tab chunked copy start: {} (rows: {}, chunk: {})",
            tab.title,
            plan.effective_rows,
            self.settings.chunk_size.max(1)
        );
        let mut progress = ChunkProgress::new(
            chunks.data_rows() as u64,
            &format!("{} {} -> {}", tab.title, plan.previous_column_label, plan.new_column_label),
            self.settings.show_progress,
        );

        let mut count = 0;
        for chunk in chunks {
            self.copy_chunk(&tab.title, &plan, &chunk)?;
            if self.settings.freeze_previous {
                freeze_rows(self.grid, self.spreadsheet_id, &tab.title, plan.previous_column, &chunk)?;
            }
            log::info!(
                "Master tab chunk done: {} ({}) rows {}-{}",
                tab.title,
                chunk.index,
                chunk.start_row,
                chunk.end_row
            );
            progress.advance(chunk.len() as u64);
            count = chunk.index;
        }
        progress.finish("appended");
        log::info!("Master tab chunked copy done: {}", tab.title);

        log::info!("Master tab updated: {} -> {} ({})", tab.title, header_value, plan.new_column_label);
        Ok(AppendOutcome::Appended {
            column: plan.new_column_label,
            header: plan.header_value,
            chunks: count,
            expanded,
        })
    }

    /// Carry the previous column's formulas for one chunk into the new column
    fn copy_chunk(&self, sheet: &str, plan: &AppendPlan, chunk: &RowChunk) -> Result<()> {
        let source = CellRange::column_span(sheet, plan.previous_column, chunk.start_row, chunk.end_row);
        let target = CellRange::column_span(sheet, plan.new_column, chunk.start_row, chunk.end_row);

        log::info!(
            "Master tab chunk formula read start: {} ({}-{})",
            sheet,
            chunk.start_row,
            chunk.end_row
        );
        let formulas = self
            .grid
            .get_values(self.spreadsheet_id, &source, RenderMode::Formula)?;
        log::info!(
            "Master tab chunk formula read done: {} ({}-{})",
            sheet,
            chunk.start_row,
            chunk.end_row
        );

        let mut carried = pad_column(formulas, chunk);
        if self.settings.freeze_previous {
            // Rows frozen by an interrupted earlier attempt keep their formulas
            // only in the new column
            let existing = self
                .grid
                .get_values(self.spreadsheet_id, &target, RenderMode::Formula)?;
            keep_copied_formulas(&mut carried, &pad_column(existing, chunk));
        }

        self.grid
            .update_values(self.spreadsheet_id, &target, &carried, InputMode::UserEntered)
    }
}

fn is_formula(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with('='))
}

/// Where the previous column no longer holds a formula but the new column
/// already does, keep the new column's formula.
fn keep_copied_formulas(carried: &mut [Vec<Value>], existing: &[Vec<Value>]) {
    for (row, current) in carried.iter_mut().zip(existing) {
        if let (Some(cell), Some(prior)) = (row.first_mut(), current.first()) {
            if !is_formula(cell) && is_formula(prior) {
                *cell = prior.clone();
            }
        }
    }
}
