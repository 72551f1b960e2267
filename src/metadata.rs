//! Master meta: the per-tab record of the most recently appended column

use crate::column::normalize_label;
use crate::error::Result;
use crate::grid::{cell_text, GridClient, InputMode, RenderMode};
use crate::range::CellRange;
use indexmap::IndexMap;

/// Where the last-column labels live on the metadata sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLayout {
    /// Each tab owns a fixed row; the label sits in `value_column` of that row
    RowIndexed {
        rows: IndexMap<String, u32>,
        value_column: u32,
    },
    /// An unordered `(tab, label)` table with a header row
    TableScan { range: CellRange },
}

/// Reads and writes last-column labels for ledger tabs
pub struct MetadataStore<'a, G: GridClient> {
    grid: &'a G,
    spreadsheet_id: &'a str,
    sheet: String,
    layout: MetadataLayout,
}

impl<'a, G: GridClient> MetadataStore<'a, G> {
    pub fn new(grid: &'a G, spreadsheet_id: &'a str, sheet: impl Into<String>, layout: MetadataLayout) -> Self {
        Self {
            grid,
            spreadsheet_id,
            sheet: sheet.into(),
            layout,
        }
    }

    pub fn layout(&self) -> &MetadataLayout {
        &self.layout
    }

    /// Last appended column for `tab`, if recorded
    pub fn get_last_column(&self, tab: &str) -> Result<Option<String>> {
        match &self.layout {
            MetadataLayout::RowIndexed { rows, value_column } => match rows.get(tab) {
                Some(row) => self.read_cell(*row, *value_column),
                None => Ok(None),
            },
            MetadataLayout::TableScan { range } => Ok(self.scan_table(range)?.shift_remove(tab)),
        }
    }

    /// Labels for every tab in `tabs` that has one recorded.
    ///
    /// The table layout is read once regardless of how many tabs are asked for.
    pub fn read_all(&self, tabs: &[String]) -> Result<IndexMap<String, String>> {
        log::info!("Master meta read start: {}", self.sheet);
        let mut result = IndexMap::new();

        match &self.layout {
            MetadataLayout::RowIndexed { rows, value_column } => {
                for tab in tabs {
                    let Some(row) = rows.get(tab) else { continue };
                    if let Some(label) = self.read_cell(*row, *value_column)? {
                        result.insert(tab.clone(), label);
                    }
                }
            }
            MetadataLayout::TableScan { range } => {
                let table = self.scan_table(range)?;
                for tab in tabs {
                    if let Some(label) = table.get(tab) {
                        result.insert(tab.clone(), label.clone());
                    }
                }
            }
        }

        log::info!("Master meta read done: {}", self.sheet);
        Ok(result)
    }

    /// Record `label` as the last column of `tab`.
    ///
    /// Returns whether anything was written. In the table layout an unknown
    /// tab is left alone: rows are never inserted.
    pub fn set_last_column(&self, tab: &str, label: &str) -> Result<bool> {
        log::info!("Master meta update start: {} ({} -> {})", self.sheet, tab, label);

        let target = match &self.layout {
            MetadataLayout::RowIndexed { rows, value_column } => rows
                .get(tab)
                .map(|row| CellRange::cell(self.sheet.as_str(), *value_column, *row)),
            MetadataLayout::TableScan { range } => self.find_table_row(range, tab)?,
        };

        let Some(cell) = target else {
            log::warn!("Master meta has no entry for tab: {} (not updated)", tab);
            return Ok(false);
        };

        self.grid.update_values(
            self.spreadsheet_id,
            &cell,
            &vec![vec![serde_json::Value::String(label.to_string())]],
            InputMode::Raw,
        )?;
        log::info!("Master meta update done: {} ({} -> {})", self.sheet, tab, label);
        Ok(true)
    }

    fn read_cell(&self, row: u32, column: u32) -> Result<Option<String>> {
        let cell = CellRange::cell(self.sheet.as_str(), column, row);
        let values = self
            .grid
            .get_values(self.spreadsheet_id, &cell, RenderMode::UnformattedValue)?;

        let label = values
            .first()
            .and_then(|r| r.first())
            .map(|v| normalize_label(&cell_text(v)))
            .filter(|l| !l.is_empty());

        log::info!(
            "Master meta cell read: {} -> {}",
            cell,
            label.as_deref().unwrap_or("")
        );
        Ok(label)
    }

    fn scan_table(&self, range: &CellRange) -> Result<IndexMap<String, String>> {
        let values = self
            .grid
            .get_values(self.spreadsheet_id, &self.qualified(range), RenderMode::FormattedValue)?;

        let mut table = IndexMap::new();
        for row in values.iter().skip(1) {
            if row.len() < 2 {
                continue;
            }
            let tab = cell_text(&row[0]).trim().to_string();
            let label = normalize_label(&cell_text(&row[1]));
            if !tab.is_empty() && !label.is_empty() {
                table.insert(tab, label);
            }
        }
        Ok(table)
    }

    fn find_table_row(&self, range: &CellRange, tab: &str) -> Result<Option<CellRange>> {
        let range = self.qualified(range);
        let values = self
            .grid
            .get_values(self.spreadsheet_id, &range, RenderMode::FormattedValue)?;

        let position = values.iter().enumerate().skip(1).find(|(_, row)| {
            row.first()
                .map(|name| cell_text(name).trim() == tab)
                .unwrap_or(false)
        });

        Ok(position.map(|(offset, _)| {
            CellRange::cell(
                self.sheet.as_str(),
                range.first_column() + 1,
                range.first_row() + offset as u32,
            )
        }))
    }

    fn qualified(&self, range: &CellRange) -> CellRange {
        CellRange {
            sheet: self.sheet.clone(),
            ..range.clone()
        }
    }
}

