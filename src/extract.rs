//! Extraction stage: copy the latest source dataset into its staging tab

use crate::catalog::CandidateDataset;
use crate::config::SourceMapping;
use crate::error::{LedgerError, Result};
use crate::grid::{GridClient, InputMode, RenderMode, SheetProperties};
use crate::range::CellRange;
use crate::selector::SourceSelector;
use indexmap::IndexMap;
use serde::Serialize;

/// Result of processing one source mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractOutcome {
    Synced {
        source: String,
        reason: String,
        rows: usize,
    },
    NoCandidate,
    SourceUnreadable {
        source: String,
        error: String,
    },
}

/// Where source values are read from and written to
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub target_spreadsheet_id: String,
    pub source_sheet_name: String,
    pub source_range: String,
    pub target_range: String,
    /// Downgrade a failed source read to a skip of that mapping
    pub skip_unreadable_sources: bool,
}

pub struct ExtractionStage<'a, G: GridClient> {
    grid: &'a G,
    selector: SourceSelector,
    settings: &'a ExtractionSettings,
}

impl<'a, G: GridClient> ExtractionStage<'a, G> {
    pub fn new(grid: &'a G, selector: SourceSelector, settings: &'a ExtractionSettings) -> Self {
        Self {
            grid,
            selector,
            settings,
        }
    }

    /// Select the latest dataset for `mapping` and replace the staging tab's
    /// contents with it.
    ///
    /// A missing staging tab is a configuration error. No matching dataset is
    /// not an error: the mapping is skipped.
    pub fn run_mapping(
        &self,
        mapping: &SourceMapping,
        candidates: &[CandidateDataset],
        target_tabs: &IndexMap<String, SheetProperties>,
    ) -> Result<ExtractOutcome> {
        if !target_tabs.contains_key(&mapping.target_tab) {
            return Err(LedgerError::tab_missing(mapping.target_tab.as_str()));
        }

        let Some(selection) = self
            .selector
            .select(candidates, &mapping.prefix, &mapping.exclude_prefixes)
        else {
            log::warn!("No file found for prefix: {} (skipped)", mapping.prefix);
            return Ok(ExtractOutcome::NoCandidate);
        };

        let source = &selection.dataset;
        let reason = selection.reason.to_string();
        log::info!(
            "{} -> {} (source: {}, reason: {})",
            mapping.prefix,
            mapping.target_tab,
            source.name,
            reason
        );

        log::info!("Read source start: {}", source.name);
        let source_range = CellRange::parse(self.settings.source_sheet_name.as_str(), &self.settings.source_range)?;
        let values = match self
            .grid
            .get_values(&source.id, &source_range, RenderMode::FormattedValue)
        {
            Ok(values) => values,
            Err(e) if self.settings.skip_unreadable_sources && e.is_retryable() => {
                log::warn!("Failed to read source sheet for {}: {} (skipped)", mapping.prefix, e);
                return Ok(ExtractOutcome::SourceUnreadable {
                    source: source.name.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        log::info!("Read source done: {} (rows: {})", source.name, values.len());

        let target_range = CellRange::parse(mapping.target_tab.as_str(), &self.settings.target_range)?;
        log::info!("Clear target start: {}", mapping.target_tab);
        self.grid
            .clear_values(&self.settings.target_spreadsheet_id, &target_range)?;
        log::info!("Clear target done: {}", mapping.target_tab);

        log::info!("Write target start: {}", mapping.target_tab);
        if !values.is_empty() {
            let anchor = CellRange::cell(mapping.target_tab.as_str(), 1, 1);
            self.grid.update_values(
                &self.settings.target_spreadsheet_id,
                &anchor,
                &values,
                InputMode::Raw,
            )?;
        }
        log::info!("Write target done: {}", mapping.target_tab);

        Ok(ExtractOutcome::Synced {
            source: source.name.clone(),
            reason,
            rows: values.len(),
        })
    }
}
