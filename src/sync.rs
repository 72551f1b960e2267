//! Job orchestration: the sync job (extraction then ledger append) and the
//! standalone freeze job

use crate::append::{AppendEngine, AppendOutcome};
use crate::catalog::{CandidateDataset, DatasetCatalog};
use crate::chunk::{effective_rows, SkipReason};
use crate::column::{column_index, index_to_label};
use crate::config::{FreezeJobSettings, LedgerConfig, SyncSettings};
use crate::error::{LedgerError, Result};
use crate::extract::{ExtractOutcome, ExtractionStage};
use crate::freeze::{FreezeEngine, FreezeOutcome};
use crate::grid::{GridClient, SheetProperties};
use crate::metadata::MetadataStore;
use crate::selector::SourceSelector;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// Header for this run's column: the Monday of the current week at the
/// given UTC offset, as `YYYY-MM-DD`
pub fn week_monday_header(now: DateTime<Utc>, utc_offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    let today = now.with_timezone(&offset).date_naive();
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    monday.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractRecord {
    pub prefix: String,
    pub target_tab: String,
    #[serde(flatten)]
    pub outcome: ExtractOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendRecord {
    pub tab: String,
    pub previous_column: String,
    #[serde(flatten)]
    pub outcome: AppendOutcome,
    pub metadata_updated: bool,
}

/// What a sync run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub extracted: Vec<ExtractRecord>,
    pub appended: Vec<AppendRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreezeRecord {
    pub tab: String,
    pub metadata_column: String,
    #[serde(flatten)]
    pub outcome: FreezeOutcome,
}

/// What a freeze run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FreezeReport {
    pub frozen: Vec<FreezeRecord>,
}

/// Resolve the last-column label of every tab. A non-empty override map
/// replaces the metadata store read entirely.
fn resolve_last_columns<G: GridClient>(
    store: &MetadataStore<'_, G>,
    tabs: &[String],
    overrides: &IndexMap<String, String>,
) -> Result<IndexMap<String, String>> {
    if overrides.is_empty() {
        return store.read_all(tabs);
    }
    log::info!("Master meta override in use: {:?}", overrides);
    Ok(tabs
        .iter()
        .filter_map(|tab| overrides.get(tab).map(|column| (tab.clone(), column.clone())))
        .collect())
}

/// Pair every tab with its structure and last column before anything is
/// written, so a missing tab or metadata entry fails the run up front.
fn ledger_targets<'s>(
    tabs: &[String],
    structure: &'s IndexMap<String, SheetProperties>,
    last_columns: &IndexMap<String, String>,
) -> Result<Vec<(&'s SheetProperties, String)>> {
    tabs.iter()
        .map(|tab| {
            let props = structure
                .get(tab)
                .ok_or_else(|| LedgerError::tab_missing(tab.as_str()))?;
            let last_column = last_columns
                .get(tab)
                .ok_or_else(|| LedgerError::metadata_missing(tab.as_str()))?;
            Ok((props, last_column.clone()))
        })
        .collect()
}

fn read_structure<G: GridClient>(grid: &G, spreadsheet_id: &str) -> Result<IndexMap<String, SheetProperties>> {
    log::info!("Sheet properties read start");
    let structure = grid.get_structure(spreadsheet_id)?;
    log::info!("Sheet properties read done ({} tabs)", structure.len());
    Ok(structure)
}

/// Extraction stage followed by one append per tracked ledger tab
pub struct SyncJob<'a, G: GridClient, C: DatasetCatalog + ?Sized> {
    grid: &'a G,
    catalog: &'a C,
    config: &'a LedgerConfig,
    settings: &'a SyncSettings,
    selector: SourceSelector,
}

impl<'a, G: GridClient, C: DatasetCatalog + ?Sized> SyncJob<'a, G, C> {
    pub fn new(grid: &'a G, catalog: &'a C, config: &'a LedgerConfig, settings: &'a SyncSettings) -> Self {
        Self {
            grid,
            catalog,
            config,
            settings,
            selector: SourceSelector::default(),
        }
    }

    pub fn with_selector(mut self, selector: SourceSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Run once. Metadata for a tab is advanced only after its append
    /// completed; any error leaves the remaining tabs untouched.
    pub fn run(&self) -> Result<SyncReport> {
        let target = self.config.target_sheet_id.as_str();
        let mode = self.settings.run_mode;
        let mut report = SyncReport::default();

        let candidates: Vec<CandidateDataset> = if mode.runs_extract() && !self.config.mappings.is_empty() {
            self.catalog.list_datasets()?
        } else {
            Vec::new()
        };

        let structure = read_structure(self.grid, target)?;
        let store = MetadataStore::new(
            self.grid,
            target,
            self.config.master_meta_sheet.as_str(),
            self.config.metadata_layout()?,
        );

        let targets = if mode.runs_master() {
            let last_columns = resolve_last_columns(&store, &self.settings.tabs, &self.settings.column_overrides)?;
            ledger_targets(&self.settings.tabs, &structure, &last_columns)?
        } else {
            Vec::new()
        };

        if mode.runs_extract() {
            let extraction = self.config.extraction_settings();
            let stage = ExtractionStage::new(self.grid, self.selector, &extraction);
            for mapping in &self.config.mappings {
                let outcome = stage.run_mapping(mapping, &candidates, &structure)?;
                report.extracted.push(ExtractRecord {
                    prefix: mapping.prefix.clone(),
                    target_tab: mapping.target_tab.clone(),
                    outcome,
                });
            }
        }

        if mode.runs_master() {
            let engine = AppendEngine::new(self.grid, target, self.settings.append);
            for (props, last_column) in targets {
                let outcome = engine.append_column(props, &last_column, &self.settings.header_value)?;
                let metadata_updated = if outcome.column() != last_column.as_str() {
                    store.set_last_column(&props.title, outcome.column())?
                } else {
                    false
                };

                report.appended.push(AppendRecord {
                    tab: props.title.clone(),
                    previous_column: last_column,
                    outcome,
                    metadata_updated,
                });
            }
        }

        log::info!("Update completed");
        Ok(report)
    }
}

/// Freezes the column before each tab's metadata column
pub struct FreezeJob<'a, G: GridClient> {
    grid: &'a G,
    config: &'a LedgerConfig,
    settings: &'a FreezeJobSettings,
}

impl<'a, G: GridClient> FreezeJob<'a, G> {
    pub fn new(grid: &'a G, config: &'a LedgerConfig, settings: &'a FreezeJobSettings) -> Self {
        Self { grid, config, settings }
    }

    pub fn run(&self) -> Result<FreezeReport> {
        let target = self.config.target_sheet_id.as_str();
        let structure = read_structure(self.grid, target)?;
        let store = MetadataStore::new(
            self.grid,
            target,
            self.config.master_meta_sheet.as_str(),
            self.config.metadata_layout()?,
        );
        let last_columns = resolve_last_columns(&store, &self.settings.tabs, &self.settings.column_overrides)?;
        let targets = ledger_targets(&self.settings.tabs, &structure, &last_columns)?;

        let engine = FreezeEngine::new(self.grid, target, self.settings.freeze);
        let mut report = FreezeReport::default();

        for (props, last_column) in targets {
            let tab = &props.title;
            let previous = column_index(&last_column).map_or(0, |column| column - 1);
            let outcome = if previous < 1 {
                log::warn!("Invalid prev column for {}: {} (skipped)", tab, last_column);
                FreezeOutcome::Skipped {
                    column: last_column.clone(),
                    reason: SkipReason::InvalidColumn,
                }
            } else {
                let rows = effective_rows(props.row_count, self.settings.max_rows);
                engine.freeze_column(props, &index_to_label(previous), rows)?
            };

            report.frozen.push(FreezeRecord {
                tab: tab.clone(),
                metadata_column: last_column,
                outcome,
            });
        }

        Ok(report)
    }
}
