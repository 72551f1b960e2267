//! Run configuration: the JSON config file plus environment and CLI overrides

use crate::append::{AppendSettings, DEFAULT_APPEND_CHUNK_SIZE, DEFAULT_MAX_ROWS};
use crate::column::{column_index, label_to_index, normalize_label};
use crate::error::{LedgerError, Result};
use crate::extract::ExtractionSettings;
use crate::freeze::{FreezeMethod, FreezeSettings, DEFAULT_FREEZE_CHUNK_SIZE};
use crate::metadata::MetadataLayout;
use crate::range::CellRange;
use crate::retry::RetryPolicy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Default config file name
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const ENV_CONFIG: &str = "LEDGER_CONFIG";
pub const ENV_RUN_MODE: &str = "LEDGER_RUN_MODE";
pub const ENV_ONLY_TAB: &str = "LEDGER_ONLY_TAB";
pub const ENV_LAST_COL: &str = "LEDGER_LAST_COL";
pub const ENV_FREEZE: &str = "LEDGER_FREEZE";
pub const ENV_MAX_ROWS: &str = "LEDGER_MAX_ROWS";
pub const ENV_CHUNK_SIZE: &str = "LEDGER_CHUNK_SIZE";
pub const ENV_HEADER_DATE: &str = "LEDGER_HEADER_DATE";

/// One source-prefix to staging-tab mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub prefix: String,
    pub target_tab: String,
    #[serde(default)]
    pub exclude_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_secs: default_retry_delay(),
        }
    }
}

/// Contents of `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub drive_folder_id: String,
    pub target_sheet_id: String,
    #[serde(default)]
    pub source_sheet_name: String,
    #[serde(default = "default_source_range")]
    pub source_range: String,
    #[serde(default = "default_source_range")]
    pub target_range: String,
    #[serde(default)]
    pub mappings: Vec<SourceMapping>,

    #[serde(default)]
    pub master_tabs: Vec<String>,
    #[serde(default = "default_meta_sheet")]
    pub master_meta_sheet: String,
    #[serde(default = "default_meta_range")]
    pub master_meta_range: String,
    #[serde(default)]
    pub master_meta_rows: IndexMap<String, u32>,
    #[serde(default = "default_meta_value_column")]
    pub master_meta_value_column: String,
    #[serde(default)]
    pub master_meta_override: IndexMap<String, String>,

    #[serde(default = "default_max_rows")]
    pub master_max_rows: u32,
    #[serde(default = "default_chunk_size")]
    pub master_chunk_size: u32,
    #[serde(default = "default_freeze_chunk_size")]
    pub master_freeze_chunk_size: u32,
    #[serde(default = "default_true")]
    pub master_freeze: bool,
    #[serde(default)]
    pub freeze_method: FreezeMethod,

    #[serde(default = "default_utc_offset")]
    pub header_utc_offset_hours: i32,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub skip_unreadable_sources: bool,
}

fn default_source_range() -> String {
    "A:Z".to_string()
}

fn default_meta_sheet() -> String {
    "Master_Meta".to_string()
}

fn default_meta_range() -> String {
    "A1:B10".to_string()
}

fn default_meta_value_column() -> String {
    "B".to_string()
}

fn default_max_rows() -> u32 {
    DEFAULT_MAX_ROWS
}

fn default_chunk_size() -> u32 {
    DEFAULT_APPEND_CHUNK_SIZE
}

fn default_freeze_chunk_size() -> u32 {
    DEFAULT_FREEZE_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

fn default_utc_offset() -> i32 {
    9
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    120
}

fn default_http_timeout() -> u64 {
    300
}

impl LedgerConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LedgerError::config(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| LedgerError::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_sheet_id.trim().is_empty() {
            return Err(LedgerError::config("target_sheet_id must not be empty"));
        }
        if self.master_chunk_size == 0 || self.master_freeze_chunk_size == 0 {
            return Err(LedgerError::config("Chunk sizes must be greater than 0"));
        }
        if self.retry.attempts == 0 {
            return Err(LedgerError::config("retry.attempts must be at least 1"));
        }
        if column_index(&self.master_meta_value_column).is_none() {
            return Err(LedgerError::config(format!(
                "Invalid master_meta_value_column: '{}'",
                self.master_meta_value_column
            )));
        }
        if self.master_meta_rows.is_empty() {
            CellRange::parse(self.master_meta_sheet.as_str(), &self.master_meta_range)
                .map_err(|e| LedgerError::config(format!("Invalid master_meta_range: {}", e)))?;
        }
        for mapping in &self.mappings {
            if mapping.prefix.is_empty() || mapping.target_tab.is_empty() {
                return Err(LedgerError::config(
                    "Mappings need a non-empty prefix and target_tab",
                ));
            }
        }
        Ok(())
    }

    /// Row-indexed when fixed rows are configured, table scan otherwise
    pub fn metadata_layout(&self) -> Result<MetadataLayout> {
        if !self.master_meta_rows.is_empty() {
            return Ok(MetadataLayout::RowIndexed {
                rows: self.master_meta_rows.clone(),
                value_column: label_to_index(&self.master_meta_value_column),
            });
        }
        let range = CellRange::parse(self.master_meta_sheet.as_str(), &self.master_meta_range)?;
        Ok(MetadataLayout::TableScan { range })
    }

    pub fn extraction_settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            target_spreadsheet_id: self.target_sheet_id.clone(),
            source_sheet_name: self.source_sheet_name.clone(),
            source_range: self.source_range.clone(),
            target_range: self.target_range.clone(),
            skip_unreadable_sources: self.skip_unreadable_sources,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.attempts, self.retry.delay_secs)
    }
}

/// Which halves of the sync job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Both,
    Extract,
    Master,
}

impl RunMode {
    pub fn runs_extract(&self) -> bool {
        matches!(self, Self::Both | Self::Extract)
    }

    pub fn runs_master(&self) -> bool {
        matches!(self, Self::Both | Self::Master)
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "extract" => Ok(Self::Extract),
            "master" => Ok(Self::Master),
            _ => Err(format!(
                "Invalid run mode: {}. Use 'both', 'extract', or 'master'",
                s
            )),
        }
    }
}

/// Per-run overrides, from the environment or the command line.
///
/// `None` means "use the config file".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub run_mode: Option<RunMode>,
    pub only_tab: Option<String>,
    pub last_column: Option<String>,
    pub freeze: Option<bool>,
    pub max_rows: Option<u32>,
    pub chunk_size: Option<u32>,
    pub header_date: Option<String>,
}

impl RunOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let run_mode = get(ENV_RUN_MODE)
            .map(|v| v.parse::<RunMode>().map_err(LedgerError::config))
            .transpose()?;
        let freeze = get(ENV_FREEZE).map(|v| v.to_lowercase() != "false");
        let max_rows = get(ENV_MAX_ROWS)
            .map(|v| parse_number(ENV_MAX_ROWS, &v))
            .transpose()?;
        let chunk_size = get(ENV_CHUNK_SIZE)
            .map(|v| parse_number(ENV_CHUNK_SIZE, &v))
            .transpose()?;

        Ok(Self {
            run_mode,
            only_tab: get(ENV_ONLY_TAB),
            last_column: get(ENV_LAST_COL).map(|v| normalize_label(&v)),
            freeze,
            max_rows,
            chunk_size,
            header_date: get(ENV_HEADER_DATE),
        })
    }

    /// Layer `other` on top of `self`; values present in `other` win
    pub fn merge(self, other: RunOverrides) -> Self {
        Self {
            run_mode: other.run_mode.or(self.run_mode),
            only_tab: other.only_tab.or(self.only_tab),
            last_column: other.last_column.or(self.last_column),
            freeze: other.freeze.or(self.freeze),
            max_rows: other.max_rows.or(self.max_rows),
            chunk_size: other.chunk_size.or(self.chunk_size),
            header_date: other.header_date.or(self.header_date),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| LedgerError::config(format!("{} must be a non-negative integer: '{}'", key, value)))
}

/// Fully resolved parameters for the sync job
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub run_mode: RunMode,
    pub tabs: Vec<String>,
    /// Forced previous column per tab, bypassing the metadata store
    pub column_overrides: IndexMap<String, String>,
    pub header_value: String,
    pub append: AppendSettings,
}

/// Fully resolved parameters for the freeze job
#[derive(Debug, Clone)]
pub struct FreezeJobSettings {
    pub tabs: Vec<String>,
    /// Forced metadata column per tab, bypassing the metadata store
    pub column_overrides: IndexMap<String, String>,
    pub max_rows: u32,
    pub freeze: FreezeSettings,
}

impl LedgerConfig {
    /// Resolve the sync job's parameters. `header_value` is used unless an
    /// override supplies one.
    pub fn sync_settings(
        &self,
        overrides: &RunOverrides,
        header_value: String,
        show_progress: bool,
    ) -> Result<SyncSettings> {
        let tabs = restrict_tabs(&self.master_tabs, overrides.only_tab.as_deref(), false);
        let mut column_overrides: IndexMap<String, String> = self
            .master_meta_override
            .iter()
            .map(|(tab, col)| (tab.clone(), normalize_label(col)))
            .collect();
        if let Some(forced) = forced_column(&tabs, overrides)? {
            column_overrides = forced;
        }

        Ok(SyncSettings {
            run_mode: overrides.run_mode.unwrap_or_default(),
            tabs,
            column_overrides,
            header_value: overrides.header_date.clone().unwrap_or(header_value),
            append: AppendSettings {
                chunk_size: overrides.chunk_size.unwrap_or(self.master_chunk_size).max(1),
                max_rows: overrides.max_rows.unwrap_or(self.master_max_rows),
                freeze_previous: overrides.freeze.unwrap_or(self.master_freeze),
                show_progress,
            },
        })
    }

    /// Resolve the freeze job's parameters
    pub fn freeze_job_settings(&self, overrides: &RunOverrides, show_progress: bool) -> Result<FreezeJobSettings> {
        let tabs = restrict_tabs(&self.master_tabs, overrides.only_tab.as_deref(), true);
        let column_overrides = forced_column(&tabs, overrides)?.unwrap_or_default();

        Ok(FreezeJobSettings {
            tabs,
            column_overrides,
            max_rows: overrides.max_rows.unwrap_or(self.master_max_rows),
            freeze: FreezeSettings {
                chunk_size: overrides
                    .chunk_size
                    .unwrap_or(self.master_freeze_chunk_size)
                    .max(1),
                method: self.freeze_method,
                show_progress,
            },
        })
    }
}

/// Apply a single-tab restriction. The sync job only restricts within the
/// configured tabs; the freeze job may target any tab by name.
fn restrict_tabs(tabs: &[String], only_tab: Option<&str>, allow_untracked: bool) -> Vec<String> {
    match only_tab {
        Some(only) if allow_untracked => vec![only.to_string()],
        Some(only) => tabs.iter().filter(|t| t.as_str() == only).cloned().collect(),
        None => tabs.to_vec(),
    }
}

fn forced_column(tabs: &[String], overrides: &RunOverrides) -> Result<Option<IndexMap<String, String>>> {
    let Some(column) = &overrides.last_column else {
        return Ok(None);
    };
    if overrides.only_tab.is_none() || tabs.len() != 1 {
        return Err(LedgerError::config(format!(
            "{} requires {} naming a single tracked tab",
            ENV_LAST_COL, ENV_ONLY_TAB
        )));
    }
    let mut forced = IndexMap::new();
    forced.insert(tabs[0].clone(), normalize_label(column));
    Ok(Some(forced))
}
