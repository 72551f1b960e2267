//! Command implementations for sheetledger CLI

use crate::api::ApiClient;
use crate::catalog::{DatasetCatalog, DriveCatalog};
use crate::cli::{Commands, OutputFormat};
use crate::config::{LedgerConfig, RunOverrides, DEFAULT_CONFIG_PATH, ENV_CONFIG};
use crate::error::{LedgerError, Result};
use crate::grid::sheets::SheetsClient;
use crate::metadata::MetadataStore;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::selector::SourceSelector;
use crate::sync::{week_monday_header, FreezeJob, SyncJob};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub format: String,
    pub show_progress: bool,
}

/// Execute a command
pub fn execute_command(command: Commands, options: &GlobalOptions) -> Result<()> {
    let format = OutputFormat::parse(&options.format).map_err(LedgerError::invalid_input)?;
    let config = load_config(options.config.as_deref())?;
    let overrides = RunOverrides::from_env()?.merge(command.overrides());

    match command {
        Commands::Sync { .. } => sync_command(&config, &overrides, format, options.show_progress),
        Commands::Freeze { .. } => freeze_command(&config, &overrides, format, options.show_progress),
        Commands::Select { prefix, exclude } => select_command(&config, &prefix, &exclude, format),
        Commands::Meta => meta_command(&config, format),
    }
}

/// Resolve the config path: flag, then `LEDGER_CONFIG`, then `config.json`
pub fn resolve_config_path(flag: Option<&Path>, env_value: Option<String>) -> PathBuf {
    match (flag, env_value.filter(|v| !v.trim().is_empty())) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) => PathBuf::from(path.trim()),
        (None, None) => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

fn load_config(flag: Option<&Path>) -> Result<LedgerConfig> {
    let path = resolve_config_path(flag, std::env::var(ENV_CONFIG).ok());
    log::debug!("Loading config from {}", path.display());
    LedgerConfig::load(&path)
}

fn drive_catalog(config: &LedgerConfig, api: ApiClient) -> Result<DriveCatalog> {
    if config.drive_folder_id.trim().is_empty() {
        return Err(LedgerError::config("drive_folder_id is required to list source datasets"));
    }
    Ok(DriveCatalog::new(api, config.drive_folder_id.clone()))
}

/// Extraction then master append, retried as a whole
fn sync_command(config: &LedgerConfig, overrides: &RunOverrides, format: OutputFormat, show_progress: bool) -> Result<()> {
    let header = week_monday_header(Utc::now(), config.header_utc_offset_hours);
    let settings = config.sync_settings(overrides, header, show_progress)?;
    log::info!(
        "Run mode: {:?}, tabs: {:?}, header: {}, freeze: {}",
        settings.run_mode,
        settings.tabs,
        settings.header_value,
        settings.append.freeze_previous
    );

    let api = ApiClient::from_env(config.http_timeout_secs)?;
    let grid = SheetsClient::new(api.clone());
    let needs_catalog = settings.run_mode.runs_extract() && !config.mappings.is_empty();
    let catalog: Box<dyn DatasetCatalog> = if needs_catalog {
        Box::new(drive_catalog(config, api)?)
    } else {
        Box::new(Vec::new())
    };

    let policy = config.retry_policy();
    let report = policy.run(|attempt| {
        log::info!("Sync attempt {}/{}", attempt, policy.attempts);
        SyncJob::new(&grid, catalog.as_ref(), config, &settings).run()
    })?;

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_sync_report(&report),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }
    Ok(())
}

/// Standalone freeze of the column before each tab's latest column
fn freeze_command(config: &LedgerConfig, overrides: &RunOverrides, format: OutputFormat, show_progress: bool) -> Result<()> {
    let settings = config.freeze_job_settings(overrides, show_progress)?;
    log::info!(
        "Freeze tabs: {:?}, method: {:?}, chunk: {}",
        settings.tabs,
        settings.freeze.method,
        settings.freeze.chunk_size
    );

    let grid = SheetsClient::new(ApiClient::from_env(config.http_timeout_secs)?);

    let policy = config.retry_policy();
    let report = policy.run(|attempt| {
        log::info!("Freeze attempt {}/{}", attempt, policy.attempts);
        FreezeJob::new(&grid, config, &settings).run()
    })?;

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_freeze_report(&report),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }
    Ok(())
}

/// Show the dataset the extraction stage would pick for `prefix`
fn select_command(config: &LedgerConfig, prefix: &str, exclude: &[String], format: OutputFormat) -> Result<()> {
    let api = ApiClient::from_env(config.http_timeout_secs)?;
    let candidates = drive_catalog(config, api)?.list_datasets()?;
    let selection = SourceSelector::default().select(&candidates, prefix, exclude);

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_selection(prefix, selection.as_ref()),
        OutputFormat::Json => println!("{}", JsonFormatter::format_selection(prefix, selection.as_ref())?),
    }
    Ok(())
}

/// Show the recorded last column of every tracked tab
fn meta_command(config: &LedgerConfig, format: OutputFormat) -> Result<()> {
    let grid = SheetsClient::new(ApiClient::from_env(config.http_timeout_secs)?);
    let store = MetadataStore::new(
        &grid,
        config.target_sheet_id.as_str(),
        config.master_meta_sheet.as_str(),
        config.metadata_layout()?,
    );
    let labels = store.read_all(&config.master_tabs)?;

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_metadata(&config.master_tabs, &labels),
        OutputFormat::Json => println!("{}", JsonFormatter::format_metadata(&config.master_tabs, &labels)?),
    }
    Ok(())
}
