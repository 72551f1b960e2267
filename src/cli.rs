//! Command-line interface for sheetledger

use crate::column::{column_index, normalize_label};
use crate::config::{RunMode, RunOverrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetledger")]
#[command(about = "A rolling-window ledger synchronizer for shared spreadsheets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to $LEDGER_CONFIG, then config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: "pretty", "json"
    #[arg(long, global = true, default_value = "pretty")]
    pub format: String,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh staging tabs and append this week's column to every ledger tab
    Sync {
        /// Which stages run: "both", "extract", or "master"
        #[arg(long, value_parser = parse_run_mode)]
        mode: Option<RunMode>,

        /// Restrict the run to one tracked tab
        #[arg(long)]
        only_tab: Option<String>,

        /// Force the previous column instead of reading master meta (needs --only-tab)
        #[arg(long, value_parser = parse_column_label)]
        last_col: Option<String>,

        /// Freeze the previous column while appending
        #[arg(long, conflicts_with = "no_freeze")]
        freeze: bool,

        /// Leave the previous column's formulas in place
        #[arg(long)]
        no_freeze: bool,

        /// Ceiling on rows processed per tab (0 for no ceiling)
        #[arg(long)]
        max_rows: Option<u32>,

        /// Rows per append request (must be > 0)
        #[arg(long, value_parser = validate_chunk_size)]
        chunk_size: Option<u32>,

        /// Header value for the new column instead of this week's Monday
        #[arg(long)]
        header_date: Option<String>,
    },

    /// Replace formulas in the column before each tab's latest column with their values
    Freeze {
        /// Freeze a single tab
        #[arg(long)]
        only_tab: Option<String>,

        /// Force the latest column instead of reading master meta (needs --only-tab)
        #[arg(long, value_parser = parse_column_label)]
        last_col: Option<String>,

        /// Ceiling on rows processed per tab (0 for no ceiling)
        #[arg(long)]
        max_rows: Option<u32>,

        /// Rows per freeze request (must be > 0)
        #[arg(long, value_parser = validate_chunk_size)]
        chunk_size: Option<u32>,
    },

    /// Show which source dataset would be picked for a prefix
    Select {
        /// Dataset name prefix
        #[arg(long)]
        prefix: String,

        /// Names starting with this prefix are never picked (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Show the recorded last column of every tracked tab
    Meta,
}

impl Commands {
    /// Overrides carried by this command's flags. Unset flags are `None` so
    /// the environment and config file still apply.
    pub fn overrides(&self) -> RunOverrides {
        match self {
            Commands::Sync {
                mode,
                only_tab,
                last_col,
                freeze,
                no_freeze,
                max_rows,
                chunk_size,
                header_date,
            } => RunOverrides {
                run_mode: *mode,
                only_tab: only_tab.clone(),
                last_column: last_col.clone(),
                freeze: match (freeze, no_freeze) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                max_rows: *max_rows,
                chunk_size: *chunk_size,
                header_date: header_date.clone(),
            },
            Commands::Freeze {
                only_tab,
                last_col,
                max_rows,
                chunk_size,
            } => RunOverrides {
                only_tab: only_tab.clone(),
                last_column: last_col.clone(),
                max_rows: *max_rows,
                chunk_size: *chunk_size,
                ..Default::default()
            },
            Commands::Select { .. } | Commands::Meta => RunOverrides::default(),
        }
    }
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

fn parse_run_mode(s: &str) -> Result<RunMode, String> {
    s.parse()
}

/// Accept a column label in any case, e.g. "j" or "AB"
fn parse_column_label(s: &str) -> Result<String, String> {
    let label = normalize_label(s);
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_uppercase()) || column_index(&label).is_none() {
        return Err(format!("Invalid column label: '{}'", s));
    }
    Ok(label)
}

/// Validate that chunk size is greater than 0
fn validate_chunk_size(s: &str) -> Result<u32, String> {
    let chunk_size: u32 = s
        .parse()
        .map_err(|_| format!("Invalid chunk size: '{}'. Must be a positive integer.", s))?;

    if chunk_size == 0 {
        return Err("Chunk size must be greater than 0".to_string());
    }

    Ok(chunk_size)
}
