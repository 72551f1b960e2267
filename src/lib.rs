//! # sheetledger
//!
//! Keeps spreadsheet ledgers rolling: picks the latest source dataset for each
//! staging tab, then appends one dated column per ledger tab in bounded row
//! chunks and freezes the column it replaces.

pub mod api;
pub mod append;
pub mod catalog;
pub mod chunk;
pub mod cli;
pub mod column;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod freeze;
pub mod grid;
pub mod metadata;
pub mod output;
pub mod progress;
pub mod range;
pub mod retry;
pub mod selector;
pub mod sync;

pub use append::{AppendEngine, AppendOutcome, AppendPlan, AppendSettings};
pub use config::{LedgerConfig, RunMode, RunOverrides};
pub use error::{LedgerError, Result};
pub use freeze::{FreezeEngine, FreezeMethod, FreezeOutcome, FreezeSettings};
pub use grid::GridClient;
pub use metadata::{MetadataLayout, MetadataStore};
pub use selector::SourceSelector;
pub use sync::{FreezeJob, SyncJob};
