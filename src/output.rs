//! Output formatting utilities

use crate::append::AppendOutcome;
use crate::error::Result;
use crate::extract::ExtractOutcome;
use crate::freeze::FreezeOutcome;
use crate::selector::Selection;
use crate::sync::{FreezeReport, SyncReport};
use indexmap::IndexMap;

/// Pretty printer for sheetledger output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print what a sync run did
    pub fn print_sync_report(report: &SyncReport) {
        if !report.extracted.is_empty() {
            println!("📥 Extraction");
            for (i, record) in report.extracted.iter().enumerate() {
                let prefix = tree_prefix(i, report.extracted.len());
                match &record.outcome {
                    ExtractOutcome::Synced { source, reason, rows } => println!(
                        "{} ✅ {} → {}: {} ({} rows, {})",
                        prefix, record.prefix, record.target_tab, source, rows, reason
                    ),
                    ExtractOutcome::NoCandidate => {
                        println!("{} ⏭️  {} → {}: no matching file", prefix, record.prefix, record.target_tab)
                    }
                    ExtractOutcome::SourceUnreadable { source, error } => println!(
                        "{} ⚠️  {} → {}: {} unreadable ({})",
                        prefix, record.prefix, record.target_tab, source, error
                    ),
                }
            }
        }

        if !report.appended.is_empty() {
            println!("📒 Ledger");
            for (i, record) in report.appended.iter().enumerate() {
                let prefix = tree_prefix(i, report.appended.len());
                match &record.outcome {
                    AppendOutcome::Appended {
                        column,
                        header,
                        chunks,
                        expanded,
                    } => {
                        println!(
                            "{} ✅ {}: {} → {} ({}, {} chunks{})",
                            prefix,
                            record.tab,
                            record.previous_column,
                            column,
                            header,
                            chunks,
                            if *expanded { ", expanded" } else { "" }
                        );
                        if !record.metadata_updated {
                            println!("   └─ master meta not updated");
                        }
                    }
                    AppendOutcome::Skipped { column, reason } => {
                        println!("{} ⏭️  {}: skipped at {} ({})", prefix, record.tab, column, reason)
                    }
                }
            }
        }

        if report.extracted.is_empty() && report.appended.is_empty() {
            println!("Nothing to do.");
        }
    }

    /// Print what a freeze run did
    pub fn print_freeze_report(report: &FreezeReport) {
        if report.frozen.is_empty() {
            println!("Nothing to freeze.");
            return;
        }

        println!("🧊 Freeze");
        for (i, record) in report.frozen.iter().enumerate() {
            let prefix = tree_prefix(i, report.frozen.len());
            match &record.outcome {
                FreezeOutcome::Frozen { column, rows, chunks } => println!(
                    "{} ✅ {}: {} frozen ({} rows, {} chunks)",
                    prefix, record.tab, column, rows, chunks
                ),
                FreezeOutcome::Skipped { column, reason } => {
                    println!("{} ⏭️  {}: skipped at {} ({})", prefix, record.tab, column, reason)
                }
            }
        }
    }

    /// Print the selected dataset for a prefix
    pub fn print_selection(prefix: &str, selection: Option<&Selection<'_>>) {
        match selection {
            Some(selection) => {
                println!("📄 Latest for '{}'", prefix);
                println!("├─ Name: {}", selection.dataset.name);
                println!("├─ Id: {}", selection.dataset.id);
                println!("└─ Reason: {}", selection.reason);
            }
            None => println!("No file found for prefix: {}", prefix),
        }
    }

    /// Print the master meta map
    pub fn print_metadata(tabs: &[String], labels: &IndexMap<String, String>) {
        if tabs.is_empty() {
            println!("No tracked tabs.");
            return;
        }

        println!("🗂️  Master meta");
        for (i, tab) in tabs.iter().enumerate() {
            let prefix = tree_prefix(i, tabs.len());
            match labels.get(tab) {
                Some(label) => println!("{} {}: {}", prefix, tab, label),
                None => println!("{} {}: (missing)", prefix, tab),
            }
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_selection(prefix: &str, selection: Option<&Selection<'_>>) -> Result<String> {
        let json = match selection {
            Some(selection) => serde_json::json!({
                "prefix": prefix,
                "selected": selection.dataset,
                "reason": selection.reason.to_string(),
            }),
            None => serde_json::json!({
                "prefix": prefix,
                "selected": null,
            }),
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_metadata(tabs: &[String], labels: &IndexMap<String, String>) -> Result<String> {
        let entries: Vec<_> = tabs
            .iter()
            .map(|tab| {
                serde_json::json!({
                    "tab": tab,
                    "last_column": labels.get(tab),
                })
            })
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└─"
    } else {
        "├─"
    }
}
