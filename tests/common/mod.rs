//! Common test utilities and helpers

use sheetledger::column::index_to_label;
use sheetledger::grid::memory::{Cell, MemoryGrid};
use sheetledger::{LedgerConfig, Result};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Spreadsheet holding the ledger, staging and metadata tabs
pub const TARGET: &str = "target";

pub const LEDGER_TAB: &str = "Prices";
pub const STAGING_TAB: &str = "Staging";
pub const META_TAB: &str = "Master_Meta";

/// Test fixture: an in-memory grid with one ledger tab whose last column
/// holds live formulas over the staging tab
pub struct LedgerFixture {
    pub temp_dir: TempDir,
    pub grid: MemoryGrid,
    pub rows: u32,
    pub columns: u32,
}

impl LedgerFixture {
    /// Ledger of `rows` rows (header included) and `columns` columns; the
    /// metadata table records the last column as current.
    pub fn new(rows: u32, columns: u32) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let grid = MemoryGrid::new();

        grid.add_sheet(TARGET, STAGING_TAB, rows, 5);
        grid.set_value(TARGET, STAGING_TAB, "A1", "price");
        for row in 2..=rows {
            grid.set_value(TARGET, STAGING_TAB, &format!("A{}", row), row * 10);
        }

        grid.add_sheet(TARGET, LEDGER_TAB, rows, columns);
        grid.set_value(TARGET, LEDGER_TAB, "A1", "item");
        for column in 2..=columns {
            let label = index_to_label(column);
            grid.set_value(TARGET, LEDGER_TAB, &format!("{}1", label), format!("2024-10-{:02}", column));
            for row in 2..=rows {
                let a1 = format!("{}{}", label, row);
                if column == columns {
                    grid.set_formula(TARGET, LEDGER_TAB, &a1, &format!("={}!A{}", STAGING_TAB, row));
                } else {
                    grid.set_value(TARGET, LEDGER_TAB, &a1, column * 1000 + row);
                }
            }
        }
        for row in 2..=rows {
            grid.set_value(TARGET, LEDGER_TAB, &format!("A{}", row), format!("item-{}", row));
        }

        grid.add_sheet(TARGET, META_TAB, 10, 2);
        grid.set_value(TARGET, META_TAB, "A1", "tab");
        grid.set_value(TARGET, META_TAB, "B1", "last_column");
        grid.set_value(TARGET, META_TAB, "A2", LEDGER_TAB);
        grid.set_value(TARGET, META_TAB, "B2", index_to_label(columns));

        Ok(Self {
            temp_dir,
            grid,
            rows,
            columns,
        })
    }

    /// The scenario most tests start from: 50 rows, columns A..J
    pub fn prices() -> Result<Self> {
        Self::new(50, 10)
    }

    pub fn config(&self) -> LedgerConfig {
        LedgerConfig::from_json(&sample_data::config_json().to_string()).expect("fixture config is valid")
    }

    pub fn config_with(&self, patch: serde_json::Value) -> LedgerConfig {
        let mut json = sample_data::config_json();
        if let (Some(base), Some(extra)) = (json.as_object_mut(), patch.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        LedgerConfig::from_json(&json.to_string()).expect("fixture config is valid")
    }

    /// Write a config file into the fixture's temp directory
    pub fn write_config(&self, name: &str, content: &serde_json::Value) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(content)?)?;
        Ok(path)
    }

    /// Add a source spreadsheet whose export tab has `price` values of
    /// `row * scale` for every ledger row
    pub fn add_source(&self, spreadsheet_id: &str, scale: u32) {
        self.grid.add_sheet(spreadsheet_id, "Export", self.rows, 3);
        self.grid.set_value(spreadsheet_id, "Export", "A1", "price");
        for row in 2..=self.rows {
            self.grid
                .set_value(spreadsheet_id, "Export", &format!("A{}", row), row * scale);
        }
    }

    pub fn meta_label(&self) -> String {
        sheetledger::grid::cell_text(&self.grid.value(TARGET, META_TAB, "B2"))
    }

    pub fn ledger_cell(&self, a1: &str) -> Option<Cell> {
        self.grid.cell(TARGET, LEDGER_TAB, a1)
    }
}

/// Sample configurations and datasets
pub mod sample_data {
    use chrono::{TimeZone, Utc};
    use sheetledger::catalog::CandidateDataset;

    pub fn config_json() -> serde_json::Value {
        serde_json::json!({
            "drive_folder_id": "drive",
            "target_sheet_id": super::TARGET,
            "source_sheet_name": "Export",
            "mappings": [
                {"prefix": "prices_", "target_tab": super::STAGING_TAB, "exclude_prefixes": ["prices_old"]}
            ],
            "master_tabs": [super::LEDGER_TAB],
            "master_chunk_size": 20,
            "retry": {"attempts": 3, "delay_secs": 0}
        })
    }

    /// Candidates where the name timestamp picks `prices_241202`
    pub fn price_candidates() -> Vec<CandidateDataset> {
        vec![
            CandidateDataset::new("src-1201", "prices_241201"),
            CandidateDataset::new("src-1202", "prices_241202"),
            CandidateDataset::new("src-1130", "prices_241130")
                .modified(Utc.with_ymd_and_hms(2024, 12, 5, 0, 0, 0).unwrap()),
            CandidateDataset::new("src-old", "prices_old_241231"),
        ]
    }
}

/// Common assertions over the in-memory grid
pub mod assertions {
    use super::{LedgerFixture, LEDGER_TAB, STAGING_TAB, TARGET};
    use sheetledger::grid::cell_text;
    use sheetledger::grid::memory::Cell;

    /// Every data row of `label` holds the staging formula for that row
    pub fn assert_live_formulas(fixture: &LedgerFixture, label: &str) {
        for row in 2..=fixture.rows {
            let a1 = format!("{}{}", label, row);
            assert_eq!(
                fixture.grid.cell(TARGET, LEDGER_TAB, &a1),
                Some(Cell::Formula(format!("={}!A{}", STAGING_TAB, row))),
                "expected live formula at {}",
                a1
            );
        }
    }

    /// Every data row of `label` holds a literal equal to `row * scale`
    pub fn assert_frozen_values(fixture: &LedgerFixture, label: &str, scale: u32) {
        for row in 2..=fixture.rows {
            let a1 = format!("{}{}", label, row);
            match fixture.grid.cell(TARGET, LEDGER_TAB, &a1) {
                Some(Cell::Literal(value)) => assert_eq!(
                    cell_text(&value),
                    (row * scale).to_string(),
                    "unexpected frozen value at {}",
                    a1
                ),
                other => panic!("expected literal at {}, found {:?}", a1, other),
            }
        }
    }
}

// Re-export commonly used items
pub use assertions::*;
pub use sample_data::*;
