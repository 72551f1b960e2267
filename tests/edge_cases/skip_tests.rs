//! Skips and up-front configuration failures

use crate::common::{sample_data, LedgerFixture, LEDGER_TAB, META_TAB, STAGING_TAB, TARGET};
use serde_json::json;
use sheetledger::catalog::CandidateDataset;
use sheetledger::chunk::SkipReason;
use sheetledger::error::EXIT_CONFIG;
use sheetledger::extract::ExtractOutcome;
use sheetledger::grid::memory::CallKind;
use sheetledger::sync::SyncReport;
use sheetledger::{AppendOutcome, LedgerConfig, LedgerError, Result, RunMode, RunOverrides, SyncJob};

fn run(fixture: &LedgerFixture, config: &LedgerConfig, mode: RunMode, catalog: &[CandidateDataset]) -> Result<SyncReport> {
    let overrides = RunOverrides {
        run_mode: Some(mode),
        ..Default::default()
    };
    let settings = config.sync_settings(&overrides, "2024-12-02".to_string(), false)?;
    let catalog = catalog.to_vec();
    SyncJob::new(&fixture.grid, &catalog, config, &settings).run()
}

fn writes(fixture: &LedgerFixture) -> usize {
    fixture
        .grid
        .calls()
        .iter()
        .filter(|c| !matches!(c.kind, CallKind::GetValues(_) | CallKind::GetStructure))
        .count()
}

#[test]
fn test_missing_ledger_tab_fails_before_writing() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.add_source("src-1202", 7);
    let config = fixture.config_with(json!({"master_tabs": ["Prices", "Orders"]}));

    let err = run(&fixture, &config, RunMode::Both, &sample_data::price_candidates()).unwrap_err();

    assert!(matches!(err, LedgerError::TabMissing { ref tab } if tab == "Orders"));
    assert_eq!(err.exit_code(), EXIT_CONFIG);
    assert_eq!(writes(&fixture), 0, "nothing may be written before validation");
    assert_eq!(fixture.meta_label(), "J");
}

#[test]
fn test_structural_error_is_not_retried() {
    let fixture = LedgerFixture::prices().unwrap();
    let config = fixture.config_with(json!({"master_tabs": ["Orders"]}));

    let mut attempts = 0;
    let err = config
        .retry_policy()
        .run(|_| {
            attempts += 1;
            run(&fixture, &config, RunMode::Master, &[])
        })
        .unwrap_err();

    assert_eq!(attempts, 1);
    assert!(matches!(err, LedgerError::TabMissing { .. }));
}

#[test]
fn test_missing_metadata_is_fatal() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.grid.set_value(TARGET, META_TAB, "B2", "");
    let config = fixture.config();

    let err = run(&fixture, &config, RunMode::Master, &[]).unwrap_err();

    assert!(matches!(err, LedgerError::MetadataMissing { ref tab } if tab == LEDGER_TAB));
    assert_eq!(err.exit_code(), EXIT_CONFIG);
    assert_eq!(fixture.grid.column_count(TARGET, LEDGER_TAB), Some(10));
}

#[test]
fn test_header_only_tab_is_skipped() {
    let fixture = LedgerFixture::new(1, 10).unwrap();
    let config = fixture.config();
    fixture.grid.clear_calls();

    let report = run(&fixture, &config, RunMode::Master, &[]).unwrap();

    let record = &report.appended[0];
    assert_eq!(
        record.outcome,
        AppendOutcome::Skipped {
            column: "J".to_string(),
            reason: SkipReason::NoDataRows,
        }
    );
    assert!(!record.metadata_updated);
    assert_eq!(fixture.meta_label(), "J");
    assert_eq!(writes(&fixture), 0);
}

#[test]
fn test_unparseable_label_is_skipped() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.grid.set_value(TARGET, META_TAB, "B2", "1");
    let config = fixture.config();

    let report = run(&fixture, &config, RunMode::Master, &[]).unwrap();

    assert!(matches!(
        report.appended[0].outcome,
        AppendOutcome::Skipped { reason: SkipReason::InvalidColumn, .. }
    ));
    assert!(!report.appended[0].metadata_updated);
    assert_eq!(fixture.meta_label(), "1");
    assert_eq!(fixture.grid.column_count(TARGET, LEDGER_TAB), Some(10));
}

#[test]
fn test_overlong_label_is_skipped() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.grid.set_value(TARGET, META_TAB, "B2", "LASTCOLUMN");
    let config = fixture.config();
    fixture.grid.clear_calls();

    let report = run(&fixture, &config, RunMode::Master, &[]).unwrap();

    assert_eq!(
        report.appended[0].outcome,
        AppendOutcome::Skipped {
            column: "LASTCOLUMN".to_string(),
            reason: SkipReason::InvalidColumn,
        }
    );
    assert!(!report.appended[0].metadata_updated);
    assert_eq!(writes(&fixture), 0);
    assert_eq!(fixture.meta_label(), "LASTCOLUMN");
}

#[test]
fn test_no_candidate_does_not_block_the_ledger() {
    let fixture = LedgerFixture::prices().unwrap();
    let config = fixture.config();
    let staging_before = fixture.grid.snapshot(TARGET, STAGING_TAB);
    let unrelated = vec![CandidateDataset::new("src-x", "stock_241202")];

    let report = run(&fixture, &config, RunMode::Both, &unrelated).unwrap();

    assert_eq!(report.extracted[0].outcome, ExtractOutcome::NoCandidate);
    assert_eq!(fixture.grid.snapshot(TARGET, STAGING_TAB), staging_before);
    assert!(report.appended[0].metadata_updated);
    assert_eq!(fixture.meta_label(), "K");
}

#[test]
fn test_only_tab_outside_tracked_tabs_does_nothing() {
    let fixture = LedgerFixture::prices().unwrap();
    let config = fixture.config();
    let overrides = RunOverrides {
        run_mode: Some(RunMode::Master),
        only_tab: Some("Orders".to_string()),
        ..Default::default()
    };
    let settings = config.sync_settings(&overrides, "2024-12-02".to_string(), false).unwrap();
    let catalog: Vec<CandidateDataset> = Vec::new();

    let report = SyncJob::new(&fixture.grid, &catalog, &config, &settings).run().unwrap();

    assert!(report.appended.is_empty());
    assert_eq!(fixture.meta_label(), "J");
}

#[test]
fn test_forced_column_requires_single_tab() {
    let fixture = LedgerFixture::prices().unwrap();
    let config = fixture.config();
    let overrides = RunOverrides {
        last_column: Some("H".to_string()),
        ..Default::default()
    };

    let err = config.sync_settings(&overrides, "2024-12-02".to_string(), false).unwrap_err();
    assert!(matches!(err, LedgerError::Config { .. }));
}
