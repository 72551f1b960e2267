//! Integration tests for the extraction stage

use crate::common::{sample_data, LedgerFixture, STAGING_TAB, TARGET};
use serde_json::json;
use sheetledger::config::SourceMapping;
use sheetledger::extract::{ExtractOutcome, ExtractionStage};
use sheetledger::grid::memory::{CallKind, Cell};
use sheetledger::grid::GridClient;
use sheetledger::{LedgerError, SourceSelector};

fn mapping(target_tab: &str) -> SourceMapping {
    SourceMapping {
        prefix: "prices_".to_string(),
        target_tab: target_tab.to_string(),
        exclude_prefixes: vec!["prices_old".to_string()],
    }
}

#[test]
fn test_latest_source_replaces_staging() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.add_source("src-1202", 7);
    fixture.grid.set_value(TARGET, STAGING_TAB, "C3", "stale");

    let config = fixture.config();
    let settings = config.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let structure = fixture.grid.get_structure(TARGET).unwrap();

    let outcome = stage
        .run_mapping(&mapping(STAGING_TAB), &sample_data::price_candidates(), &structure)
        .unwrap();

    assert_eq!(
        outcome,
        ExtractOutcome::Synced {
            source: "prices_241202".to_string(),
            reason: "name_timestamp=2024-12-02 00:00:00".to_string(),
            rows: 50,
        }
    );
    assert_eq!(
        fixture.grid.cell(TARGET, STAGING_TAB, "A2"),
        Some(Cell::Literal(json!("14")))
    );
    assert_eq!(fixture.grid.cell(TARGET, STAGING_TAB, "C3"), None);
}

#[test]
fn test_clear_precedes_write() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.add_source("src-1202", 7);
    let config = fixture.config();
    let settings = config.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let structure = fixture.grid.get_structure(TARGET).unwrap();
    fixture.grid.clear_calls();

    stage
        .run_mapping(&mapping(STAGING_TAB), &sample_data::price_candidates(), &structure)
        .unwrap();

    let kinds: Vec<(String, CallKind)> = fixture
        .grid
        .calls()
        .into_iter()
        .map(|c| (c.spreadsheet_id, c.kind))
        .collect();
    assert_eq!(kinds.len(), 3);
    assert_eq!(kinds[0].0, "src-1202");
    assert_eq!(kinds[1], (TARGET.to_string(), CallKind::ClearValues));
    assert!(matches!(kinds[2].1, CallKind::UpdateValues(_)));
}

#[test]
fn test_no_candidate_skips_mapping() {
    let fixture = LedgerFixture::prices().unwrap();
    let config = fixture.config();
    let settings = config.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let structure = fixture.grid.get_structure(TARGET).unwrap();
    let before = fixture.grid.snapshot(TARGET, STAGING_TAB);

    let outcome = stage.run_mapping(&mapping(STAGING_TAB), &[], &structure).unwrap();
    assert_eq!(outcome, ExtractOutcome::NoCandidate);
    assert_eq!(fixture.grid.snapshot(TARGET, STAGING_TAB), before);
}

#[test]
fn test_missing_staging_tab_is_fatal() {
    let fixture = LedgerFixture::prices().unwrap();
    let config = fixture.config();
    let settings = config.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let structure = fixture.grid.get_structure(TARGET).unwrap();

    let err = stage
        .run_mapping(&mapping("Missing"), &sample_data::price_candidates(), &structure)
        .unwrap_err();
    assert!(matches!(err, LedgerError::TabMissing { ref tab } if tab == "Missing"));
    assert!(!err.is_retryable());
}

#[test]
fn test_empty_source_clears_without_writing() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.grid.add_sheet("src-1202", "Export", 10, 3);
    let config = fixture.config();
    let settings = config.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let structure = fixture.grid.get_structure(TARGET).unwrap();
    fixture.grid.clear_calls();

    let outcome = stage
        .run_mapping(&mapping(STAGING_TAB), &sample_data::price_candidates(), &structure)
        .unwrap();

    assert!(matches!(outcome, ExtractOutcome::Synced { rows: 0, .. }));
    assert!(fixture.grid.snapshot(TARGET, STAGING_TAB).is_empty());
    assert!(fixture
        .grid
        .calls()
        .iter()
        .all(|c| !matches!(c.kind, CallKind::UpdateValues(_))));
}

#[test]
fn test_unreadable_source_propagates_unless_downgraded() {
    let fixture = LedgerFixture::prices().unwrap();
    let structure = fixture.grid.get_structure(TARGET).unwrap();

    // No spreadsheet "src-1202" exists in the grid
    let config = fixture.config();
    let settings = config.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let err = stage
        .run_mapping(&mapping(STAGING_TAB), &sample_data::price_candidates(), &structure)
        .unwrap_err();
    assert!(err.is_retryable());

    let lenient = fixture.config_with(json!({"skip_unreadable_sources": true}));
    let settings = lenient.extraction_settings();
    let stage = ExtractionStage::new(&fixture.grid, SourceSelector::default(), &settings);
    let outcome = stage
        .run_mapping(&mapping(STAGING_TAB), &sample_data::price_candidates(), &structure)
        .unwrap();
    assert!(matches!(outcome, ExtractOutcome::SourceUnreadable { ref source, .. } if source == "prices_241202"));
}
