//! Integration tests for the master meta store

use crate::common::{LedgerFixture, META_TAB, TARGET};
use indexmap::IndexMap;
use serde_json::json;
use sheetledger::grid::memory::{CallKind, Cell};
use sheetledger::grid::InputMode;
use sheetledger::range::CellRange;
use sheetledger::{MetadataLayout, MetadataStore};

fn table_layout() -> MetadataLayout {
    MetadataLayout::TableScan {
        range: CellRange::parse(META_TAB, "A1:B10").unwrap(),
    }
}

fn row_layout() -> MetadataLayout {
    let mut rows = IndexMap::new();
    rows.insert("Prices".to_string(), 4);
    rows.insert("Stock".to_string(), 5);
    MetadataLayout::RowIndexed { rows, value_column: 2 }
}

#[test]
fn test_table_scan_read_and_write() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.grid.set_value(TARGET, META_TAB, "A3", "Stock");
    fixture.grid.set_value(TARGET, META_TAB, "B3", " c ");
    let store = MetadataStore::new(&fixture.grid, TARGET, META_TAB, table_layout());

    let tabs = vec!["Prices".to_string(), "Stock".to_string(), "Orders".to_string()];
    let labels = store.read_all(&tabs).unwrap();
    assert_eq!(labels.get("Prices").map(String::as_str), Some("J"));
    assert_eq!(labels.get("Stock").map(String::as_str), Some("C"));
    assert!(!labels.contains_key("Orders"));

    assert!(store.set_last_column("Stock", "D").unwrap());
    assert_eq!(fixture.grid.cell(TARGET, META_TAB, "B3"), Some(Cell::Literal(json!("D"))));
    assert_eq!(store.get_last_column("Stock").unwrap().as_deref(), Some("D"));
    assert_eq!(store.get_last_column("Prices").unwrap().as_deref(), Some("J"));
}

#[test]
fn test_table_scan_ignores_header_row() {
    let fixture = LedgerFixture::prices().unwrap();
    let store = MetadataStore::new(&fixture.grid, TARGET, META_TAB, table_layout());

    assert_eq!(store.get_last_column("tab").unwrap(), None);
}

#[test]
fn test_table_scan_unknown_tab_is_not_inserted() {
    let fixture = LedgerFixture::prices().unwrap();
    let store = MetadataStore::new(&fixture.grid, TARGET, META_TAB, table_layout());
    let before = fixture.grid.snapshot(TARGET, META_TAB);

    assert!(!store.set_last_column("Orders", "E").unwrap());
    assert_eq!(fixture.grid.snapshot(TARGET, META_TAB), before);
}

#[test]
fn test_row_indexed_read_and_write() {
    let fixture = LedgerFixture::prices().unwrap();
    fixture.grid.set_value(TARGET, META_TAB, "B4", "k");
    let store = MetadataStore::new(&fixture.grid, TARGET, META_TAB, row_layout());

    let labels = store
        .read_all(&["Prices".to_string(), "Stock".to_string()])
        .unwrap();
    assert_eq!(labels.get("Prices").map(String::as_str), Some("K"));
    assert!(!labels.contains_key("Stock"));

    fixture.grid.clear_calls();
    assert!(store.set_last_column("Stock", "F").unwrap());
    let calls = fixture.grid.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::UpdateValues(InputMode::Raw));
    assert_eq!(calls[0].target, "'Master_Meta'!B5");

    assert!(!store.set_last_column("Orders", "F").unwrap());
}

#[test]
fn test_formula_text_is_stored_raw() {
    let fixture = LedgerFixture::prices().unwrap();
    let store = MetadataStore::new(&fixture.grid, TARGET, META_TAB, table_layout());

    store.set_last_column("Prices", "=K").unwrap();
    assert_eq!(fixture.grid.cell(TARGET, META_TAB, "B2"), Some(Cell::Literal(json!("=K"))));
}
