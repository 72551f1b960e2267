//! In-memory [`GridClient`] for tests and dry runs
//!
//! Cells hold either a literal value or formula text. Formula evaluation is
//! deliberately tiny: a formula that is a single cell reference
//! (`=A1`, `=Staging!B2`, `='My Tab'!$C$3`) evaluates to that cell's value, a
//! numeric formula (`=42`) to the number, anything else to `#ERROR!`.
//!
//! Every call is appended to a log and can be made to fail, so tests can
//! assert request ordering and partial-failure behaviour.

use super::{GridClient, GridSpan, InputMode, RenderMode, SheetProperties, StructuralUpdate, ValueRows};
use crate::error::{LedgerError, Result};
use crate::range::{CellRange, CellRef};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

const MAX_FORMULA_DEPTH: usize = 16;

/// Stored contents of one cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Literal(Value),
    Formula(String),
}

#[derive(Debug, Clone)]
struct MemorySheet {
    sheet_id: i64,
    row_count: u32,
    column_count: u32,
    /// Keyed by (row, column), both 1-based
    cells: BTreeMap<(u32, u32), Cell>,
}

#[derive(Debug, Clone, Default)]
struct MemorySpreadsheet {
    sheets: IndexMap<String, MemorySheet>,
}

/// Kind of request recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    GetStructure,
    GetValues(RenderMode),
    UpdateValues(InputMode),
    ClearValues,
    BatchUpdate,
    CopyValues,
}

/// One logged request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCall {
    pub spreadsheet_id: String,
    pub kind: CallKind,
    /// A1 notation of the target range, empty for structure calls
    pub target: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    spreadsheets: HashMap<String, MemorySpreadsheet>,
    calls: Vec<GridCall>,
    next_sheet_id: i64,
    /// Absolute call numbers (1-based) that fail once
    failures: Vec<usize>,
}

/// In-memory grid service
#[derive(Debug, Default)]
pub struct MemoryGrid {
    state: RefCell<MemoryState>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tab with the given grid size, returning its sheet id
    pub fn add_sheet(&self, spreadsheet_id: &str, title: &str, row_count: u32, column_count: u32) -> i64 {
        let mut state = self.state.borrow_mut();
        state.next_sheet_id += 1;
        let sheet_id = state.next_sheet_id;
        state
            .spreadsheets
            .entry(spreadsheet_id.to_string())
            .or_default()
            .sheets
            .insert(
                title.to_string(),
                MemorySheet {
                    sheet_id,
                    row_count,
                    column_count,
                    cells: BTreeMap::new(),
                },
            );
        sheet_id
    }

    /// Set a literal value at an A1 cell such as `B3`
    pub fn set_value(&self, spreadsheet_id: &str, sheet: &str, a1: &str, value: impl Into<Value>) {
        self.put_cell(spreadsheet_id, sheet, a1, Cell::Literal(value.into()));
    }

    /// Set formula text (including the leading `=`) at an A1 cell
    pub fn set_formula(&self, spreadsheet_id: &str, sheet: &str, a1: &str, formula: &str) {
        self.put_cell(spreadsheet_id, sheet, a1, Cell::Formula(formula.to_string()));
    }

    fn put_cell(&self, spreadsheet_id: &str, sheet: &str, a1: &str, cell: Cell) {
        let at = CellRef::parse(a1).unwrap_or(CellRef::new(1, 1));
        let mut state = self.state.borrow_mut();
        if let Some(tab) = state
            .spreadsheets
            .get_mut(spreadsheet_id)
            .and_then(|s| s.sheets.get_mut(sheet))
        {
            tab.cells.insert((at.row.unwrap_or(1), at.column), cell);
        }
    }

    /// Stored contents of an A1 cell
    pub fn cell(&self, spreadsheet_id: &str, sheet: &str, a1: &str) -> Option<Cell> {
        let at = CellRef::parse(a1).ok()?;
        let state = self.state.borrow();
        state
            .spreadsheets
            .get(spreadsheet_id)?
            .sheets
            .get(sheet)?
            .cells
            .get(&(at.row.unwrap_or(1), at.column))
            .cloned()
    }

    /// Evaluated value of an A1 cell (`Null` when empty)
    pub fn value(&self, spreadsheet_id: &str, sheet: &str, a1: &str) -> Value {
        let Ok(at) = CellRef::parse(a1) else {
            return Value::Null;
        };
        let state = self.state.borrow();
        match state.spreadsheets.get(spreadsheet_id) {
            Some(book) => evaluate_at(book, sheet, at.row.unwrap_or(1), at.column, 0),
            None => Value::Null,
        }
    }

    /// Current column count of a tab
    pub fn column_count(&self, spreadsheet_id: &str, sheet: &str) -> Option<u32> {
        let state = self.state.borrow();
        state
            .spreadsheets
            .get(spreadsheet_id)?
            .sheets
            .get(sheet)
            .map(|s| s.column_count)
    }

    /// Every stored cell of a tab as (A1, contents), row-major
    pub fn snapshot(&self, spreadsheet_id: &str, sheet: &str) -> Vec<(String, Cell)> {
        let state = self.state.borrow();
        let Some(tab) = state
            .spreadsheets
            .get(spreadsheet_id)
            .and_then(|s| s.sheets.get(sheet))
        else {
            return Vec::new();
        };
        tab.cells
            .iter()
            .map(|((row, column), cell)| (CellRef::new(*column, *row).to_string(), cell.clone()))
            .collect()
    }

    /// All requests made so far
    pub fn calls(&self) -> Vec<GridCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Make the `n`th request from now (1-based) fail with a transient error
    pub fn fail_after(&self, n: usize) {
        let mut state = self.state.borrow_mut();
        let at = state.calls.len() + n.max(1);
        state.failures.push(at);
    }

    fn record(&self, spreadsheet_id: &str, kind: CallKind, target: String) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(GridCall {
            spreadsheet_id: spreadsheet_id.to_string(),
            kind,
            target: target.clone(),
        });
        let number = state.calls.len();
        if let Some(pos) = state.failures.iter().position(|n| *n == number) {
            state.failures.remove(pos);
            return Err(LedgerError::remote(
                503,
                format!("injected failure on call {} ({:?} {})", number, kind, target),
            ));
        }
        Ok(())
    }
}

impl GridClient for MemoryGrid {
    fn get_structure(&self, spreadsheet_id: &str) -> Result<IndexMap<String, SheetProperties>> {
        self.record(spreadsheet_id, CallKind::GetStructure, String::new())?;
        let state = self.state.borrow();
        let book = book(&state, spreadsheet_id)?;
        Ok(book
            .sheets
            .iter()
            .map(|(title, sheet)| {
                (
                    title.clone(),
                    SheetProperties {
                        title: title.clone(),
                        sheet_id: sheet.sheet_id,
                        row_count: sheet.row_count,
                        column_count: sheet.column_count,
                    },
                )
            })
            .collect())
    }

    fn get_values(&self, spreadsheet_id: &str, range: &CellRange, render: RenderMode) -> Result<ValueRows> {
        self.record(spreadsheet_id, CallKind::GetValues(render), range.to_a1())?;
        let state = self.state.borrow();
        let book = book(&state, spreadsheet_id)?;
        let sheet = sheet(book, &range.sheet)?;

        let last_row = range.last_row().unwrap_or(sheet.row_count).min(sheet.row_count);
        let last_column = range.last_column().min(sheet.column_count);

        let mut rows: ValueRows = Vec::new();
        for row in range.first_row()..=last_row {
            let mut values: Vec<Value> = (range.first_column()..=last_column)
                .map(|column| match (render, sheet.cells.get(&(row, column))) {
                    (RenderMode::Formula, Some(Cell::Formula(text))) => Value::String(text.clone()),
                    (RenderMode::FormattedValue, _) => {
                        formatted(evaluate_at(book, &range.sheet, row, column, 0))
                    }
                    _ => evaluate_at(book, &range.sheet, row, column, 0),
                })
                .collect();
            while values.last().map(is_blank).unwrap_or(false) {
                values.pop();
            }
            rows.push(values);
        }
        while rows.last().map(|r| r.is_empty()).unwrap_or(false) {
            rows.pop();
        }
        Ok(rows)
    }

    fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &CellRange,
        values: &ValueRows,
        input: InputMode,
    ) -> Result<()> {
        self.record(spreadsheet_id, CallKind::UpdateValues(input), range.to_a1())?;
        let mut state = self.state.borrow_mut();
        let book = book_mut(&mut state, spreadsheet_id)?;
        let sheet = sheet_mut(book, &range.sheet)?;

        let first_row = range.first_row();
        let first_column = range.first_column();
        let height = values.len() as u32;
        let width = values.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        if height > 0
            && (first_row + height - 1 > sheet.row_count
                || first_column + width.max(1) - 1 > sheet.column_count)
        {
            return Err(LedgerError::remote(
                400,
                format!("Range ({}) exceeds grid limits", range),
            ));
        }

        for (dr, row_values) in values.iter().enumerate() {
            for (dc, value) in row_values.iter().enumerate() {
                let key = (first_row + dr as u32, first_column + dc as u32);
                match to_cell(value, input) {
                    Some(cell) => {
                        sheet.cells.insert(key, cell);
                    }
                    None => {
                        sheet.cells.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn clear_values(&self, spreadsheet_id: &str, range: &CellRange) -> Result<()> {
        self.record(spreadsheet_id, CallKind::ClearValues, range.to_a1())?;
        let mut state = self.state.borrow_mut();
        let book = book_mut(&mut state, spreadsheet_id)?;
        let sheet = sheet_mut(book, &range.sheet)?;

        let rows = range.first_row()..=range.last_row().unwrap_or(u32::MAX);
        let columns = range.first_column()..=range.last_column();
        sheet
            .cells
            .retain(|(row, column), _| !(rows.contains(row) && columns.contains(column)));
        Ok(())
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: &[StructuralUpdate]) -> Result<()> {
        self.record(spreadsheet_id, CallKind::BatchUpdate, String::new())?;
        let mut state = self.state.borrow_mut();
        let book = book_mut(&mut state, spreadsheet_id)?;

        for request in requests {
            match request {
                StructuralUpdate::ResizeColumns {
                    sheet_id,
                    column_count,
                } => {
                    let sheet = book
                        .sheets
                        .values_mut()
                        .find(|s| s.sheet_id == *sheet_id)
                        .ok_or_else(|| LedgerError::remote(400, format!("No grid with id: {}", sheet_id)))?;
                    sheet.column_count = *column_count;
                    sheet.cells.retain(|(_, column), _| column <= column_count);
                }
            }
        }
        Ok(())
    }

    fn copy_values(&self, spreadsheet_id: &str, source: &GridSpan, destination: &GridSpan) -> Result<()> {
        self.record(
            spreadsheet_id,
            CallKind::CopyValues,
            format!(
                "{}:R{}C{}:R{}C{}",
                source.sheet_id,
                source.start_row + 1,
                source.start_column + 1,
                source.end_row,
                source.end_column
            ),
        )?;
        let mut state = self.state.borrow_mut();
        let book = book_mut(&mut state, spreadsheet_id)?;

        let source_title = title_for(book, source.sheet_id)?;
        let dest_title = title_for(book, destination.sheet_id)?;

        let mut pasted = Vec::new();
        for row in source.start_row..source.end_row {
            for column in source.start_column..source.end_column {
                let value = evaluate_at(book, &source_title, row + 1, column + 1, 0);
                let key = (
                    destination.start_row + (row - source.start_row) + 1,
                    destination.start_column + (column - source.start_column) + 1,
                );
                pasted.push((key, value));
            }
        }

        let sheet = sheet_mut(book, &dest_title)?;
        for (key, value) in pasted {
            if is_blank(&value) {
                sheet.cells.remove(&key);
            } else {
                sheet.cells.insert(key, Cell::Literal(value));
            }
        }
        Ok(())
    }
}

fn book<'a>(state: &'a MemoryState, spreadsheet_id: &str) -> Result<&'a MemorySpreadsheet> {
    state
        .spreadsheets
        .get(spreadsheet_id)
        .ok_or_else(|| LedgerError::remote(404, format!("Requested entity was not found: {}", spreadsheet_id)))
}

fn book_mut<'a>(state: &'a mut MemoryState, spreadsheet_id: &str) -> Result<&'a mut MemorySpreadsheet> {
    state
        .spreadsheets
        .get_mut(spreadsheet_id)
        .ok_or_else(|| LedgerError::remote(404, format!("Requested entity was not found: {}", spreadsheet_id)))
}

fn sheet<'a>(book: &'a MemorySpreadsheet, title: &str) -> Result<&'a MemorySheet> {
    book.sheets
        .get(title)
        .ok_or_else(|| LedgerError::remote(400, format!("Unable to parse range: {}", title)))
}

fn sheet_mut<'a>(book: &'a mut MemorySpreadsheet, title: &str) -> Result<&'a mut MemorySheet> {
    book.sheets
        .get_mut(title)
        .ok_or_else(|| LedgerError::remote(400, format!("Unable to parse range: {}", title)))
}

fn title_for(book: &MemorySpreadsheet, sheet_id: i64) -> Result<String> {
    book.sheets
        .iter()
        .find(|(_, s)| s.sheet_id == sheet_id)
        .map(|(title, _)| title.clone())
        .ok_or_else(|| LedgerError::remote(400, format!("No grid with id: {}", sheet_id)))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn to_cell(value: &Value, input: InputMode) -> Option<Cell> {
    if is_blank(value) {
        return None;
    }
    match (input, value) {
        (InputMode::UserEntered, Value::String(s)) if s.starts_with('=') => Some(Cell::Formula(s.clone())),
        _ => Some(Cell::Literal(value.clone())),
    }
}

fn formatted(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    }
}

fn evaluate_at(book: &MemorySpreadsheet, sheet: &str, row: u32, column: u32, depth: usize) -> Value {
    let Some(tab) = book.sheets.get(sheet) else {
        return Value::String("#REF!".to_string());
    };
    match tab.cells.get(&(row, column)) {
        None => Value::Null,
        Some(Cell::Literal(value)) => value.clone(),
        Some(Cell::Formula(text)) => evaluate_formula(book, sheet, text, depth),
    }
}

fn evaluate_formula(book: &MemorySpreadsheet, sheet: &str, text: &str, depth: usize) -> Value {
    if depth >= MAX_FORMULA_DEPTH {
        return Value::String("#REF!".to_string());
    }
    let body = text.trim_start_matches('=').trim();

    if let Ok(number) = body.parse::<f64>() {
        return serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }

    let (target_sheet, reference) = match body.rsplit_once('!') {
        Some((qualifier, reference)) => {
            let name = qualifier
                .strip_prefix('\'')
                .and_then(|q| q.strip_suffix('\''))
                .map(|q| q.replace("''", "'"))
                .unwrap_or_else(|| qualifier.to_string());
            (name, reference)
        }
        None => (sheet.to_string(), body),
    };

    match CellRef::parse(reference) {
        Ok(CellRef { column, row: Some(row) }) => evaluate_at(book, &target_sheet, row, column, depth + 1),
        _ => Value::String("#ERROR!".to_string()),
    }
}
