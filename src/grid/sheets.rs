//! [`GridClient`] backed by the Google Sheets v4 REST API

use super::{GridClient, GridSpan, InputMode, RenderMode, SheetProperties, StructuralUpdate, ValueRows};
use crate::api::{parse_url, ApiClient};
use crate::error::{LedgerError, Result};
use crate::range::CellRange;
use indexmap::IndexMap;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const STRUCTURE_FIELDS: &str =
    "sheets.properties(title,sheetId,gridProperties.rowCount,gridProperties.columnCount)";

#[derive(Debug, Clone)]
pub struct SheetsClient {
    api: ApiClient,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    #[serde(default)]
    properties: SheetPropertiesResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetPropertiesResponse {
    title: Option<String>,
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    grid_properties: GridPropertiesResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridPropertiesResponse {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: ValueRows,
}

impl SheetsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = parse_url(SHEETS_BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| LedgerError::config("Sheets base URL cannot carry a path"))?
            .extend(segments);
        Ok(url)
    }

    fn batch(&self, spreadsheet_id: &str, requests: Vec<serde_json::Value>) -> Result<()> {
        let url = self.url(&[&format!("{}:batchUpdate", spreadsheet_id)])?;
        self.api
            .send(self.api.post(url).json(&json!({ "requests": requests })))
    }
}

impl GridClient for SheetsClient {
    fn get_structure(&self, spreadsheet_id: &str) -> Result<IndexMap<String, SheetProperties>> {
        let url = self.url(&[spreadsheet_id])?;
        let response: SpreadsheetResponse = self
            .api
            .send_json(self.api.get(url).query(&[("fields", STRUCTURE_FIELDS)]))?;

        let mut tabs = IndexMap::new();
        for entry in response.sheets {
            let props = entry.properties;
            let Some(title) = props.title else { continue };
            tabs.insert(
                title.clone(),
                SheetProperties {
                    title,
                    sheet_id: props.sheet_id,
                    row_count: props.grid_properties.row_count,
                    column_count: props.grid_properties.column_count,
                },
            );
        }
        Ok(tabs)
    }

    fn get_values(&self, spreadsheet_id: &str, range: &CellRange, render: RenderMode) -> Result<ValueRows> {
        let url = self.url(&[spreadsheet_id, "values", &range.to_a1()])?;
        let response: ValueRangeResponse = self.api.send_json(
            self.api
                .get(url)
                .query(&[("valueRenderOption", render.as_api_str())]),
        )?;
        Ok(response.values)
    }

    fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &CellRange,
        values: &ValueRows,
        input: InputMode,
    ) -> Result<()> {
        let url = self.url(&[spreadsheet_id, "values", &range.to_a1()])?;
        self.api.send(
            self.api
                .put(url)
                .query(&[("valueInputOption", input.as_api_str())])
                .json(&json!({ "values": values })),
        )
    }

    fn clear_values(&self, spreadsheet_id: &str, range: &CellRange) -> Result<()> {
        let url = self.url(&[spreadsheet_id, "values", &format!("{}:clear", range.to_a1())])?;
        self.api.send(self.api.post(url).json(&json!({})))
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: &[StructuralUpdate]) -> Result<()> {
        let requests = requests
            .iter()
            .map(|request| match request {
                StructuralUpdate::ResizeColumns {
                    sheet_id,
                    column_count,
                } => json!({
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": sheet_id,
                            "gridProperties": { "columnCount": column_count },
                        },
                        "fields": "gridProperties.columnCount",
                    }
                }),
            })
            .collect();
        self.batch(spreadsheet_id, requests)
    }

    fn copy_values(&self, spreadsheet_id: &str, source: &GridSpan, destination: &GridSpan) -> Result<()> {
        let request = json!({
            "copyPaste": {
                "source": grid_range(source),
                "destination": grid_range(destination),
                "pasteType": "PASTE_VALUES",
                "pasteOrientation": "NORMAL",
            }
        });
        self.batch(spreadsheet_id, vec![request])
    }
}

fn grid_range(span: &GridSpan) -> serde_json::Value {
    json!({
        "sheetId": span.sheet_id,
        "startRowIndex": span.start_row,
        "endRowIndex": span.end_row,
        "startColumnIndex": span.start_column,
        "endColumnIndex": span.end_column,
    })
}
