use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{Result, ToolError};
use crate::io::SpreadsheetBackend;
use crate::io::auth::{AccessToken, ServiceAccount};
use crate::model::{CellGrid, SheetInfo, ValueRange, quote_sheet_name};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Sheets API v4 client bound to one spreadsheet.
#[derive(Debug)]
pub struct GoogleSheets {
    client: Client,
    spreadsheet_id: String,
    token: AccessToken,
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: u64,
    title: String,
}

#[derive(Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    value_input_option: &'static str,
    data: Vec<RangeBody<'a>>,
}

#[derive(Serialize)]
struct RangeBody<'a> {
    range: String,
    values: &'a CellGrid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: usize,
}

impl GoogleSheets {
    /// Authenticates and binds to `spreadsheet_id`.
    #[instrument(level = "info", skip(account))]
    pub fn connect(spreadsheet_id: &str, account: &ServiceAccount) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let token = account.fetch_token(&client)?;
        info!("authenticated with Google Sheets");
        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        })
    }

    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token.value)
            .query(query)
            .send()?;
        parse_response(response)
    }
}

impl SpreadsheetBackend for GoogleSheets {
    fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        let url = format!("{SHEETS_API}/{}", self.spreadsheet_id);
        let metadata: SpreadsheetMetadata =
            self.get(&url, &[("fields", "sheets.properties(sheetId,title)")])?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|entry| SheetInfo {
                title: entry.properties.title,
                gid: entry.properties.sheet_id,
            })
            .collect())
    }

    #[instrument(level = "debug", skip(self))]
    fn read_values(&self, sheet: &str) -> Result<CellGrid> {
        let range = urlencoding::encode(&quote_sheet_name(sheet)).into_owned();
        let url = format!("{SHEETS_API}/{}/values/{range}", self.spreadsheet_id);
        let response: ValuesResponse = self
            .get(&url, &[("majorDimension", "ROWS")])
            .map_err(|error| match error {
                ToolError::Api { status: 400, ref body }
                    if body.contains("Unable to parse range") =>
                {
                    ToolError::SheetNotFound(sheet.to_string())
                }
                other => other,
            })?;
        debug!(row_count = response.values.len(), "values fetched");
        Ok(response
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_to_cell).collect())
            .collect())
    }

    #[instrument(level = "debug", skip_all, fields(range_count = ranges.len()))]
    fn write_values(&mut self, ranges: &[ValueRange]) -> Result<()> {
        if ranges.is_empty() {
            return Ok(());
        }
        let body = BatchUpdateRequest {
            value_input_option: "USER_ENTERED",
            data: ranges
                .iter()
                .map(|range| RangeBody {
                    range: range.a1(),
                    values: &range.values,
                })
                .collect(),
        };
        let url = format!("{SHEETS_API}/{}/values:batchUpdate", self.spreadsheet_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token.value)
            .json(&body)
            .send()?;
        let result: BatchUpdateResponse = parse_response(response)?;
        debug!(updated_cells = result.total_updated_cells, "batch update applied");
        Ok(())
    }
}

fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let body = response.text().unwrap_or_default();
        return Err(ToolError::AuthenticationFailure(format!("{status}: {body}")));
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ToolError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json()?)
}

fn value_to_cell(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_response_maps_to_sheet_info() {
        let json = r#"{"sheets":[{"properties":{"sheetId":0,"title":"Wines"}},
                                 {"properties":{"sheetId":812,"title":"Queue"}}]}"#;
        let metadata: SpreadsheetMetadata = serde_json::from_str(json).unwrap();
        let titles: Vec<(u64, String)> = metadata
            .sheets
            .into_iter()
            .map(|entry| (entry.properties.sheet_id, entry.properties.title))
            .collect();
        assert_eq!(titles, vec![(0, "Wines".into()), (812, "Queue".into())]);
    }

    #[test]
    fn values_response_tolerates_missing_values() {
        let response: ValuesResponse =
            serde_json::from_str(r#"{"range":"'Empty'!A1:Z1000","majorDimension":"ROWS"}"#)
                .unwrap();
        assert!(response.values.is_empty());
    }

    #[test]
    fn non_string_cells_are_rendered() {
        assert_eq!(value_to_cell(Value::from(12)), "12");
        assert_eq!(value_to_cell(Value::from(true)), "true");
        assert_eq!(value_to_cell(Value::Null), "");
        assert_eq!(value_to_cell(Value::from("R10")), "R10");
    }

    #[test]
    fn batch_body_uses_api_field_names() {
        let ranges = vec![ValueRange::cell("Wines", 1, 4, "$15.00")];
        let body = BatchUpdateRequest {
            value_input_option: "USER_ENTERED",
            data: ranges
                .iter()
                .map(|range| RangeBody {
                    range: range.a1(),
                    values: &range.values,
                })
                .collect(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "valueInputOption": "USER_ENTERED",
                "data": [{"range": "'Wines'!E2", "values": [["$15.00"]]}]
            })
        );
    }
}
