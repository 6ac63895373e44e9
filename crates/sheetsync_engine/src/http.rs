//! Google Sheets mirror over HTTP.
//!
//! The actual HTTP client is abstracted via a trait so the engine carries no
//! network stack of its own. [`SheetsMirror`] speaks the Sheets v4 REST
//! surface (JSON values ranges and `batchUpdate`) through that client.

use crate::error::{EngineError, EngineResult};
use crate::mirror::MirrorClient;
use serde::Deserialize;
use serde_json::{json, Value};
use sheetsync_protocol::CellValue;
use std::fmt;
use std::sync::Arc;

/// Default Sheets API endpoint.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// HTTP method used by the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL including query string.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub bearer: String,
    /// JSON body.
    pub body: Option<Vec<u8>>,
}

/// A response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport (reqwest,
/// ureq, a test double). `Err` means the request never produced a response.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// Where a [`SheetsMirror`] points.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTarget {
    /// API base URL.
    pub base_url: String,
    /// Spreadsheet id.
    pub spreadsheet_id: String,
    /// Tab name used in A1 ranges.
    pub sheet_name: String,
    /// Numeric id of the tab, used by `batchUpdate`.
    pub sheet_id: i64,
}

impl SheetTarget {
    /// Targets the first tab of a spreadsheet.
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            sheet_id: 0,
        }
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// A mirror backed by a Google Sheets spreadsheet.
pub struct SheetsMirror<C: HttpClient> {
    target: SheetTarget,
    access_token: String,
    client: Arc<C>,
}

impl<C: HttpClient> SheetsMirror<C> {
    /// Creates a mirror client using `access_token`.
    pub fn new(target: SheetTarget, access_token: impl Into<String>, client: Arc<C>) -> Self {
        Self {
            target,
            access_token: access_token.into(),
            client,
        }
    }

    /// Returns the target.
    pub fn target(&self) -> &SheetTarget {
        &self.target
    }

    fn range(&self, a1: &str) -> String {
        urlencoding::encode(&format!("{}!{}", self.target.sheet_name, a1)).into_owned()
    }

    fn values_url(&self, a1: &str, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.target.base_url,
            self.target.spreadsheet_id,
            self.range(a1),
            suffix
        )
    }

    fn batch_update_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.target.base_url, self.target.spreadsheet_id
        )
    }

    fn call(&self, method: Method, url: String, body: Option<Value>) -> EngineResult<Vec<u8>> {
        let body = body
            .map(|b| serde_json::to_vec(&b))
            .transpose()
            .map_err(|e| EngineError::Protocol(format!("Failed to encode request: {e}")))?;
        let request = HttpRequest {
            method,
            url,
            bearer: self.access_token.clone(),
            body,
        };

        let response = self
            .client
            .send(request)
            .map_err(EngineError::transport_retryable)?;

        match response.status {
            200..=299 => Ok(response.body),
            status => {
                let detail = String::from_utf8_lossy(&response.body).into_owned();
                Err(status_error(status, format!("sheets api returned {status}: {detail}")))
            }
        }
    }

    fn get_values(&self, a1: &str) -> EngineResult<Vec<Vec<Value>>> {
        let body = self.call(Method::Get, self.values_url(a1, ""), None)?;
        let range: ValueRange = serde_json::from_slice(&body)
            .map_err(|e| EngineError::Protocol(format!("Failed to decode values: {e}")))?;
        Ok(range.values)
    }

    fn batch_update(&self, requests: Value) -> EngineResult<()> {
        self.call(
            Method::Post,
            self.batch_update_url(),
            Some(json!({ "requests": requests })),
        )?;
        Ok(())
    }
}

impl<C: HttpClient> MirrorClient for SheetsMirror<C> {
    fn read_key_column(&self) -> EngineResult<Vec<CellValue>> {
        let rows = self.get_values("A:A")?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().map(cell_from_json).unwrap_or(CellValue::Null))
            .collect())
    }

    fn read_row(&self, row: usize) -> EngineResult<Vec<CellValue>> {
        let n = row + 1;
        let rows = self.get_values(&format!("A{n}:G{n}"))?;
        Ok(rows
            .into_iter()
            .next()
            .map(|cells| cells.into_iter().map(cell_from_json).collect())
            .unwrap_or_default())
    }

    fn update_row(&self, row: usize, values: &[CellValue]) -> EngineResult<()> {
        let n = row + 1;
        self.call(
            Method::Put,
            self.values_url(&format!("B{n}:G{n}"), "?valueInputOption=RAW"),
            Some(json!({ "values": [json_row(values)] })),
        )?;
        Ok(())
    }

    fn append_row(&self, values: &[CellValue]) -> EngineResult<()> {
        self.call(
            Method::Post,
            self.values_url("A1", ":append?valueInputOption=RAW"),
            Some(json!({ "values": [json_row(values)] })),
        )?;
        Ok(())
    }

    fn delete_row(&self, row: usize) -> EngineResult<()> {
        self.batch_update(json!([{
            "deleteDimension": {
                "range": {
                    "sheetId": self.target.sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row,
                    "endIndex": row + 1,
                }
            }
        }]))
    }

    fn clear_data(&self) -> EngineResult<()> {
        self.call(Method::Post, self.values_url("A2:Z", ":clear"), Some(json!({})))?;
        Ok(())
    }

    fn write_rows(&self, rows: &[Vec<CellValue>]) -> EngineResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let values: Vec<Value> = rows.iter().map(|row| json_row(row)).collect();
        self.call(
            Method::Put,
            self.values_url("A2", "?valueInputOption=RAW"),
            Some(json!({ "values": values })),
        )?;
        Ok(())
    }

    fn write_header(&self, labels: &[&str]) -> EngineResult<()> {
        self.call(
            Method::Put,
            self.values_url("A1:G1", "?valueInputOption=RAW"),
            Some(json!({ "values": [labels] })),
        )?;
        self.batch_update(header_format_requests(self.target.sheet_id))
    }
}

/// Bold shaded header, frozen first row, currency on Price, centered Quantity.
fn header_format_requests(sheet_id: i64) -> Value {
    json!([
        {
            "repeatCell": {
                "range": { "sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1 },
                "cell": { "userEnteredFormat": {
                    "backgroundColor": { "red": 0.9, "green": 0.9, "blue": 0.9 },
                    "textFormat": { "bold": true },
                    "horizontalAlignment": "CENTER",
                }},
                "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)",
            }
        },
        {
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "gridProperties": { "frozenRowCount": 1 } },
                "fields": "gridProperties.frozenRowCount",
            }
        },
        {
            "repeatCell": {
                "range": { "sheetId": sheet_id, "startRowIndex": 1, "startColumnIndex": 3, "endColumnIndex": 4 },
                "cell": { "userEnteredFormat": {
                    "numberFormat": { "type": "CURRENCY", "pattern": "$#,##0.00" },
                }},
                "fields": "userEnteredFormat.numberFormat",
            }
        },
        {
            "repeatCell": {
                "range": { "sheetId": sheet_id, "startRowIndex": 1, "startColumnIndex": 2, "endColumnIndex": 3 },
                "cell": { "userEnteredFormat": { "horizontalAlignment": "CENTER" } },
                "fields": "userEnteredFormat.horizontalAlignment",
            }
        }
    ])
}

fn status_error(status: u16, message: String) -> EngineError {
    match status {
        401 | 403 => EngineError::Unauthenticated(message),
        429 | 500..=599 => EngineError::transport_retryable(message),
        _ => EngineError::transport_fatal(message),
    }
}

fn json_row(values: &[CellValue]) -> Value {
    Value::Array(values.iter().map(CellValue::to_json).collect())
}

fn cell_from_json(value: Value) -> CellValue {
    serde_json::from_value(value).unwrap_or(CellValue::Null)
}
