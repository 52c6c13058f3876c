//! Google Sheets REST v4 backend.
//!
//! One [`GoogleSheetsStore`] addresses one spreadsheet; its worksheets are
//! the tables. Values are read formatted and written with
//! `valueInputOption=USER_ENTERED`, the way an operator typing into the
//! sheet would enter them. Appends fill the first blank row after the
//! table at `A1` and never shift existing rows, so row numbers read earlier
//! stay valid.

pub mod a1;
pub mod auth;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use ares_core::types::RowIndex;

use crate::error::{Result, StoreError};
use crate::store::TableStore;

pub use auth::{ServiceAccountKey, TokenProvider};

/// Public Sheets API endpoint.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Body fragments that mark a 403 as a quota rejection rather than a
/// permission problem.
const QUOTA_MARKERS: &[&str] = &[
    "RATE_LIMIT_EXCEEDED",
    "rateLimitExceeded",
    "RESOURCE_EXHAUSTED",
    "Quota exceeded",
];

/// Body fragment returned when a range names a worksheet that is missing.
const MISSING_RANGE_MARKER: &str = "Unable to parse range";

/// Map a non-success HTTP response onto the store error taxonomy.
pub fn classify(status: u16, body: String) -> StoreError {
    match status {
        429 => StoreError::RateLimited(body),
        403 if QUOTA_MARKERS.iter().any(|m| body.contains(m)) => StoreError::RateLimited(body),
        401 => StoreError::Auth(body),
        404 => StoreError::NotFound(body),
        400 if body.contains(MISSING_RANGE_MARKER) => StoreError::NotFound(body),
        _ => StoreError::Api { status, body },
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Render a cell value as the text an operator sees.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A spreadsheet accessed through the Sheets REST API.
pub struct GoogleSheetsStore {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    auth: Arc<TokenProvider>,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: String, auth: Arc<TokenProvider>) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            SHEETS_API_BASE.to_string(),
            spreadsheet_id,
            auth,
        )
    }

    /// Build a store reusing an existing [`reqwest::Client`] (shared
    /// connection pool) against `base_url`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: String,
        spreadsheet_id: String,
        auth: Arc<TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url,
            spreadsheet_id,
            auth,
        }
    }

    // ---- private helpers ----

    /// `{base}/v4/spreadsheets/{id}` followed by `tail`, each segment
    /// percent-encoded.
    fn url(&self, tail: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| StoreError::Malformed(format!("Invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(tail);
        Ok(url)
    }

    /// Attach the bearer token, send, and classify non-2xx responses.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(classify(status.as_u16(), body))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", range])?;
        let request = self.http.get(url).query(&[
            ("majorDimension", "ROWS"),
            ("valueRenderOption", "FORMATTED_VALUE"),
        ]);
        let body: ValueRange = Self::parse(self.send(request).await?).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

#[async_trait]
impl TableStore for GoogleSheetsStore {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let url = self.url(&[self.spreadsheet_id.as_str()])?;
        let request = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let meta: SpreadsheetMeta = Self::parse(self.send(request).await?).await?;
        Ok(meta.sheets.iter().any(|s| s.properties.title == table))
    }

    async fn create_table(&self, table: &str, rows: u32, cols: u32) -> Result<()> {
        let url = self.url(&[format!("{}:batchUpdate", self.spreadsheet_id).as_str()])?;
        let body = serde_json::json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": table,
                        "gridProperties": { "rowCount": rows, "columnCount": cols },
                    }
                }
            }]
        });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    async fn read_range(
        &self,
        table: &str,
        first: RowIndex,
        last: Option<RowIndex>,
    ) -> Result<Vec<Vec<String>>> {
        let first = first.max(1);
        match last {
            Some(last) if last < first => Ok(Vec::new()),
            Some(last) => self.get_values(&a1::rows(table, first, last)).await,
            None => {
                // Open-ended: read the whole sheet and drop the leading rows.
                let all = self.get_values(&a1::quote_title(table)).await?;
                Ok(all.into_iter().skip(first as usize - 1).collect())
            }
        }
    }

    async fn write_range(
        &self,
        table: &str,
        row: RowIndex,
        col: u32,
        values: &[Vec<String>],
    ) -> Result<()> {
        let range = a1::cell(table, row, col);
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", range.as_str()])?;
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn append_row(&self, table: &str, values: &[String]) -> Result<RowIndex> {
        let range = a1::cell(table, 1, 1);
        let url = self.url(&[
            self.spreadsheet_id.as_str(),
            "values",
            format!("{range}:append").as_str(),
        ])?;
        let body = serde_json::json!({
            "majorDimension": "ROWS",
            "values": [values],
        });
        let request = self
            .http
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "OVERWRITE"),
            ])
            .json(&body);
        let response: AppendResponse = Self::parse(self.send(request).await?).await?;
        a1::first_row(&response.updates.updated_range).ok_or_else(|| {
            StoreError::Malformed(format!(
                "Append returned unparsable range '{}'",
                response.updates.updated_range
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert_matches!(classify(429, "slow down".into()), StoreError::RateLimited(_));
    }

    #[test]
    fn quota_forbidden_is_rate_limited() {
        let body = r#"{"error":{"code":403,"status":"PERMISSION_DENIED","details":[{"reason":"RATE_LIMIT_EXCEEDED"}]}}"#;
        assert_matches!(classify(403, body.into()), StoreError::RateLimited(_));
        assert_matches!(
            classify(403, "Quota exceeded for quota metric 'Read requests'".into()),
            StoreError::RateLimited(_)
        );
    }

    #[test]
    fn plain_forbidden_is_fatal() {
        assert_matches!(
            classify(403, "The caller does not have permission".into()),
            StoreError::Api { status: 403, .. }
        );
    }

    #[test]
    fn missing_sheet_is_not_found() {
        assert_matches!(
            classify(400, "Unable to parse range: 'MesaiLog'!1:1".into()),
            StoreError::NotFound(_)
        );
        assert_matches!(classify(404, "Requested entity was not found.".into()), StoreError::NotFound(_));
    }

    #[test]
    fn unauthorized_is_auth_error() {
        assert_matches!(classify(401, "invalid token".into()), StoreError::Auth(_));
    }

    #[test]
    fn other_statuses_are_api_errors() {
        assert_matches!(classify(500, "boom".into()), StoreError::Api { status: 500, .. });
        assert_matches!(classify(400, "Invalid value".into()), StoreError::Api { status: 400, .. });
    }

    #[test]
    fn non_string_cells_render_as_text() {
        assert_eq!(cell_text(serde_json::json!("x")), "x");
        assert_eq!(cell_text(serde_json::json!(42)), "42");
        assert_eq!(cell_text(serde_json::json!(true)), "true");
        assert_eq!(cell_text(serde_json::Value::Null), "");
    }

    #[test]
    fn urls_encode_ranges_as_path_segments() {
        let key = ServiceAccountKey {
            client_email: "a@b".into(),
            private_key: "k".into(),
            token_uri: auth::DEFAULT_TOKEN_URI.into(),
        };
        let provider = Arc::new(TokenProvider::new(key, reqwest::Client::new()));
        let store = GoogleSheetsStore::new("sheet123".into(), provider);

        let url = store
            .url(&["sheet123", "values", a1::rows("Mesai Log", 2, 10).as_str()])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/'Mesai%20Log'!2:10"
        );
    }
}
