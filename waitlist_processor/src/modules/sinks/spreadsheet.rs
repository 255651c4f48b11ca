use async_trait::async_trait;
use serde::{Serialize, Deserialize};

use crate::modules::{
    error::WaitlistError,
    sinks::{ensure_success, join_url, RecordSink},
    submission_dispatcher::submission::SubmissionRecord,
};

const SINK_NAME: &str = "spreadsheet";

// Body of a values:append call
#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<String>>,
}

// Body of a values GET. An empty sheet has no `values` key at all.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

// Client for the waitlist sheet: append rows, read them back for duplicate checks
pub struct SheetsClient {

    // Shared HTTP client
    client: reqwest::Client,

    // API root, e.g. https://sheets.googleapis.com/v4
    base_url: String,

    spreadsheet_id: String,

    // Tab the rows live in
    sheet_name: String,

    api_key: String,
}

impl SheetsClient {
    pub fn new(client: reqwest::Client, base_url: &str, spreadsheet_id: &str, sheet_name: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn append_row(&self, row: Vec<String>) -> Result<(), WaitlistError> {
        let range = format!("{}:append", self.sheet_name);
        let url = join_url(&self.base_url, &["spreadsheets", self.spreadsheet_id.as_str(), "values", range.as_str()])?;

        let response = self.client
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED"), ("key", self.api_key.as_str())])
            .json(&AppendRequest { values: vec![row] })
            .send()
            .await
            .map_err(|e| WaitlistError::SinkFailure { sink: SINK_NAME, reason: e.to_string() })?;

        ensure_success(SINK_NAME, &response)
    }

    // Every row of the sheet, header included
    pub async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, WaitlistError> {
        let url = join_url(&self.base_url, &["spreadsheets", self.spreadsheet_id.as_str(), "values", self.sheet_name.as_str()])?;

        let response = self.client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| WaitlistError::SinkFailure { sink: SINK_NAME, reason: e.to_string() })?;

        ensure_success(SINK_NAME, &response)?;

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| WaitlistError::JsonDeserializationError(e.to_string()))?;

        Ok(range.values)
    }
}

#[async_trait]
impl RecordSink for SheetsClient {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), WaitlistError> {
        self.append_row(record.to_row()).await
    }
}
