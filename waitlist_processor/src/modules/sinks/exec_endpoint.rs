use async_trait::async_trait;
use serde::Deserialize;

use crate::modules::{
    error::WaitlistError,
    sinks::{ensure_success, RecordSink},
    submission_dispatcher::submission::SubmissionRecord,
};

const SINK_NAME: &str = "exec";

#[derive(Debug, Deserialize)]
struct ExecResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

// Script-backed deployment: one GET both records the signup and sends the email.
// Used instead of the spreadsheet and email-service sinks, never alongside them.
pub struct ExecEndpoint {
    client: reqwest::Client,
    url: String,
}

impl ExecEndpoint {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl RecordSink for ExecEndpoint {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), WaitlistError> {
        let response = self.client
            .get(&self.url)
            .query(&[("email", record.email.as_str()), ("location", record.location.as_str())])
            .send()
            .await
            .map_err(|e| WaitlistError::SinkFailure { sink: SINK_NAME, reason: e.to_string() })?;

        ensure_success(SINK_NAME, &response)?;

        let body = response
            .text()
            .await
            .map_err(|e| WaitlistError::SinkFailure { sink: SINK_NAME, reason: e.to_string() })?;

        let reply = parse_exec_response(&body)?;

        match reply.status.as_str() {
            "success" => Ok(()),
            _ => Err(reply_error(reply.message)),
        }
    }
}

// The script reports an existing signup as an error whose message says
// the email is already registered
fn reply_error(message: Option<String>) -> WaitlistError {
    match message {
        Some(message) if message.to_lowercase().contains("already") => WaitlistError::DuplicateEmail,
        Some(message) => WaitlistError::SinkFailure { sink: SINK_NAME, reason: message },
        None => WaitlistError::SinkFailure { sink: SINK_NAME, reason: "endpoint reported an error".to_string() },
    }
}

// Validate the reply against the expected shape before trusting it
fn parse_exec_response(body: &str) -> Result<ExecResponse, WaitlistError> {

    // Initiate the control schema
    let control_schema = serde_json::json!({
        "type": "object",
        "properties": {
            "status": { "type": "string", "enum": ["success", "error"] },
            "message": { "type": "string" }
        },
        "required": ["status"]
    });

    // Parse the body to a 'Value' type
    let json_data: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WaitlistError::JsonDeserializationError(e.to_string()))?;

    // Validate the JSON data against the control schema
    if let Err(e) = jsonschema::validate(&control_schema, &json_data) {
        return Err(WaitlistError::JsonDeserializationError(e.to_string()));
    }

    serde_json::from_value(json_data).map_err(|e| WaitlistError::JsonDeserializationError(e.to_string()))
}
