use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Deserialize};

// One form submission as it arrives from the landing page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub email: String,
    // A listed city, or "Other"
    pub location: String,
    // Typed-in city when location is "Other"
    #[serde(default)]
    pub custom_location: Option<String>,
    // Who is submitting, used for rate limiting. Never read from the body.
    #[serde(skip)]
    pub caller_identifier: String,
}

impl SubmissionRequest {
    pub fn new(email: &str, location: &str, custom_location: Option<&str>, caller_identifier: &str) -> Self {
        Self {
            email: email.to_string(),
            location: location.to_string(),
            custom_location: custom_location.map(str::to_string),
            caller_identifier: caller_identifier.to_string(),
        }
    }
}

// Row appended to the spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    // Sanitized, lower-cased
    pub email: String,
    // Sanitized, custom location already applied
    pub location: String,
    pub submitted_at: DateTime<Utc>,
    pub source_tag: String,
}

impl SubmissionRecord {
    // Column order of the waitlist sheet
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.email.clone(),
            self.location.clone(),
            self.submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.source_tag.clone(),
        ]
    }
}

// What the landing page gets back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: String,
    // Only set once the sinks have been called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sequence_triggered: Option<bool>,
}

impl SubmissionOutcome {
    pub fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            email_sequence_triggered: None,
        }
    }
}
