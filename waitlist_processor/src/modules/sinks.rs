use async_trait::async_trait;
use std::time::Duration;

use crate::modules::{
    error::WaitlistError,
    submission_dispatcher::submission::SubmissionRecord,
};

pub mod exec_endpoint;
pub mod mailing_list;
pub mod spreadsheet;

// System of record for signups. Its acknowledgement decides overall success.
#[async_trait]
pub trait RecordSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn append(&self, record: &SubmissionRecord) -> Result<(), WaitlistError>;
}

// Email-marketing list. Best effort, never gates a signup.
#[async_trait]
pub trait SubscriptionSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn subscribe(&self, email: &str, location: &str) -> Result<(), WaitlistError>;
}

// Shared client for every sink, bounded by the sink timeout
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, WaitlistError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WaitlistError::ConfigError(format!("Could not build HTTP client: {}", e)))
}

// Appends path segments to a base URL, percent-encoding each one
pub(crate) fn join_url(base_url: &str, segments: &[&str]) -> Result<reqwest::Url, WaitlistError> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| WaitlistError::ConfigError(format!("Invalid base URL {}: {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| WaitlistError::ConfigError(format!("Base URL {} cannot have a path", base_url)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

// Turns a non-2xx response into a sink failure carrying the status
pub(crate) fn ensure_success(sink: &'static str, response: &reqwest::Response) -> Result<(), WaitlistError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(WaitlistError::SinkFailure {
            sink,
            reason: format!("unexpected status {}", response.status()),
        })
    }
}
