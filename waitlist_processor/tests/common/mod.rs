#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::{sync::Arc, time::Duration};
use waitlist_processor::{
    config::{DispatcherConfig, RateLimiterConfig, Transport},
    modules::{
        clock::ManualClock,
        duplicate_checker::{DuplicateLookup, SheetDuplicateLookup},
        rate_limit_store::InMemoryRateLimitStore,
        rate_limiter::{shared_store, RateLimiter},
        sinks::{
            build_http_client,
            mailing_list::MailchimpSink,
            spreadsheet::SheetsClient,
            RecordSink,
            SubscriptionSink,
        },
        submission_dispatcher::SubmissionDispatcher,
    },
};
use wiremock::MockServer;

pub const SPREADSHEET_ID: &str = "sheet-id";
pub const SHEETS_KEY: &str = "sheets-key";
pub const LIST_ID: &str = "list-id";
pub const MAILCHIMP_KEY: &str = "mailchimp-key";
pub const APPEND_PATH: &str = "/spreadsheets/sheet-id/values/Waitlist:append";
pub const VALUES_PATH: &str = "/spreadsheets/sheet-id/values/Waitlist";
pub const MEMBERS_PATH: &str = "/lists/list-id/members";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 18, 30, 0).unwrap()
}

pub fn http_client() -> reqwest::Client {
    build_http_client(Duration::from_secs(5)).unwrap()
}

pub fn rate_limiter_config() -> RateLimiterConfig {
    RateLimiterConfig {
        max_submissions: 3,
        window_length: 3600,
        max_entries: 1000,
        sweep_interval: 300,
    }
}

pub fn dispatcher_config(sink_timeout: u64) -> DispatcherConfig {
    DispatcherConfig {
        transport: Transport::Sheets,
        sink_timeout,
        source_tag: "Waitlist Signup".to_string(),
    }
}

pub fn rate_limiter(clock: Arc<ManualClock>) -> RateLimiter {
    let store = shared_store(InMemoryRateLimitStore::new(1000));
    RateLimiter::new(store, clock, &rate_limiter_config())
}

pub fn sheets_client(server: &MockServer) -> Arc<SheetsClient> {
    Arc::new(SheetsClient::new(http_client(), &server.uri(), SPREADSHEET_ID, "Waitlist", SHEETS_KEY))
}

pub fn mailchimp_sink(server: &MockServer) -> MailchimpSink {
    MailchimpSink::new(
        http_client(),
        &server.uri(),
        LIST_ID,
        MAILCHIMP_KEY,
        vec!["waitlist".to_string(), "la-launch".to_string()],
        "Landing Page Waitlist",
    )
}

// Dispatcher wired to mock spreadsheet and mailchimp servers
pub fn sheets_dispatcher(sheets: &MockServer, mailchimp: &MockServer, clock: Arc<ManualClock>) -> SubmissionDispatcher {
    let client = sheets_client(sheets);
    let duplicate_lookup: Arc<dyn DuplicateLookup> = Arc::new(SheetDuplicateLookup::new(client.clone()));
    let record_sink: Arc<dyn RecordSink> = client;
    let subscription_sink: Arc<dyn SubscriptionSink> = Arc::new(mailchimp_sink(mailchimp));

    SubmissionDispatcher::new(
        rate_limiter(clock),
        duplicate_lookup,
        record_sink,
        Some(subscription_sink),
        &dispatcher_config(2),
    )
}
