mod common;

use async_trait::async_trait;
use common::*;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use waitlist_processor::modules::{
    clock::ManualClock,
    duplicate_checker::NoDuplicateLookup,
    error::{
        WaitlistError,
        DUPLICATE_EMAIL_MESSAGE,
        MISSING_FIELD_MESSAGE,
        RATE_LIMITED_MESSAGE,
        SINK_FAILURE_MESSAGE,
        UNEXPECTED_ERROR_MESSAGE,
    },
    sinks::{exec_endpoint::ExecEndpoint, RecordSink},
    submission_dispatcher::{
        submission::{SubmissionRecord, SubmissionRequest},
        SubmissionDispatcher,
        SUCCESS_MESSAGE,
    },
};
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

struct Servers {
    sheets: MockServer,
    mailchimp: MockServer,
    clock: Arc<ManualClock>,
}

impl Servers {
    async fn start() -> Self {
        Self {
            sheets: MockServer::start().await,
            mailchimp: MockServer::start().await,
            clock: Arc::new(ManualClock::new(start_time())),
        }
    }

    fn dispatcher(&self) -> SubmissionDispatcher {
        sheets_dispatcher(&self.sheets, &self.mailchimp, self.clock.clone())
    }

    async fn sheet_rows(&self, rows: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(VALUES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": rows })))
            .mount(&self.sheets)
            .await;
    }

    async fn append_status(&self, status: u16, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(APPEND_PATH))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_calls)
            .mount(&self.sheets)
            .await;
    }

    async fn subscribe_status(&self, status: u16, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(MEMBERS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_calls)
            .mount(&self.mailchimp)
            .await;
    }
}

fn request(email: &str, location: &str, custom_location: Option<&str>) -> SubmissionRequest {
    SubmissionRequest::new(email, location, custom_location, "198.51.100.4")
}

#[tokio::test]
async fn valid_signup_is_recorded_and_subscribed() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([["someone@else.com", "Seattle"]])).await;
    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .and(body_json(json!({
            "values": [["user@example.com", "Los Angeles", "2025-05-01T18:30:00.000Z", "Waitlist Signup"]]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&servers.sheets)
        .await;
    servers.subscribe_status(200, 1).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(outcome.success);
    assert_eq!(outcome.message, SUCCESS_MESSAGE);
    assert_eq!(outcome.email_sequence_triggered, Some(true));
}

#[tokio::test]
async fn email_is_lowercased_and_custom_location_is_used() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([])).await;
    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .and(body_json(json!({
            "values": [["user@example.com", "Long Beach", "2025-05-01T18:30:00.000Z", "Waitlist Signup"]]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&servers.sheets)
        .await;
    servers.subscribe_status(200, 1).await;

    let outcome = servers
        .dispatcher()
        .submit(&request("User@Example.COM", "Other", Some("  Long <Beach> ")))
        .await;

    assert!(outcome.success);
}

#[tokio::test]
async fn typo_domain_is_rejected_with_suggestion() {
    let servers = Servers::start().await;
    servers.append_status(200, 0).await;
    servers.subscribe_status(200, 0).await;

    let outcome = servers.dispatcher().submit(&request("test@gmial.com", "Los Angeles", None)).await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("Did you mean test@gmail.com?"));
    assert_eq!(outcome.email_sequence_triggered, None);
}

#[tokio::test]
async fn other_without_custom_location_is_rejected() {
    let servers = Servers::start().await;
    servers.append_status(200, 0).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Other", Some(""))).await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("Please specify your location"));
}

#[tokio::test]
async fn all_validation_messages_are_joined() {
    let servers = Servers::start().await;

    let outcome = servers.dispatcher().submit(&request("not-an-email", "Other", Some("x"))).await;

    assert_eq!(
        outcome.message,
        "Please enter a valid email address Location must be at least 2 characters"
    );
}

#[tokio::test]
async fn empty_fields_short_circuit() {
    let servers = Servers::start().await;
    servers.append_status(200, 0).await;

    let outcome = servers.dispatcher().submit(&request("", "Los Angeles", None)).await;
    assert_eq!(outcome.message, MISSING_FIELD_MESSAGE);

    let outcome = servers.dispatcher().submit(&request("user@example.com", "", None)).await;
    assert_eq!(outcome.message, MISSING_FIELD_MESSAGE);
}

#[tokio::test]
async fn existing_email_is_not_appended_again() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([["Email"], ["USER@example.com", "Los Angeles"]])).await;
    servers.append_status(200, 0).await;
    servers.subscribe_status(200, 0).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, DUPLICATE_EMAIL_MESSAGE);
}

#[tokio::test]
async fn failing_duplicate_check_does_not_block_signup() {
    let servers = Servers::start().await;
    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&servers.sheets)
        .await;
    servers.append_status(200, 1).await;
    servers.subscribe_status(200, 1).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(outcome.success);
}

#[tokio::test]
async fn spreadsheet_failure_fails_signup_but_reports_email_sequence() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([])).await;
    servers.append_status(500, 1).await;
    servers.subscribe_status(200, 1).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, SINK_FAILURE_MESSAGE);
    assert_eq!(outcome.email_sequence_triggered, Some(true));
}

#[tokio::test]
async fn email_service_failure_does_not_fail_signup() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([])).await;
    servers.append_status(200, 1).await;
    servers.subscribe_status(401, 1).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(outcome.success);
    assert_eq!(outcome.message, SUCCESS_MESSAGE);
    assert_eq!(outcome.email_sequence_triggered, Some(false));
}

#[tokio::test]
async fn fourth_submission_in_an_hour_is_rate_limited() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([])).await;
    servers.append_status(200, 4).await;
    servers.subscribe_status(200, 4).await;
    let dispatcher = servers.dispatcher();

    for i in 0..3 {
        let email = format!("friend{}@example.com", i);
        let outcome = dispatcher.submit(&request(&email, "Los Angeles", None)).await;
        assert!(outcome.success, "submission {} should pass", i);
        servers.clock.advance(chrono::Duration::minutes(5));
    }

    let outcome = dispatcher.submit(&request("friend3@example.com", "Los Angeles", None)).await;
    assert_eq!(outcome.message, RATE_LIMITED_MESSAGE);

    // A new window opens after an hour
    servers.clock.advance(chrono::Duration::minutes(50));
    let outcome = dispatcher.submit(&request("friend3@example.com", "Los Angeles", None)).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn invalid_submissions_do_not_use_up_the_limit() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([])).await;
    servers.append_status(200, 1).await;
    servers.subscribe_status(200, 1).await;
    let dispatcher = servers.dispatcher();

    for _ in 0..5 {
        let outcome = dispatcher.submit(&request("broken", "Los Angeles", None)).await;
        assert!(!outcome.success);
    }

    let outcome = dispatcher.submit(&request("user@example.com", "Los Angeles", None)).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn slow_spreadsheet_is_cut_off_by_sink_timeout() {
    let servers = Servers::start().await;
    servers.sheet_rows(json!([])).await;
    Mock::given(method("POST"))
        .and(path(APPEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&servers.sheets)
        .await;
    servers.subscribe_status(200, 1).await;

    let outcome = servers.dispatcher().submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, SINK_FAILURE_MESSAGE);
    assert_eq!(outcome.email_sequence_triggered, Some(true));
}

struct PanickingSink;

#[async_trait]
impl RecordSink for PanickingSink {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn append(&self, _record: &SubmissionRecord) -> Result<(), WaitlistError> {
        panic!("sink exploded");
    }
}

#[tokio::test]
async fn panics_become_the_generic_apology() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let dispatcher = SubmissionDispatcher::new(
        rate_limiter(clock),
        Arc::new(NoDuplicateLookup),
        Arc::new(PanickingSink),
        None,
        &dispatcher_config(2),
    );

    let outcome = dispatcher.submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, UNEXPECTED_ERROR_MESSAGE);
}

#[tokio::test]
async fn exec_transport_records_through_single_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/macros/exec"))
        .and(query_param("email", "user@example.com"))
        .and(query_param("location", "Los Angeles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success", "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(start_time()));
    let dispatcher = SubmissionDispatcher::new(
        rate_limiter(clock),
        Arc::new(NoDuplicateLookup),
        Arc::new(ExecEndpoint::new(http_client(), &format!("{}/macros/exec", server.uri()))),
        None,
        &dispatcher_config(2),
    );

    let outcome = dispatcher.submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(outcome.success);
    // The endpoint sends the email itself, there is no subscription result to report
    assert_eq!(outcome.email_sequence_triggered, None);
}

#[tokio::test]
async fn exec_transport_surfaces_already_registered_reply_as_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/macros/exec"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "error", "message": "Email already registered" })),
        )
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(start_time()));
    let dispatcher = SubmissionDispatcher::new(
        rate_limiter(clock),
        Arc::new(NoDuplicateLookup),
        Arc::new(ExecEndpoint::new(http_client(), &format!("{}/macros/exec", server.uri()))),
        None,
        &dispatcher_config(2),
    );

    let outcome = dispatcher.submit(&request("user@example.com", "Los Angeles", None)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, DUPLICATE_EMAIL_MESSAGE);
    assert_eq!(outcome.email_sequence_triggered, None);
}
