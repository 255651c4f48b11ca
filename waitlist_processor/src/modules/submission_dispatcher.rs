use futures::FutureExt;
use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};
use uuid::Uuid;

use crate::{
    config::{self, Config, EmailProvider, Secrets, Transport},
    modules::{
        duplicate_checker::{DuplicateLookup, NoDuplicateLookup, SheetDuplicateLookup},
        error::{WaitlistError, UNEXPECTED_ERROR_MESSAGE},
        rate_limiter::RateLimiter,
        sanitizer::{format_location, sanitize},
        sinks::{
            build_http_client,
            exec_endpoint::ExecEndpoint,
            mailing_list::{mailchimp_base_url, ConvertKitSink, MailchimpSink},
            spreadsheet::SheetsClient,
            RecordSink,
            SubscriptionSink,
        },
        validation::{is_launch_market, validate_form},
    },
};

pub mod submission;

use submission::{SubmissionOutcome, SubmissionRecord, SubmissionRequest};

pub const SUCCESS_MESSAGE: &str = "Successfully added to waitlist!";

pub type SinkResult = Result<(), WaitlistError>;

// Handles
// - Validating and sanitizing a waitlist submission
// - Rate limiting per caller and rejecting duplicates
// - Sending the signup to the record sink and the subscription sink together
// - Turning every failure into an outcome the landing page can show
#[derive(Clone)]
pub struct SubmissionDispatcher {

    // Per-caller fixed-window limiter, shares its store with the sweeper
    rate_limiter: RateLimiter,

    // Existing-signup check, fails open
    duplicate_lookup: Arc<dyn DuplicateLookup>,

    // System of record, decides overall success
    record_sink: Arc<dyn RecordSink>,

    // Email-marketing list, absent for the exec transport
    subscription_sink: Option<Arc<dyn SubscriptionSink>>,

    // Upper bound for every external call
    sink_timeout: Duration,

    // Last column of every appended row
    source_tag: String,
}

impl SubmissionDispatcher {
    pub fn new(
        rate_limiter: RateLimiter,
        duplicate_lookup: Arc<dyn DuplicateLookup>,
        record_sink: Arc<dyn RecordSink>,
        subscription_sink: Option<Arc<dyn SubscriptionSink>>,
        config: &config::DispatcherConfig,
    ) -> Self {
        Self {
            rate_limiter,
            duplicate_lookup,
            record_sink,
            subscription_sink,
            sink_timeout: Duration::from_secs(config.sink_timeout),
            source_tag: config.source_tag.clone(),
        }
    }

    // Wire up the sinks for the configured transport
    pub fn from_config(config: &Config, secrets: &Secrets, rate_limiter: RateLimiter) -> Result<Self, WaitlistError> {
        let client = build_http_client(Duration::from_secs(config.dispatcher.sink_timeout))?;

        match config.dispatcher.transport {
            Transport::Sheets => {
                let sheets = Arc::new(SheetsClient::new(
                    client.clone(),
                    &config.spreadsheet.base_url,
                    config::require("GOOGLE_SPREADSHEET_ID", &secrets.google_spreadsheet_id)?,
                    &config.spreadsheet.sheet_name,
                    config::require("GOOGLE_SHEETS_API_KEY", &secrets.google_sheets_api_key)?,
                ));

                let mailing_list = &config.mailing_list;
                let subscription_sink: Arc<dyn SubscriptionSink> = match mailing_list.provider {
                    EmailProvider::Mailchimp => Arc::new(MailchimpSink::new(
                        client,
                        &mailchimp_base_url(&secrets.mailchimp_server_prefix),
                        config::require("MAILCHIMP_LIST_ID", &secrets.mailchimp_list_id)?,
                        config::require("MAILCHIMP_API_KEY", &secrets.mailchimp_api_key)?,
                        mailing_list.tags.clone(),
                        &mailing_list.signup_source,
                    )),
                    EmailProvider::Convertkit => Arc::new(ConvertKitSink::new(
                        client,
                        &mailing_list.convertkit_base_url,
                        config::require("CONVERTKIT_FORM_ID", &secrets.convertkit_form_id)?,
                        config::require("CONVERTKIT_API_KEY", &secrets.convertkit_api_key)?,
                        &mailing_list.signup_source,
                    )),
                };

                Ok(Self::new(
                    rate_limiter,
                    Arc::new(SheetDuplicateLookup::new(sheets.clone())),
                    sheets,
                    Some(subscription_sink),
                    &config.dispatcher,
                ))
            }
            Transport::Exec => {
                let endpoint = ExecEndpoint::new(client, config::exec_url(config, secrets)?);
                Ok(Self::new(
                    rate_limiter,
                    Arc::new(NoDuplicateLookup),
                    Arc::new(endpoint),
                    None,
                    &config.dispatcher,
                ))
            }
        }
    }

    // Public entry point. Never fails: errors and panics become an outcome.
    pub async fn submit(&self, request: &SubmissionRequest) -> SubmissionOutcome {
        let submission_id = Uuid::new_v4();

        let result = AssertUnwindSafe(self.process_submission(request, submission_id))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if e.is_user_correctable() => {
                log::info!("Submission {} from {} rejected: {}", submission_id, request.caller_identifier, e);
                SubmissionOutcome::rejected(e.user_message())
            }
            Ok(Err(e)) => {
                log::error!("Submission {} from {} failed: {}", submission_id, request.caller_identifier, e);
                SubmissionOutcome::rejected(e.user_message())
            }
            Err(_) => {
                log::error!("Submission {} from {} panicked", submission_id, request.caller_identifier);
                SubmissionOutcome::rejected(UNEXPECTED_ERROR_MESSAGE.to_string())
            }
        }
    }

    async fn process_submission(&self, request: &SubmissionRequest, submission_id: Uuid) -> Result<SubmissionOutcome, WaitlistError> {
        if request.email.is_empty() || request.location.is_empty() {
            return Err(WaitlistError::MissingField);
        }

        let validation = validate_form(&request.email, &request.location, request.custom_location.as_deref());
        if !validation.is_valid() {
            return Err(WaitlistError::ValidationError(validation.messages()));
        }

        let email = sanitize(&request.email).to_lowercase();
        let location = format_location(&request.location, request.custom_location.as_deref());

        if !self.rate_limiter.check_and_consume(&request.caller_identifier).await {
            return Err(WaitlistError::RateLimited);
        }

        if self.is_duplicate(&email).await {
            return Err(WaitlistError::DuplicateEmail);
        }

        let record = SubmissionRecord {
            email,
            location,
            submitted_at: self.rate_limiter.clock().now(),
            source_tag: self.source_tag.clone(),
        };

        log::info!(
            " - Dispatching submission {} ({}, launch market: {})",
            submission_id,
            record.email,
            is_launch_market(&record.location)
        );

        // Neither sink depends on the other, await both together
        let (record_result, subscription_result) = futures::future::join(
            self.append_record(&record),
            self.subscribe(&record),
        ).await;

        if let Err(e) = &record_result {
            log::warn!(" -- Submission {}: {} sink failed: {}", submission_id, self.record_sink.name(), e);
        }
        if let Some(Err(e)) = &subscription_result {
            log::warn!(" -- Submission {}: subscription sink failed: {}", submission_id, e);
        }

        let outcome = aggregate(&record_result, subscription_result.as_ref());
        log::info!(
            " --- Submission {} finished, recorded: {}, email sequence: {:?}",
            submission_id,
            outcome.success,
            outcome.email_sequence_triggered
        );
        Ok(outcome)
    }

    // Fail open on timeout as on any other lookup error
    async fn is_duplicate(&self, email: &str) -> bool {
        match tokio::time::timeout(self.sink_timeout, self.duplicate_lookup.is_duplicate(email)).await {
            Ok(found) => found,
            Err(_) => {
                log::warn!("Duplicate check timed out, allowing submission");
                false
            }
        }
    }

    async fn append_record(&self, record: &SubmissionRecord) -> SinkResult {
        let sink = self.record_sink.name();
        self.bounded(sink, self.record_sink.append(record)).await
    }

    // None when there is no subscription sink configured
    async fn subscribe(&self, record: &SubmissionRecord) -> Option<SinkResult> {
        let sink = self.subscription_sink.as_ref()?;
        Some(self.bounded(sink.name(), sink.subscribe(&record.email, &record.location)).await)
    }

    async fn bounded<F>(&self, sink: &'static str, call: F) -> SinkResult
    where
        F: Future<Output = SinkResult>,
    {
        match tokio::time::timeout(self.sink_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(WaitlistError::Timeout(sink)),
        }
    }
}

// Overall success follows the record sink only. The subscription result is
// reported but never changes success, and is absent when no subscription sink ran.
pub fn aggregate(record: &SinkResult, subscription: Option<&SinkResult>) -> SubmissionOutcome {
    let email_sequence_triggered = subscription.map(|result| result.is_ok());

    match record {
        Ok(()) => SubmissionOutcome {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            email_sequence_triggered,
        },
        Err(e) => SubmissionOutcome {
            success: false,
            message: e.user_message(),
            email_sequence_triggered,
        },
    }
}
