use async_trait::async_trait;
use serde::Serialize;

use crate::modules::{
    error::WaitlistError,
    sinks::{ensure_success, join_url, SubscriptionSink},
};

pub fn mailchimp_base_url(server_prefix: &str) -> String {
    format!("https://{}.api.mailchimp.com/3.0", server_prefix)
}

#[derive(Debug, Serialize)]
struct MailchimpMember<'a> {
    email_address: &'a str,
    status: &'a str,
    merge_fields: MergeFields<'a>,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct MergeFields<'a> {
    location: &'a str,
    signup_source: &'a str,
}

// Adds signups to a Mailchimp audience, which starts the welcome sequence
pub struct MailchimpSink {
    client: reqwest::Client,
    base_url: String,
    list_id: String,
    api_key: String,
    tags: Vec<String>,
    signup_source: String,
}

impl MailchimpSink {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        list_id: &str,
        api_key: &str,
        tags: Vec<String>,
        signup_source: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            list_id: list_id.to_string(),
            api_key: api_key.to_string(),
            tags,
            signup_source: signup_source.to_string(),
        }
    }
}

#[async_trait]
impl SubscriptionSink for MailchimpSink {
    fn name(&self) -> &'static str {
        "mailchimp"
    }

    async fn subscribe(&self, email: &str, location: &str) -> Result<(), WaitlistError> {
        let url = join_url(&self.base_url, &["lists", self.list_id.as_str(), "members"])?;

        let member = MailchimpMember {
            email_address: email,
            status: "subscribed",
            merge_fields: MergeFields {
                location,
                signup_source: &self.signup_source,
            },
            tags: &self.tags,
        };

        let response = self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&member)
            .send()
            .await
            .map_err(|e| WaitlistError::SinkFailure { sink: "mailchimp", reason: e.to_string() })?;

        ensure_success("mailchimp", &response)
    }
}

#[derive(Debug, Serialize)]
struct ConvertKitSubscriber<'a> {
    api_key: &'a str,
    email: &'a str,
    fields: ConvertKitFields<'a>,
}

#[derive(Debug, Serialize)]
struct ConvertKitFields<'a> {
    location: &'a str,
    signup_source: &'a str,
}

// Subscribes signups to a ConvertKit form instead of a Mailchimp list
pub struct ConvertKitSink {
    client: reqwest::Client,
    base_url: String,
    form_id: String,
    api_key: String,
    signup_source: String,
}

impl ConvertKitSink {
    pub fn new(client: reqwest::Client, base_url: &str, form_id: &str, api_key: &str, signup_source: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            form_id: form_id.to_string(),
            api_key: api_key.to_string(),
            signup_source: signup_source.to_string(),
        }
    }
}

#[async_trait]
impl SubscriptionSink for ConvertKitSink {
    fn name(&self) -> &'static str {
        "convertkit"
    }

    async fn subscribe(&self, email: &str, location: &str) -> Result<(), WaitlistError> {
        let url = join_url(&self.base_url, &["forms", self.form_id.as_str(), "subscribe"])?;

        let subscriber = ConvertKitSubscriber {
            api_key: &self.api_key,
            email,
            fields: ConvertKitFields {
                location,
                signup_source: &self.signup_source,
            },
        };

        let response = self.client
            .post(url)
            .json(&subscriber)
            .send()
            .await
            .map_err(|e| WaitlistError::SinkFailure { sink: "convertkit", reason: e.to_string() })?;

        ensure_success("convertkit", &response)
    }
}
