use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use toml;

use crate::modules::error::WaitlistError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub dispatcher: DispatcherConfig,
    pub rate_limiter: RateLimiterConfig,
    pub spreadsheet: SpreadsheetConfig,
    pub mailing_list: MailingListConfig,
    #[serde(default)]
    pub exec: ExecConfig,
}

// Longest accepted rate-limit window, one year in seconds
pub const MAX_WINDOW_LENGTH: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    // Peers whose X-Forwarded-For header is believed. Empty means every
    // caller is identified by its socket address.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    // Spreadsheet append + duplicate query + email-marketing subscribe
    Sheets,
    // Single combined GET endpoint
    Exec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    pub transport: Transport,
    // Seconds allowed for each external call
    pub sink_timeout: u64,
    pub source_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimiterConfig {
    pub max_submissions: u32,
    // Seconds
    pub window_length: u64,
    pub max_entries: usize,
    // Seconds between sweeps of expired entries
    pub sweep_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetConfig {
    pub base_url: String,
    pub sheet_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Mailchimp,
    Convertkit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailingListConfig {
    pub provider: EmailProvider,
    pub tags: Vec<String>,
    pub signup_source: String,
    pub convertkit_base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecConfig {
    pub url: Option<String>,
}

// Credentials and identifiers that never live in Config.toml
#[derive(Clone, Default)]
pub struct Secrets {
    pub google_sheets_api_key: Option<String>,
    pub google_spreadsheet_id: Option<String>,
    pub mailchimp_api_key: Option<String>,
    pub mailchimp_list_id: Option<String>,
    pub mailchimp_server_prefix: String,
    pub convertkit_api_key: Option<String>,
    pub convertkit_form_id: Option<String>,
    pub exec_url: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Empty values count as absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            google_sheets_api_key: get("GOOGLE_SHEETS_API_KEY"),
            google_spreadsheet_id: get("GOOGLE_SPREADSHEET_ID"),
            mailchimp_api_key: get("MAILCHIMP_API_KEY"),
            mailchimp_list_id: get("MAILCHIMP_LIST_ID"),
            mailchimp_server_prefix: get("MAILCHIMP_SERVER_PREFIX").unwrap_or_else(|| "us1".to_string()),
            convertkit_api_key: get("CONVERTKIT_API_KEY"),
            convertkit_form_id: get("CONVERTKIT_FORM_ID"),
            exec_url: get("WAITLIST_EXEC_URL"),
        }
    }
}

pub fn load_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

// Returns the value of a mandatory secret or a descriptive error
pub fn require<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str, WaitlistError> {
    value
        .as_deref()
        .ok_or_else(|| WaitlistError::ConfigError(format!("Missing required environment variable: {}", name)))
}

fn require_url(name: &str, value: &str) -> Result<(), WaitlistError> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|e| WaitlistError::ConfigError(format!("Invalid URL for {}: {}", name, e)))
}

// Checked once at startup, the process exits if this fails
pub fn validate_config(config: &Config, secrets: &Secrets) -> Result<(), WaitlistError> {
    config
        .server
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|e| WaitlistError::ConfigError(format!("Invalid server.bind_address: {}", e)))?;

    if config.dispatcher.sink_timeout == 0 {
        return Err(WaitlistError::ConfigError("dispatcher.sink_timeout must be positive".to_string()));
    }

    let limits = &config.rate_limiter;
    if limits.max_submissions == 0 || limits.window_length == 0 || limits.max_entries == 0 || limits.sweep_interval == 0 {
        return Err(WaitlistError::ConfigError("rate_limiter values must all be positive".to_string()));
    }
    if limits.window_length > MAX_WINDOW_LENGTH {
        return Err(WaitlistError::ConfigError(format!(
            "rate_limiter.window_length must be at most {} seconds",
            MAX_WINDOW_LENGTH
        )));
    }

    match config.dispatcher.transport {
        Transport::Sheets => {
            require_url("spreadsheet.base_url", &config.spreadsheet.base_url)?;
            require("GOOGLE_SHEETS_API_KEY", &secrets.google_sheets_api_key)?;
            require("GOOGLE_SPREADSHEET_ID", &secrets.google_spreadsheet_id)?;

            match config.mailing_list.provider {
                EmailProvider::Mailchimp => {
                    require("MAILCHIMP_API_KEY", &secrets.mailchimp_api_key)?;
                    require("MAILCHIMP_LIST_ID", &secrets.mailchimp_list_id)?;
                    require_url(
                        "MAILCHIMP_SERVER_PREFIX",
                        &format!("https://{}.api.mailchimp.com", secrets.mailchimp_server_prefix),
                    )?;
                }
                EmailProvider::Convertkit => {
                    require_url("mailing_list.convertkit_base_url", &config.mailing_list.convertkit_base_url)?;
                    require("CONVERTKIT_API_KEY", &secrets.convertkit_api_key)?;
                    require("CONVERTKIT_FORM_ID", &secrets.convertkit_form_id)?;
                }
            }
        }
        Transport::Exec => {
            let url = exec_url(config, secrets)?;
            require_url("WAITLIST_EXEC_URL", url)?;
        }
    }

    Ok(())
}

// Environment wins over the file
pub fn exec_url<'a>(config: &'a Config, secrets: &'a Secrets) -> Result<&'a str, WaitlistError> {
    secrets
        .exec_url
        .as_deref()
        .or(config.exec.url.as_deref())
        .ok_or_else(|| WaitlistError::ConfigError("Missing required environment variable: WAITLIST_EXEC_URL".to_string()))
}
