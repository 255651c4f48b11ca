use std::fmt;

pub const MISSING_FIELD_MESSAGE: &str = "Email and location are required";
pub const RATE_LIMITED_MESSAGE: &str = "Too many submissions. Please try again later.";
pub const DUPLICATE_EMAIL_MESSAGE: &str = "This email is already on our waitlist!";
pub const SINK_FAILURE_MESSAGE: &str = "Unable to process your request. Please try again.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

// Custom WaitlistError so that every failure in the pipeline can be turned into
// one of the fixed user-facing messages at the dispatcher boundary.
// Clone is needed because sink results are logged and then aggregated.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitlistError {
    // Email or location was left empty
    MissingField,
    // Validator rejected the form, contains the messages in check order
    ValidationError(Vec<String>),
    // Caller exceeded the submissions allowed in the current window
    RateLimited,
    // Email is already present in the spreadsheet
    DuplicateEmail,
    // A sink was unreachable or rejected the request
    SinkFailure { sink: &'static str, reason: String },
    // A sink did not answer within the configured timeout
    Timeout(&'static str),
    // A sink answered with a body that could not be understood
    JsonDeserializationError(String),
    // Mandatory configuration is absent or malformed
    ConfigError(String),
    // Anything else, including panics caught at the dispatcher boundary
    UnexpectedError(String),
}

impl WaitlistError {
    // The message shown to the person filling in the form.
    // Never contains internal detail.
    pub fn user_message(&self) -> String {
        match self {
            WaitlistError::MissingField => MISSING_FIELD_MESSAGE.to_string(),
            WaitlistError::ValidationError(errors) => errors.join(" "),
            WaitlistError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            WaitlistError::DuplicateEmail => DUPLICATE_EMAIL_MESSAGE.to_string(),
            WaitlistError::SinkFailure { .. }
            | WaitlistError::Timeout(_)
            | WaitlistError::JsonDeserializationError(_) => SINK_FAILURE_MESSAGE.to_string(),
            WaitlistError::ConfigError(_) | WaitlistError::UnexpectedError(_) => {
                UNEXPECTED_ERROR_MESSAGE.to_string()
            }
        }
    }

    // Rejections the user can correct, as opposed to operational failures
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            WaitlistError::MissingField
                | WaitlistError::ValidationError(_)
                | WaitlistError::RateLimited
                | WaitlistError::DuplicateEmail
        )
    }
}

impl fmt::Display for WaitlistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitlistError::MissingField => write!(f, "Missing field: email and location are required"),
            WaitlistError::ValidationError(errors) => write!(f, "Validation error: {}", errors.join(" ")),
            WaitlistError::RateLimited => write!(f, "Rate limited"),
            WaitlistError::DuplicateEmail => write!(f, "Duplicate email"),
            WaitlistError::SinkFailure { sink, reason } => write!(f, "Sink failure ({}): {}", sink, reason),
            WaitlistError::Timeout(sink) => write!(f, "Timeout waiting for {}", sink),
            WaitlistError::JsonDeserializationError(err) => write!(f, "JSON deserialization error: {}", err),
            WaitlistError::ConfigError(err) => write!(f, "Configuration error: {}", err),
            WaitlistError::UnexpectedError(err) => write!(f, "Unexpected error: {}", err),
        }
    }
}

impl std::error::Error for WaitlistError {}
