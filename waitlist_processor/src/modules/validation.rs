use once_cell::sync::Lazy;
use regex::Regex;

// Loose `local@domain.tld` shape, same as the browser-side check
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const MAX_EMAIL_LENGTH: usize = 254;
const MIN_CUSTOM_LOCATION_LENGTH: usize = 2;
const MAX_CUSTOM_LOCATION_LENGTH: usize = 100;

// Location value the form uses when the city is typed in by hand
pub const OTHER_LOCATION: &str = "Other";

// Cities the product launches in first
pub const LAUNCH_MARKET_CITIES: [&str; 1] = ["Los Angeles"];

// Domains that are almost always a typo of a big provider
const COMMON_DOMAIN_TYPOS: [(&str, &str); 4] = [
    ("gmial.com", "gmail.com"),
    ("gmai.com", "gmail.com"),
    ("yahooo.com", "yahoo.com"),
    ("hotmial.com", "hotmail.com"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmailRequired,
    InvalidEmailFormat,
    EmailTooLong,
    // Carries the corrected address
    EmailSuggestion(String),
    LocationRequired,
    MissingCustomLocation,
    CustomLocationTooShort,
    CustomLocationTooLong,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmailRequired => write!(f, "Email is required"),
            ValidationError::InvalidEmailFormat => write!(f, "Please enter a valid email address"),
            ValidationError::EmailTooLong => write!(f, "Email address is too long"),
            ValidationError::EmailSuggestion(corrected) => write!(f, "Did you mean {}?", corrected),
            ValidationError::LocationRequired => write!(f, "Location is required"),
            ValidationError::MissingCustomLocation => write!(f, "Please specify your location"),
            ValidationError::CustomLocationTooShort => write!(f, "Location must be at least 2 characters"),
            ValidationError::CustomLocationTooLong => write!(f, "Location is too long"),
        }
    }
}

// Result of one or more independent checks, errors kept in check order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    // Messages as the form displays them
    pub fn message(&self) -> String {
        self.messages().join(" ")
    }

    fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self
    }
}

pub fn validate_email(email: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if email.is_empty() {
        errors.push(ValidationError::EmailRequired);
        return ValidationResult { errors };
    }

    if !EMAIL_REGEX.is_match(email) {
        errors.push(ValidationError::InvalidEmailFormat);
    }

    if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.push(ValidationError::EmailTooLong);
    }

    if let Some(corrected) = suggest_correction(email) {
        errors.push(ValidationError::EmailSuggestion(corrected));
    }

    ValidationResult { errors }
}

// Returns the address with a misspelled provider domain fixed, if any
fn suggest_correction(email: &str) -> Option<String> {
    let mut parts = email.split('@');
    let local = parts.next()?;
    let domain = parts.next()?.to_lowercase();

    COMMON_DOMAIN_TYPOS
        .iter()
        .find(|(typo, _)| *typo == domain)
        .map(|(_, correct)| format!("{}@{}", local, correct))
}

pub fn validate_location(location: &str, custom_location: Option<&str>) -> ValidationResult {
    let mut errors = Vec::new();

    if location.is_empty() {
        errors.push(ValidationError::LocationRequired);
    } else if location == OTHER_LOCATION {
        let custom = custom_location.map(str::trim).unwrap_or("");
        let length = custom.chars().count();
        if length == 0 {
            errors.push(ValidationError::MissingCustomLocation);
        } else if length < MIN_CUSTOM_LOCATION_LENGTH {
            errors.push(ValidationError::CustomLocationTooShort);
        } else if length > MAX_CUSTOM_LOCATION_LENGTH {
            errors.push(ValidationError::CustomLocationTooLong);
        }
    }

    ValidationResult { errors }
}

// Email errors first, then location errors
pub fn validate_form(email: &str, location: &str, custom_location: Option<&str>) -> ValidationResult {
    validate_email(email).merge(validate_location(location, custom_location))
}

pub fn is_launch_market(location: &str) -> bool {
    LAUNCH_MARKET_CITIES
        .iter()
        .any(|city| city.to_lowercase() == location.to_lowercase())
}
