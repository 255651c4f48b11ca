use crate::modules::validation::OTHER_LOCATION;

const MAX_INPUT_LENGTH: usize = 500;
const DISALLOWED_CHARACTERS: [char; 5] = ['<', '>', '"', '\'', '&'];

// Clean a free-text value before it leaves the process.
// Characters are stripped before trimming, and the truncated tail is trimmed
// again, so running it twice gives the same result as running it once.
pub fn sanitize(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !DISALLOWED_CHARACTERS.contains(c))
        .collect();

    let truncated: String = stripped.trim().chars().take(MAX_INPUT_LENGTH).collect();
    truncated.trim_end().to_string()
}

// The location value that is stored: the typed-in city for "Other", else the picked one
pub fn format_location(location: &str, custom_location: Option<&str>) -> String {
    match custom_location {
        Some(custom) if location == OTHER_LOCATION => sanitize(custom),
        _ => sanitize(location),
    }
}
