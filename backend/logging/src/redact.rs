//! Log Redaction
//!
//! Scrubs API keys, bearer tokens, phone numbers and inline base64 image data
//! from strings prior to logging.

use once_cell::sync::Lazy;
use regex::Regex;

static TELEPHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{2,3}\)?[-.\s]?\d{4,5}[-.\s]?\d{4}").unwrap()
});
static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9_\-]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data:[a-z]+/[a-zA-Z0-9.+\-]+;base64,[A-Za-z0-9+/=]+").unwrap());
static BASE64_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9+/]{200,}={0,2}").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = DATA_URL_RE.replace_all(input, "[REDACTED_IMAGE]");
    let redacted = BASE64_RUN_RE.replace_all(&redacted, "[REDACTED_BASE64]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    TELEPHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").into_owned()
}

/// Cap a string at `max_chars` characters for log output.
pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}… ({} chars)", &input[..idx], input.chars().count()),
        None => input.to_string(),
    }
}
