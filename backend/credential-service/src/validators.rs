use once_cell::sync::Lazy;
use regex::Regex;

/// Input validation utilities for the credential service

// Compile regex patterns once at startup
// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is hardcoded and validated - it is a compile-time constant in practice
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Callback paths must stay relative to the site origin
pub fn validate_callback_path(path: &str) -> bool {
    path.is_empty()
        || (url::Url::parse(path).is_err() && !path.starts_with("//") && !path.contains('\\'))
}

/// Base URL overrides must be absolute http(s) URLs
pub fn validate_base_url(base_url: &str) -> bool {
    base_url.is_empty()
        || url::Url::parse(base_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false)
}
