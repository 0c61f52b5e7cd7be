//! Input validation for short codes, destinations and redirect codes.

use crate::error::AppError;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use url::Url;

pub const MAX_SHORT_CODE_LEN: usize = 32;
pub const MAX_TARGET_URL_LEN: usize = 2048;

/// Redirect status codes a link may use.
pub const ALLOWED_REDIRECT_CODES: [i32; 2] = [301, 302];

/// Segments of `[A-Za-z0-9_-]` joined by single slashes.
pub static SHORT_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+(/[a-zA-Z0-9_-]+)*$").unwrap());

/// Codes that would shadow service routes.
const RESERVED_CODES: &[&str] = &["api", "health"];

/// Syntax check used on the redirect path; never touches a store.
pub fn is_valid_short_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_SHORT_CODE_LEN && SHORT_CODE_REGEX.is_match(code)
}

/// Validates a code for a new link.
///
/// # Rules
///
/// - 1 to 32 characters
/// - Segments of letters, digits, `_` and `-`, separated by `/`
/// - First segment cannot be a reserved route (`api`, `health`)
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_short_code(code: &str) -> Result<(), AppError> {
    if code.is_empty() || code.len() > MAX_SHORT_CODE_LEN {
        return Err(AppError::bad_request(
            format!("Short code must be 1-{MAX_SHORT_CODE_LEN} characters"),
            json!({ "provided_length": code.len() }),
        ));
    }

    if !SHORT_CODE_REGEX.is_match(code) {
        return Err(AppError::bad_request(
            "Short code may only contain letters, digits, '_' and '-', in segments separated by '/'",
            json!({ "shortCode": code }),
        ));
    }

    let first_segment = code.split('/').next().unwrap_or(code);
    if RESERVED_CODES.contains(&first_segment) {
        return Err(AppError::bad_request(
            "This short code is reserved",
            json!({ "shortCode": code }),
        ));
    }

    Ok(())
}

/// Validates a destination address.
///
/// Must be an absolute `http` or `https` URL of at most 2048 characters.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_target_url(target_url: &str) -> Result<(), AppError> {
    if target_url.trim().is_empty() {
        return Err(AppError::bad_request(
            "Target URL is required",
            json!({}),
        ));
    }

    if target_url.len() > MAX_TARGET_URL_LEN {
        return Err(AppError::bad_request(
            format!("Target URL must be at most {MAX_TARGET_URL_LEN} characters"),
            json!({ "provided_length": target_url.len() }),
        ));
    }

    let parsed = Url::parse(target_url).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::bad_request(
            "Only HTTP and HTTPS URLs are allowed",
            json!({ "scheme": parsed.scheme() }),
        ));
    }

    Ok(())
}

/// Validates the HTTP status used for the redirect.
///
/// # Errors
///
/// Returns [`AppError::Validation`] unless the code is 301 or 302.
pub fn validate_redirect_code(redirect_code: i32) -> Result<(), AppError> {
    if !ALLOWED_REDIRECT_CODES.contains(&redirect_code) {
        return Err(AppError::bad_request(
            "Redirect code must be 301 or 302",
            json!({ "redirectCode": redirect_code }),
        ));
    }
    Ok(())
}
