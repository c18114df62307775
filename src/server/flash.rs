//! One-shot notices carried across a redirect in a short-lived cookie.

use axum::http::HeaderMap;
use axum::response::Response;
use cookie::{Cookie, SameSite};

use super::response::redirect_with_cookies;
use crate::auth::read_cookie;
use crate::error::Error;

pub const FLASH_COOKIE: &str = "quill_flash";

const FLASH_MAX_AGE_SECS: i64 = 60;

pub const LOGIN_FAILED_NOTICE: &str = "Invalid email or password. Please try again.";
pub const DUPLICATE_EMAIL_NOTICE: &str = "That email is already registered. Please log in instead.";
pub const LOGIN_TO_COMMENT_NOTICE: &str = "Please log in or register to comment on a post.";

/// Set-Cookie value holding the given notices.
#[must_use]
pub fn flash_cookie(messages: &[String]) -> String {
    let json = serde_json::to_string(messages).unwrap_or_default();
    Cookie::build((FLASH_COOKIE, urlencoding::encode(&json).into_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(FLASH_MAX_AGE_SECS))
        .build()
        .to_string()
}

/// Notices carried by the request, empty if none or unreadable.
#[must_use]
pub fn read_flash(headers: &HeaderMap) -> Vec<String> {
    let Some(raw) = read_cookie(headers, FLASH_COOKIE) else {
        return Vec::new();
    };

    let decoded = match urlencoding::decode(&raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Undecodable flash cookie: {e}");
            return Vec::new();
        }
    };

    serde_json::from_str(&decoded).unwrap_or_else(|e| {
        tracing::warn!("Malformed flash cookie: {e}");
        Vec::new()
    })
}

/// Redirects with a notice for the next page render.
pub fn notice_redirect(to: &str, message: impl Into<String>) -> Response {
    redirect_with_cookies(to, [flash_cookie(&[message.into()])])
}

/// The user-facing text for a recoverable failure.
#[must_use]
pub fn notice_for(err: &Error) -> String {
    match err {
        Error::ValidationFailed(message) => message.clone(),
        Error::UnknownEmail | Error::InvalidPassword => LOGIN_FAILED_NOTICE.to_string(),
        Error::DuplicateEmail => DUPLICATE_EMAIL_NOTICE.to_string(),
        other => {
            let text = other.to_string();
            let mut chars = text.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => text,
            }
        }
    }
}
