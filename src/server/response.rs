use axum::{
    Json,
    extract::{FromRequestParts, Path},
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chrono::{Datelike, Utc};
use serde_json::json;

use crate::auth::csrf_matches;
use crate::error::Error;
use crate::types::Session;

/// Error page that converts to a proper HTTP response
#[derive(Debug)]
pub struct PageError {
    pub status: StatusCode,
    pub message: String,
}

impl PageError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let body = json!({
            "page": "error",
            "data": null,
            "error": self.message,
            "notices": [],
            "current_user": null,
            "csrf_token": null,
            "year": Utc::now().year(),
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for PageError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound => PageError::not_found("Not found"),
            Error::Forbidden => PageError::forbidden("Forbidden"),
            Error::ValidationFailed(message) => PageError::bad_request(message),
            other if other.is_recoverable() => PageError::bad_request(other.to_string()),
            other => {
                tracing::error!("Request failed: {other}");
                PageError::internal("Internal server error")
            }
        }
    }
}

/// Extension for Option types from store operations.
pub trait StoreOptionExt<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, PageError>;
}

impl<T> StoreOptionExt<T> for Option<T> {
    fn or_not_found(self, message: &'static str) -> Result<T, PageError> {
        self.ok_or_else(|| PageError::not_found(message))
    }
}

/// Integer `{id}` route segment. Anything else is a 404 page.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(path = %parts.uri.path(), "Rejected route id: {e}");
                PageError::not_found("Not found")
            })?;
        Ok(PathId(id))
    }
}

/// 303 redirect after a form submission.
#[must_use]
pub fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

/// 303 redirect that also sets cookies.
pub fn redirect_with_cookies<I>(to: &str, cookies: I) -> Response
where
    I: IntoIterator<Item = String>,
{
    let headers: Vec<_> = cookies.into_iter().map(|c| (SET_COOKIE, c)).collect();
    (AppendHeaders(headers), Redirect::to(to)).into_response()
}

/// Rejects a state-changing form whose CSRF token does not match the session.
pub fn verify_csrf(session: &Session, submitted: &str) -> Result<(), PageError> {
    if csrf_matches(&session.csrf_token, submitted) {
        Ok(())
    } else {
        tracing::warn!(user_id = session.user_id, "CSRF token mismatch");
        Err(PageError::forbidden("Invalid or missing CSRF token"))
    }
}
