use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Datelike, Utc};
use serde::Serialize;

use super::AppState;
use super::flash::{FLASH_COOKIE, read_flash};
use crate::auth::{AuthError, Identity, removal_cookie, resolve_identity};
use crate::types::User;

/// Everything a page template would be handed.
#[derive(Debug, Serialize)]
pub struct Page<'a, T: Serialize> {
    pub page: &'static str,
    pub data: T,
    pub notices: &'a [String],
    pub current_user: Option<&'a User>,
    pub csrf_token: Option<&'a str>,
    pub year: i32,
}

/// Per-request rendering context: the caller's identity plus pending notices.
pub struct PageContext {
    pub identity: Identity,
    pub notices: Vec<String>,
}

impl PageContext {
    /// Renders a page. Pending notices are consumed by clearing the flash cookie.
    pub fn render<T: Serialize>(&self, page: &'static str, data: T) -> Response {
        let body = Page {
            page,
            data,
            notices: &self.notices,
            current_user: self.identity.user(),
            csrf_token: self.identity.session().map(|s| s.csrf_token.as_str()),
            year: Utc::now().year(),
        };

        let mut response = Json(body).into_response();

        if !self.notices.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&removal_cookie(FLASH_COOKIE)) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for PageContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve_identity(parts, state)?;
        let notices = read_flash(&parts.headers);
        Ok(PageContext { identity, notices })
    }
}
