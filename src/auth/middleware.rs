use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

use super::identity::{Identity, authorize_admin};
use super::session::{SESSION_COOKIE, read_cookie};
use crate::server::AppState;
use crate::server::response::PageError;
use crate::types::{Session, User};

/// The caller's identity, possibly anonymous.
pub struct CurrentUser(pub Identity);

/// Extractor that lets the request through only for the administrator.
pub struct RequireAdmin {
    pub user: User,
    pub session: Session,
}

#[derive(Debug)]
pub enum AuthError {
    NotAdmin,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::NotAdmin => PageError::forbidden("Admin access required"),
            AuthError::InternalError => PageError::internal("Internal server error"),
        }
        .into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(resolve_identity(parts, state)?))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = resolve_identity(parts, state)?;

        let (user, session) = authorize_admin(&identity).map_err(|_| {
            tracing::warn!(
                user_id = identity.user().map(|u| u.id),
                path = %parts.uri.path(),
                "Admin gate denied request"
            );
            AuthError::NotAdmin
        })?;

        Ok(RequireAdmin {
            user: user.clone(),
            session: session.clone(),
        })
    }
}

/// Resolves the session cookie once per request and caches the result in the
/// request extensions for later extractors.
pub(crate) fn resolve_identity(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<Identity, AuthError> {
    if let Some(identity) = parts.extensions.get::<Identity>() {
        return Ok(identity.clone());
    }

    let token = read_cookie(&parts.headers, SESSION_COOKIE);
    let identity = state
        .auth
        .current_user(state.store.as_ref(), token.as_deref())
        .map_err(|e| {
            tracing::error!("Failed to resolve session: {e}");
            AuthError::InternalError
        })?;

    parts.extensions.insert(identity.clone());
    Ok(identity)
}
