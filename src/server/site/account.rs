use std::sync::Arc;

use axum::{Form, extract::State, response::Response};

use crate::auth::{CurrentUser, IssuedSession, SessionManager};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{AccountFormData, LoginForm, RegisterForm};
use crate::server::flash::{
    DUPLICATE_EMAIL_NOTICE, LOGIN_FAILED_NOTICE, notice_for, notice_redirect,
};
use crate::server::page::PageContext;
use crate::server::response::{PageError, redirect_with_cookies};

pub async fn register_page(ctx: PageContext) -> Response {
    ctx.render("register", AccountFormData { action: "/register" })
}

pub async fn login_page(ctx: PageContext) -> Response {
    ctx.render("login", AccountFormData { action: "/login" })
}

/// Drops the caller's previous session, if any, and hands out the new one.
fn start_session(
    state: &AppState,
    previous: &CurrentUser,
    issued: &IssuedSession,
) -> Result<Response, PageError> {
    state.auth.logout(state.store.as_ref(), &previous.0)?;
    Ok(redirect_with_cookies(
        "/",
        [state.auth.sessions().cookie(&issued.token)],
    ))
}

pub async fn register(
    current: CurrentUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let form = match form.clean() {
        Ok(form) => form,
        Err(e) => return Ok(notice_redirect("/register", notice_for(&e))),
    };

    match state
        .auth
        .register(state.store.as_ref(), &form.email, &form.password, &form.name)
    {
        Ok((_, issued)) => start_session(&state, &current, &issued),
        Err(Error::DuplicateEmail) => {
            tracing::info!("Registration rejected: email already registered");
            Ok(notice_redirect("/login", DUPLICATE_EMAIL_NOTICE))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login(
    current: CurrentUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let form = match form.clean() {
        Ok(form) => form,
        Err(e) => return Ok(notice_redirect("/login", notice_for(&e))),
    };

    match state
        .auth
        .login(state.store.as_ref(), &form.email, &form.password)
    {
        Ok((_, issued)) => start_session(&state, &current, &issued),
        Err(e @ (Error::UnknownEmail | Error::InvalidPassword)) => {
            tracing::warn!("Login failed: {e}");
            Ok(notice_redirect("/login", LOGIN_FAILED_NOTICE))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(
    CurrentUser(identity): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> Result<Response, PageError> {
    state.auth.logout(state.store.as_ref(), &identity)?;
    Ok(redirect_with_cookies("/", [SessionManager::removal_cookie()]))
}
