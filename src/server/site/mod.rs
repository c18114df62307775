mod account;
mod pages;
mod posts;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;

/// Public pages, account flows and comments.
pub fn site_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(posts::index))
        .route("/post/{id}", get(posts::show_post).post(posts::add_comment))
        // Account routes
        .route(
            "/register",
            get(account::register_page).post(account::register),
        )
        .route("/login", get(account::login_page).post(account::login))
        .route("/logout", get(account::logout).post(account::logout))
        // Static pages
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
}
