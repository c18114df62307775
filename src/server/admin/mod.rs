mod posts;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

/// Post management. Every route here sits behind the admin gate.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/new-post", get(posts::new_post_page).post(posts::create_post))
        .route(
            "/edit-post/{id}",
            get(posts::edit_post_page).post(posts::edit_post),
        )
        .route("/delete/{id}", post(posts::delete_post))
}
