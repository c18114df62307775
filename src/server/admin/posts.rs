use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::Response,
};

use crate::auth::RequireAdmin;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CsrfForm, EditPostForm, PostForm, PostFormData};
use crate::server::flash::{notice_for, notice_redirect};
use crate::server::page::PageContext;
use crate::server::response::{PageError, PathId, StoreOptionExt, redirect, verify_csrf};
use crate::types::NewPost;

pub async fn new_post_page(_admin: RequireAdmin, ctx: PageContext) -> Response {
    ctx.render("make-post", PostFormData::blank("/new-post"))
}

pub async fn create_post(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Form(form): Form<PostForm>,
) -> Result<Response, PageError> {
    verify_csrf(&admin.session, &form.csrf_token)?;

    let form = match form.clean() {
        Ok(form) => form,
        Err(e) => return Ok(notice_redirect("/new-post", notice_for(&e))),
    };

    let created = state.store.create_post(&NewPost {
        title: form.title,
        subtitle: form.subtitle,
        body: form.body,
        img_url: form.img_url,
        author_id: admin.user.id,
        date: NewPost::today(),
    });

    match created {
        Ok(post) => {
            tracing::info!(post_id = post.id, title = %post.title, "Created post");
            Ok(redirect("/"))
        }
        Err(e @ Error::DuplicateTitle(_)) => Ok(notice_redirect("/new-post", notice_for(&e))),
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_post_page(
    _admin: RequireAdmin,
    ctx: PageContext,
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<Response, PageError> {
    let post = state.store.get_post(id)?.or_not_found("Post not found")?;
    Ok(ctx.render("make-post", PostFormData::from_post(&post)))
}

pub async fn edit_post(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
    Form(form): Form<EditPostForm>,
) -> Result<Response, PageError> {
    verify_csrf(&admin.session, &form.csrf_token)?;

    let mut post = state.store.get_post(id)?.or_not_found("Post not found")?;
    let back = format!("/edit-post/{id}");

    let changes = match form.into_changes() {
        Ok(changes) => changes,
        Err(e) => return Ok(notice_redirect(&back, notice_for(&e))),
    };

    if let Some(author_id) = changes.author_id {
        if state.store.get_user(author_id)?.is_none() {
            return Ok(notice_redirect(&back, "Author not found"));
        }
    }

    if !changes.is_empty() {
        changes.apply(&mut post);
        match state.store.update_post(&post) {
            Ok(()) => tracing::info!(post_id = id, "Updated post"),
            Err(e @ Error::DuplicateTitle(_)) => {
                return Ok(notice_redirect(&back, notice_for(&e)));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(redirect(&format!("/post/{id}")))
}

pub async fn delete_post(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
    Form(form): Form<CsrfForm>,
) -> Result<Response, PageError> {
    verify_csrf(&admin.session, &form.csrf_token)?;

    if state.store.delete_post(id)? {
        tracing::info!(post_id = id, user_id = admin.user.id, "Deleted post");
    } else {
        tracing::warn!(post_id = id, "Delete requested for missing post");
    }

    Ok(redirect("/"))
}
