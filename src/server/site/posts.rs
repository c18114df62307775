use std::sync::Arc;

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::Response,
};

use crate::auth::CurrentUser;
use crate::server::AppState;
use crate::server::dto::{CommentForm, IndexData, PostPageData};
use crate::server::flash::{LOGIN_TO_COMMENT_NOTICE, notice_for, notice_redirect};
use crate::server::page::PageContext;
use crate::server::response::{PageError, PathId, StoreOptionExt, redirect, verify_csrf};
use crate::types::NewComment;

pub async fn index(
    ctx: PageContext,
    State(state): State<Arc<AppState>>,
) -> Result<Response, PageError> {
    let posts = state.store.list_posts()?;
    Ok(ctx.render("index", IndexData { posts }))
}

pub async fn show_post(
    ctx: PageContext,
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<Response, PageError> {
    let post = state
        .store
        .get_post_with_author(id)?
        .or_not_found("Post not found")?;
    let comments = state.store.list_comments_for_post(id)?;

    Ok(ctx.render(
        "post",
        PostPageData {
            post,
            comments,
            can_comment: ctx.identity.is_authenticated(),
        },
    ))
}

pub async fn add_comment(
    CurrentUser(identity): CurrentUser,
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Result<Response, PageError> {
    let (Some(user), Some(session)) = (identity.user(), identity.session()) else {
        tracing::info!(post_id = id, "Anonymous comment rejected");
        return Ok(notice_redirect("/login", LOGIN_TO_COMMENT_NOTICE));
    };
    let Form(form) = form.map_err(|e| PageError::bad_request(e.body_text()))?;
    verify_csrf(session, &form.csrf_token)?;

    state.store.get_post(id)?.or_not_found("Post not found")?;

    let back = format!("/post/{id}");
    let form = match form.clean() {
        Ok(form) => form,
        Err(e) => return Ok(notice_redirect(&back, notice_for(&e))),
    };

    let comment = state.store.create_comment(&NewComment {
        text: form.comment,
        author_id: user.id,
        post_id: id,
    })?;

    tracing::info!(
        comment_id = comment.id,
        post_id = id,
        user_id = user.id,
        "Comment added"
    );
    Ok(redirect(&back))
}
