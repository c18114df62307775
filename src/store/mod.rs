mod schema;
mod sqlite;
pub mod url;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::types::*;

/// Row counts reported by `quill init`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreStats {
    pub users: i64,
    pub posts: i64,
    pub comments: i64,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn get_admin(&self) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn delete_user(&self, id: i64) -> Result<bool>;

    // Post operations
    fn create_post(&self, post: &NewPost) -> Result<Post>;
    fn get_post(&self, id: i64) -> Result<Option<Post>>;
    fn get_post_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>>;
    fn list_posts(&self) -> Result<Vec<PostWithAuthor>>;
    fn update_post(&self, post: &Post) -> Result<()>;
    fn delete_post(&self, id: i64) -> Result<bool>;

    // Comment operations
    fn create_comment(&self, comment: &NewComment) -> Result<Comment>;
    fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    fn list_comments(&self) -> Result<Vec<Comment>>;
    fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;
    fn delete_comment(&self, id: i64) -> Result<bool>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session(&self, id: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;
    fn count_sessions(&self) -> Result<i64>;

    fn stats(&self) -> Result<StoreStats>;
}
