use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Format used for a post's publication date, e.g. "October 18, 2026".
pub const POST_DATE_FORMAT: &str = "%B %d, %Y";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// A user row that has not been inserted yet. The role is decided by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub body: String,
    pub img_url: String,
    pub author_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
    pub author_id: i64,
    pub date: String,
}

impl NewPost {
    /// Today's date in the post date format.
    #[must_use]
    pub fn today() -> String {
        Utc::now().format(POST_DATE_FORMAT).to_string()
    }
}

/// The editable fields of a post. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub img_url: Option<String>,
    pub author_id: Option<i64>,
}

impl PostChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subtitle.is_none()
            && self.body.is_none()
            && self.img_url.is_none()
            && self.author_id.is_none()
    }

    /// Applies the submitted fields. The publication date is never touched.
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(subtitle) = self.subtitle {
            post.subtitle = subtitle;
        }
        if let Some(body) = self.body {
            post.body = body;
        }
        if let Some(img_url) = self.img_url {
            post.img_url = img_url;
        }
        if let Some(author_id) = self.author_id {
            post.author_id = author_id;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
}

/// Server-side session row. `id` is a keyed digest of the cookie token, never the token itself.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
