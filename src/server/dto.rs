use serde::{Deserialize, Serialize};

use super::validation::{Field, Rule, validate_fields};
use crate::error::{Error, Result};
use crate::types::{CommentWithAuthor, Post, PostChanges, PostWithAuthor};

const EMAIL_RULES: &[Rule] = &[Rule::Required, Rule::Email, Rule::MaxLength(100)];
const TITLE_RULES: &[Rule] = &[Rule::Required, Rule::MaxLength(250)];
const BODY_RULES: &[Rule] = &[Rule::Required];
const IMG_URL_RULES: &[Rule] = &[Rule::Required, Rule::Url, Rule::MaxLength(250)];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterForm {
    /// Trims the text fields and validates them. The password is kept verbatim.
    pub fn clean(mut self) -> Result<Self> {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();

        validate_fields(&[
            Field::new("Email", &self.email, EMAIL_RULES),
            Field::new(
                "Password",
                &self.password,
                &[Rule::Required, Rule::MinLength(6), Rule::MaxLength(128)],
            ),
            Field::new("Name", &self.name, &[Rule::Required, Rule::MaxLength(1000)]),
        ])?;
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn clean(mut self) -> Result<Self> {
        self.email = self.email.trim().to_string();

        validate_fields(&[
            Field::new("Email", &self.email, &[Rule::Required, Rule::Email]),
            Field::new("Password", &self.password, &[Rule::Required]),
        ])?;
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub comment: String,
    pub csrf_token: String,
}

impl CommentForm {
    pub fn clean(mut self) -> Result<Self> {
        self.comment = self.comment.trim().to_string();

        validate_fields(&[Field::new("Comment", &self.comment, &[Rule::Required])])?;
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
    pub csrf_token: String,
}

impl PostForm {
    pub fn clean(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        self.subtitle = self.subtitle.trim().to_string();
        self.body = self.body.trim().to_string();
        self.img_url = self.img_url.trim().to_string();

        validate_fields(&[
            Field::new("Title", &self.title, TITLE_RULES),
            Field::new("Subtitle", &self.subtitle, TITLE_RULES),
            Field::new("Body", &self.body, BODY_RULES),
            Field::new("Image URL", &self.img_url, IMG_URL_RULES),
        ])?;
        Ok(self)
    }
}

/// Edit submission. Fields left out of the form are left unchanged on the post.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EditPostForm {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub img_url: Option<String>,
    pub author_id: Option<String>,
    pub csrf_token: String,
}

impl EditPostForm {
    pub fn into_changes(self) -> Result<PostChanges> {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        let title = trim(self.title);
        let subtitle = trim(self.subtitle);
        let body = trim(self.body);
        let img_url = trim(self.img_url);

        let mut fields = Vec::new();
        if let Some(title) = &title {
            fields.push(Field::new("Title", title, TITLE_RULES));
        }
        if let Some(subtitle) = &subtitle {
            fields.push(Field::new("Subtitle", subtitle, TITLE_RULES));
        }
        if let Some(body) = &body {
            fields.push(Field::new("Body", body, BODY_RULES));
        }
        if let Some(img_url) = &img_url {
            fields.push(Field::new("Image URL", img_url, IMG_URL_RULES));
        }
        validate_fields(&fields)?;

        let author_id = match self.author_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                Error::ValidationFailed(format!("Author '{raw}' is not a valid user id"))
            })?),
        };

        Ok(PostChanges {
            title,
            subtitle,
            body,
            img_url,
            author_id,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CsrfForm {
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct IndexData {
    pub posts: Vec<PostWithAuthor>,
}

#[derive(Debug, Serialize)]
pub struct PostPageData {
    pub post: PostWithAuthor,
    pub comments: Vec<CommentWithAuthor>,
    pub can_comment: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountFormData {
    pub action: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StaticPageData {
    pub heading: &'static str,
    pub subheading: &'static str,
}

/// Values a post editor form starts out with.
#[derive(Debug, Serialize)]
pub struct PostFormData {
    pub action: String,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
}

impl PostFormData {
    #[must_use]
    pub fn blank(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: String::new(),
            subtitle: String::new(),
            body: String::new(),
            img_url: String::new(),
            author_id: None,
        }
    }

    #[must_use]
    pub fn from_post(post: &Post) -> Self {
        Self {
            action: format!("/edit-post/{}", post.id),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            body: post.body.clone(),
            img_url: post.img_url.clone(),
            author_id: Some(post.author_id),
        }
    }
}
