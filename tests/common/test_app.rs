#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{
    Request, StatusCode,
    header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
};
use quill::auth::{Argon2Policy, Authenticator, SessionManager};
use quill::server::{AppState, create_router};
use quill::store::{SqliteStore, Store};
use quill::types::{NewPost, NewUser, Post, User};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "correct horse";

/// The router wired to a throwaway database, driven in-process.
pub struct TestApp {
    _temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` of a cookie this response sets to a non-empty value.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies
            .iter()
            .map(|c| c.split(';').next().unwrap_or_default().to_string())
            .find(|pair| pair.starts_with(&prefix) && pair.len() > prefix.len())
    }

    pub fn clears_cookie(&self, name: &str) -> bool {
        let prefix = format!("{name}=;");
        self.set_cookies.iter().any(|c| c.starts_with(&prefix))
    }

    pub fn session_cookie(&self) -> Option<String> {
        self.cookie("quill_session")
    }

    pub fn flash_cookie(&self) -> Option<String> {
        self.cookie("quill_flash")
    }

    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.body);
        assert_eq!(self.location.as_deref(), Some(to));
    }

    pub fn notices(&self) -> Vec<String> {
        self.body["notices"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("quill.db")).expect("open store"));
        store.initialize().expect("initialize store");

        let auth = Authenticator::new(
            Arc::new(Argon2Policy::fast()),
            SessionManager::new(SECRET, 24),
        );
        let state = Arc::new(AppState::new(store.clone(), auth));

        Self {
            _temp_dir: temp_dir,
            store,
            router: create_router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            location,
            set_cookies,
            body,
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::from(encoded)).unwrap()).await
    }

    /// POST with a body but no content type.
    pub async fn post_raw(&self, path: &str, cookie: Option<&str>, body: &str) -> TestResponse {
        let mut request = Request::builder().method("POST").uri(path);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Registers through the web form and returns the session cookie pair.
    pub async fn register(&self, email: &str, name: &str) -> String {
        let response = self
            .post_form(
                "/register",
                None,
                &[("email", email), ("password", PASSWORD), ("name", name)],
            )
            .await;
        response.assert_redirect("/");
        response.session_cookie().expect("registration sets a session")
    }

    /// The CSRF token bound to the session behind `cookie`.
    pub async fn csrf_token(&self, cookie: &str) -> String {
        let response = self.get("/", Some(cookie)).await;
        response.body["csrf_token"]
            .as_str()
            .expect("authenticated page carries a csrf token")
            .to_string()
    }

    pub fn insert_user(&self, email: &str, name: &str) -> User {
        self.store
            .create_user(&NewUser {
                email: email.to_string(),
                password_hash: "unused".to_string(),
                name: name.to_string(),
            })
            .expect("create user")
    }

    pub fn insert_post(&self, title: &str, author_id: i64, date: &str) -> Post {
        self.store
            .create_post(&NewPost {
                title: title.to_string(),
                subtitle: format!("{title} subtitle"),
                body: format!("{title} body"),
                img_url: "https://example.com/cover.png".to_string(),
                author_id,
                date: date.to_string(),
            })
            .expect("create post")
    }

    pub fn session_count(&self) -> i64 {
        self.store.count_sessions().expect("count sessions")
    }
}
