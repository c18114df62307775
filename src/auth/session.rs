use axum::http::{HeaderMap, header::COOKIE};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::Session;

pub const SESSION_COOKIE: &str = "quill_session";

const TOKEN_BYTES: usize = 32;

/// A freshly created session. `token` goes to the client and is never stored.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Issues, resolves and revokes server-side sessions.
pub struct SessionManager {
    secret: String,
    ttl: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Derives the stored session id from a cookie token, keyed by the server secret.
    #[must_use]
    pub fn session_id(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn issue(&self, store: &dyn Store, user_id: i64) -> Result<IssuedSession> {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            id: self.session_id(&token),
            user_id,
            csrf_token: Uuid::new_v4().simple().to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        store.create_session(&session)?;
        Ok(IssuedSession { token, session })
    }

    /// Looks up the session behind a cookie token. Expired sessions are deleted and
    /// reported as absent.
    pub fn resolve(&self, store: &dyn Store, token: &str) -> Result<Option<Session>> {
        let Some(session) = store.get_session(&self.session_id(token))? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            store.delete_session(&session.id)?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Set-Cookie value carrying a session token.
    #[must_use]
    pub fn cookie(&self, token: &str) -> String {
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(self.ttl.num_seconds()))
            .build()
            .to_string()
    }

    /// Set-Cookie value that clears the session cookie.
    #[must_use]
    pub fn removal_cookie() -> String {
        removal_cookie(SESSION_COOKIE)
    }
}

/// Generates 32 random bytes, base64url encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns the value of the named cookie across all Cookie headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(std::result::Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

#[must_use]
pub fn removal_cookie(name: &'static str) -> String {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie.to_string()
}

/// Compares a submitted CSRF token against the session's without short-circuiting.
#[must_use]
pub fn csrf_matches(expected: &str, submitted: &str) -> bool {
    let (a, b) = (expected.as_bytes(), submitted.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::store::SqliteStore;
    use crate::types::NewUser;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn store_with_user() -> (SqliteStore, i64) {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let user = store
            .create_user(&NewUser {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                name: "Alice".to_string(),
            })
            .unwrap();
        (store, user.id)
    }

    #[test]
    fn test_session_id_is_keyed() {
        let first = SessionManager::new(SECRET, 1);
        let second = SessionManager::new("another-secret-another-secret-xx", 1);

        let id = first.session_id("token");
        assert_eq!(id.len(), 64);
        assert_eq!(id, first.session_id("token"));
        assert_ne!(id, second.session_id("token"));
        assert!(!id.contains("token"));
    }

    #[test]
    fn test_issue_and_resolve() {
        let (store, user_id) = store_with_user();
        let manager = SessionManager::new(SECRET, 1);

        let issued = manager.issue(&store, user_id).unwrap();
        assert_ne!(issued.session.id, issued.token);

        let resolved = manager.resolve(&store, &issued.token).unwrap().unwrap();
        assert_eq!(resolved.user_id, user_id);
        assert_eq!(resolved.csrf_token, issued.session.csrf_token);

        assert!(manager.resolve(&store, "forged").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let (store, user_id) = store_with_user();
        let manager = SessionManager::new(SECRET, 0);

        let issued = manager.issue(&store, user_id).unwrap();

        assert!(manager.resolve(&store, &issued.token).unwrap().is_none());
        assert!(store.get_session(&issued.session.id).unwrap().is_none());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; quill_session=abc"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));

        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, "other").as_deref(), Some("1"));
        assert!(read_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let manager = SessionManager::new(SECRET, 2);
        let cookie = manager.cookie("tok");

        assert!(cookie.starts_with("quill_session=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=7200"));
    }

    #[test]
    fn test_csrf_matches() {
        assert!(csrf_matches("abc", "abc"));
        assert!(!csrf_matches("abc", "abd"));
        assert!(!csrf_matches("abc", ""));
    }
}
