use std::sync::{Arc, OnceLock};

use super::identity::Identity;
use super::password::PasswordPolicy;
use super::session::{IssuedSession, SessionManager};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{NewUser, User};

// Verified against when the email is unknown, so both login failures cost one hash.
const DUMMY_PASSWORD: &str = "quill-unknown-account";

/// Registration, login, logout and the current-user accessor.
pub struct Authenticator {
    passwords: Arc<dyn PasswordPolicy>,
    sessions: SessionManager,
    dummy_hash: OnceLock<String>,
}

impl Authenticator {
    #[must_use]
    pub fn new(passwords: Arc<dyn PasswordPolicy>, sessions: SessionManager) -> Self {
        Self {
            passwords,
            sessions,
            dummy_hash: OnceLock::new(),
        }
    }

    fn dummy_hash(&self) -> Result<&str> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash);
        }
        let hash = self.passwords.hash(DUMMY_PASSWORD)?;
        Ok(self.dummy_hash.get_or_init(|| hash))
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Creates an account and logs it in. Fails with `DuplicateEmail` without
    /// touching the store if the email is taken.
    pub fn register(
        &self,
        store: &dyn Store,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(User, IssuedSession)> {
        if store.get_user_by_email(email)?.is_some() {
            return Err(Error::DuplicateEmail);
        }

        let user = store.create_user(&NewUser {
            email: email.to_string(),
            password_hash: self.passwords.hash(password)?,
            name: name.to_string(),
        })?;
        let issued = self.sessions.issue(store, user.id)?;

        tracing::info!(user_id = user.id, role = %user.role, "Registered account");
        Ok((user, issued))
    }

    pub fn login(
        &self,
        store: &dyn Store,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedSession)> {
        let Some(user) = store.get_user_by_email(email)? else {
            self.passwords.verify(password, self.dummy_hash()?)?;
            return Err(Error::UnknownEmail);
        };

        if !self.passwords.verify(password, &user.password_hash)? {
            return Err(Error::InvalidPassword);
        }

        let issued = self.sessions.issue(store, user.id)?;
        tracing::info!(user_id = user.id, "Logged in");
        Ok((user, issued))
    }

    /// Ends the caller's session if there is one. Calling it anonymously is not an error.
    pub fn logout(&self, store: &dyn Store, identity: &Identity) -> Result<()> {
        if let Some(session) = identity.session() {
            store.delete_session(&session.id)?;
            tracing::info!(user_id = session.user_id, "Logged out");
        }
        Ok(())
    }

    /// Resolves a session cookie token to the identity it is bound to.
    pub fn current_user(&self, store: &dyn Store, token: Option<&str>) -> Result<Identity> {
        let Some(token) = token else {
            return Ok(Identity::Anonymous);
        };

        let Some(session) = self.sessions.resolve(store, token)? else {
            return Ok(Identity::Anonymous);
        };

        match store.get_user(session.user_id)? {
            Some(user) => Ok(Identity::Authenticated { user, session }),
            None => {
                store.delete_session(&session.id)?;
                Ok(Identity::Anonymous)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::Argon2Policy;
    use crate::store::SqliteStore;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn setup() -> (SqliteStore, Authenticator) {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let auth = Authenticator::new(
            Arc::new(Argon2Policy::fast()),
            SessionManager::new(SECRET, 1),
        );
        (store, auth)
    }

    #[test]
    fn test_register_then_login() {
        let (store, auth) = setup();

        auth.register(&store, "a@x.com", "pw1", "Alice").unwrap();
        let (_, issued) = auth.login(&store, "a@x.com", "pw1").unwrap();

        let identity = auth.current_user(&store, Some(&issued.token)).unwrap();
        assert_eq!(identity.user().unwrap().name, "Alice");
    }

    #[test]
    fn test_register_establishes_session() {
        let (store, auth) = setup();

        let (user, issued) = auth.register(&store, "a@x.com", "pw1", "Alice").unwrap();
        let identity = auth.current_user(&store, Some(&issued.token)).unwrap();

        assert_eq!(identity.user().unwrap().id, user.id);
        assert_ne!(user.password_hash, "pw1");
    }

    #[test]
    fn test_duplicate_email() {
        let (store, auth) = setup();
        auth.register(&store, "a@x.com", "pw1", "Alice").unwrap();

        let result = auth.register(&store, "a@x.com", "pw2", "Mallory");
        assert!(matches!(result, Err(Error::DuplicateEmail)));
        assert_eq!(store.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_login_failures() {
        let (store, auth) = setup();
        auth.register(&store, "a@x.com", "pw1", "Alice").unwrap();

        for _ in 0..3 {
            assert!(matches!(
                auth.login(&store, "a@x.com", "wrong"),
                Err(Error::InvalidPassword)
            ));
        }
        assert!(matches!(
            auth.login(&store, "nobody@x.com", "pw1"),
            Err(Error::UnknownEmail)
        ));
        assert!(auth.login(&store, "a@x.com", "pw1").is_ok());
    }

    struct CountingPolicy {
        inner: Argon2Policy,
        verifies: AtomicUsize,
    }

    impl PasswordPolicy for CountingPolicy {
        fn hash(&self, password: &str) -> Result<String> {
            self.inner.hash(password)
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool> {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(password, hash)
        }
    }

    #[test]
    fn test_unknown_email_still_verifies_a_hash() {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        let policy = Arc::new(CountingPolicy {
            inner: Argon2Policy::fast(),
            verifies: AtomicUsize::new(0),
        });
        let auth = Authenticator::new(policy.clone(), SessionManager::new(SECRET, 1));
        auth.register(&store, "a@x.com", "pw1", "Alice").unwrap();

        assert!(matches!(
            auth.login(&store, "a@x.com", "wrong"),
            Err(Error::InvalidPassword)
        ));
        assert_eq!(policy.verifies.load(Ordering::SeqCst), 1);

        for _ in 0..2 {
            assert!(matches!(
                auth.login(&store, "nobody@x.com", "pw1"),
                Err(Error::UnknownEmail)
            ));
        }
        assert_eq!(policy.verifies.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let (store, auth) = setup();
        let (_, issued) = auth.register(&store, "a@x.com", "pw1", "Alice").unwrap();
        let identity = auth.current_user(&store, Some(&issued.token)).unwrap();

        auth.logout(&store, &identity).unwrap();
        auth.logout(&store, &identity).unwrap();
        auth.logout(&store, &Identity::Anonymous).unwrap();

        let after = auth.current_user(&store, Some(&issued.token)).unwrap();
        assert!(!after.is_authenticated());
    }

    #[test]
    fn test_no_token_is_anonymous() {
        let (store, auth) = setup();
        assert!(!auth.current_user(&store, None).unwrap().is_authenticated());
    }
}
