mod identity;
mod middleware;
mod password;
mod service;
mod session;

pub use identity::{Identity, authorize_admin};
pub use middleware::{AuthError, CurrentUser, RequireAdmin};
pub(crate) use middleware::resolve_identity;
pub use password::{Argon2Policy, PasswordPolicy};
pub use service::Authenticator;
pub use session::{
    IssuedSession, SESSION_COOKIE, SessionManager, csrf_matches, generate_token, read_cookie,
    removal_cookie,
};
