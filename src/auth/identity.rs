use crate::error::{Error, Result};
use crate::types::{Session, User};

/// Who is calling. Every identity check goes through this value.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated { user: User, session: Session },
}

impl Identity {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated { user, .. } => Some(user),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated { session, .. } => Some(session),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }
}

/// The admin gate: allows only an authenticated account holding the admin role.
pub fn authorize_admin(identity: &Identity) -> Result<(&User, &Session)> {
    match identity {
        Identity::Authenticated { user, session } if user.is_admin() => Ok((user, session)),
        _ => Err(Error::Forbidden),
    }
}
