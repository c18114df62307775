use std::fmt;

use serde::{Deserialize, Serialize};

/// Role is stored on every user row. Exactly one account holds `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Reader,
}

impl Role {
    /// Role for a newly registered account, given how many accounts already exist.
    /// Only the very first account becomes the administrator.
    #[must_use]
    pub const fn for_new_account(existing_users: i64) -> Role {
        if existing_users == 0 {
            Role::Admin
        } else {
            Role::Reader
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reader => "reader",
        }
    }

    /// Converts a stored role string to its value.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "reader" => Some(Role::Reader),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
