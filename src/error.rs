use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("unknown email")]
    UnknownEmail,

    #[error("invalid password")]
    InvalidPassword,

    #[error("a post titled '{0}' already exists")]
    DuplicateTitle(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("forbidden")]
    Forbidden,

    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

impl Error {
    /// True for failures the route layer turns into a notice and a redirect.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DuplicateEmail
                | Error::UnknownEmail
                | Error::InvalidPassword
                | Error::DuplicateTitle(_)
                | Error::ValidationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
