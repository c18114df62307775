use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 64 * 1024; // 64 MiB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

/// How account passwords are turned into stored digests.
///
/// Implementations must be irreversible and salt every call with fresh randomness.
pub trait PasswordPolicy: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    /// Returns `Ok(false)` for a wrong password and `Err` only for a malformed digest.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

pub struct Argon2Policy {
    argon2: Argon2<'static>,
}

impl Default for Argon2Policy {
    fn default() -> Self {
        Self::new()
    }
}

impl Argon2Policy {
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(ARGON2_MEMORY, ARGON2_ITERATIONS, ARGON2_PARALLELISM)
    }

    /// Cheap parameters for tests and local development.
    #[must_use]
    pub fn fast() -> Self {
        Self::with_params(8 * 1024, 1, 1)
    }

    fn with_params(memory: u32, iterations: u32, parallelism: u32) -> Self {
        let params = Params::new(memory, iterations, parallelism, Some(ARGON2_OUTPUT_LEN))
            .unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl PasswordPolicy for Argon2Policy {
    /// Hashes a password using Argon2id with a random salt
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hashing(format!("failed to hash password: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a password against a stored PHC string
    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Hashing(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Hashing(format!("failed to verify password: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_correct_password() {
        let policy = Argon2Policy::fast();
        let hash = policy.hash("pw1").unwrap();

        assert!(policy.verify("pw1", &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let policy = Argon2Policy::fast();
        let hash = policy.hash("pw1").unwrap();

        assert!(!policy.verify("pw2", &hash).unwrap());
        assert!(!policy.verify("", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted_phc() {
        let policy = Argon2Policy::fast();
        let first = policy.hash("same").unwrap();
        let second = policy.hash("same").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(!first.contains("same"));
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let policy = Argon2Policy::fast();
        assert!(matches!(policy.verify("pw", "plaintext"), Err(Error::Hashing(_))));
    }

    #[test]
    fn test_default_params_verify_fast_hashes() {
        // Parameters live in the PHC string, so either policy verifies the other's digests.
        let hash = Argon2Policy::fast().hash("pw").unwrap();
        assert!(Argon2Policy::new().verify("pw", &hash).unwrap());
    }
}
