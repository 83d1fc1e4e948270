use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHasher, PasswordVerifier, phc::PasswordHash},
};
use thiserror::Error;

use crate::config::PasswordConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    #[error("failed to hash secret: {0}")]
    Hash(String),

    /// The stored value is not a PHC hash string
    #[error("malformed password hash: {0}")]
    MalformedHash(String),
}

/// One-way hashing of secrets (passwords, refresh tokens).
pub trait PasswordHashing: Send + Sync {
    /// Hashes `secret` with a fresh random salt.
    fn hash(&self, secret: &str) -> Result<String, PasswordError>;

    /// Checks `secret` against a hash produced by [`hash`](Self::hash).
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id hashing.
#[derive(Clone)]
pub struct Argon2Hashing {
    argon2: Argon2<'static>,
}

impl Argon2Hashing {
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::Params(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hashing {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHashing for Argon2Hashing {
    fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        let hash = self
            .argon2
            .hash_password(secret.as_bytes())
            .map_err(|e| PasswordError::Hash(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        Ok(self
            .argon2
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
