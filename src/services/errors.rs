use thiserror::Error;

use crate::monad::Panicked;
use crate::repositories::RepositoryError;
use crate::utils::{PasswordError, TokenError};

/// Failures of the authentication flows.
///
/// Every variant is cloneable so the error can sit inside a resolved
/// [`Task`](crate::monad::Task).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("User with {field}: {value} not found")]
    UserNotFound { field: &'static str, value: String },

    #[error("User with email: {email} already exists")]
    UserAlreadyExists { email: String },

    #[error("Password for user {email} is not correct")]
    WrongCredentials { email: String },

    #[error("Refresh token for user {user_id} is not correct")]
    WrongRefreshToken { user_id: i32 },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Hashing(#[from] PasswordError),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("internal error: {0}")]
    Internal(#[from] Panicked),
}

impl From<RepositoryError> for AuthError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound {
                entity: "user",
                field,
                value,
            } => AuthError::UserNotFound { field, value },
            RepositoryError::Duplicate {
                entity: "user",
                field: "email",
                value,
            } => AuthError::UserAlreadyExists { email: value },
            RepositoryError::Internal(panicked) => AuthError::Internal(panicked),
            other => AuthError::Repository(other),
        }
    }
}
