use thiserror::Error;

use crate::services::AuthError;

/// Application-wide error type returned at the presentation boundary.
///
/// Domain errors travel inside tasks as cloneable enums; they are converted
/// into this type once, when a request's task is awaited.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Duplicate entry error for unique constraint violations
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Unauthorized access error with authentication message
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::UserNotFound { field, value } => AppError::NotFound {
                entity: "user".to_string(),
                field: field.to_string(),
                value,
            },
            AuthError::UserAlreadyExists { email } => AppError::Duplicate {
                entity: "user".to_string(),
                field: "email".to_string(),
                value: email,
            },
            error @ (AuthError::WrongCredentials { .. }
            | AuthError::WrongRefreshToken { .. }
            | AuthError::Token(_)) => AppError::Unauthorized {
                message: error.to_string(),
            },
            error @ (AuthError::Hashing(_) | AuthError::Repository(_) | AuthError::Internal(_)) => {
                AppError::Internal {
                    source: anyhow::Error::new(error),
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |error| {
                    let reason = error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    format!("{field}: {reason}")
                })
            })
            .collect();
        // field_errors() is a HashMap; sort for a stable message
        fields.sort();

        AppError::BadRequest {
            message: fields.join("; "),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monad::Panicked;
    use crate::utils::TokenError;

    #[test]
    fn test_not_found_and_duplicate() {
        let error = AppError::from(AuthError::UserNotFound {
            field: "email",
            value: "a@example.com".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Resource not found: user with email=a@example.com"
        );

        let error = AppError::from(AuthError::UserAlreadyExists {
            email: "a@example.com".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Duplicate entry: user.email = 'a@example.com' already exists"
        );
    }

    #[test]
    fn test_credential_errors_are_unauthorized() {
        let cases = [
            AuthError::WrongCredentials {
                email: "a@example.com".to_string(),
            },
            AuthError::WrongRefreshToken { user_id: 1 },
            AuthError::Token(TokenError::Expired),
        ];

        for auth_error in cases {
            let message = auth_error.to_string();
            match AppError::from(auth_error) {
                AppError::Unauthorized { message: got } => assert_eq!(got, message),
                other => panic!("expected Unauthorized, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_internal_keeps_source() {
        let error = AppError::from(AuthError::Internal(Panicked::new("boom")));
        match error {
            AppError::Internal { source } => {
                assert!(source.downcast_ref::<AuthError>().is_some());
            }
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[test]
    fn test_from_validation_errors() {
        use validator::Validate;

        #[derive(Validate)]
        struct Form {
            #[validate(length(min = 3, message = "Name is too short"))]
            name: String,
            #[validate(email)]
            email: String,
        }

        let errors = Form {
            name: "ab".to_string(),
            email: "nope".to_string(),
        }
        .validate()
        .unwrap_err();

        match AppError::from(errors) {
            AppError::BadRequest { message } => {
                assert_eq!(message, "email: email; name: Name is too short");
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_from_anyhow() {
        let error = AppError::from(anyhow::anyhow!("startup failed"));
        assert!(matches!(error, AppError::Internal { .. }));
        assert_eq!(error.to_string(), "Internal error");
    }
}
