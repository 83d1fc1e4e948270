use thiserror::Error;

use crate::monad::Panicked;

/// Failures reported by repositories.
///
/// Cloneable so it can be stored in a resolved [`Task`](crate::monad::Task)
/// and handed to every observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{entity} not found with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Unique constraint violation
    #[error("{entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("repository operation failed: {0}")]
    Internal(#[from] Panicked),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    pub fn duplicate(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        Self::Duplicate {
            entity,
            field,
            value: value.to_string(),
        }
    }
}
