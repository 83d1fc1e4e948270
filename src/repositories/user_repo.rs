//! User repository port.

use crate::models::{NewUser, User};
use crate::monad::Task;
use crate::repositories::RepositoryError;

/// Access to persisted users.
///
/// Implementations must be shareable across threads: services hold them as
/// `Arc<dyn UserRepository>`.
pub trait UserRepository: Send + Sync {
    /// Looks a user up by email. A missing user is `Ok(None)`, not an error.
    fn find_by_email(&self, email: &str) -> Task<Option<User>, RepositoryError>;

    /// Looks a user up by id. A missing user is `Ok(None)`, not an error.
    fn find_by_id(&self, id: i32) -> Task<Option<User>, RepositoryError>;

    /// Persists a new user.
    ///
    /// Fails with [`RepositoryError::Duplicate`] when the email is taken.
    fn create(&self, new_user: NewUser) -> Task<User, RepositoryError>;

    /// Replaces the stored refresh token hash; `None` clears it.
    fn update_refresh_token(
        &self,
        id: i32,
        refresh_token: Option<String>,
    ) -> Task<User, RepositoryError>;

    /// Like [`find_by_email`](Self::find_by_email), with a missing user
    /// reported as [`RepositoryError::NotFound`].
    fn find_by_email_or_fail(&self, email: &str) -> Task<User, RepositoryError> {
        let email = email.to_string();
        self.find_by_email(&email).pipe_result(move |user| {
            user.ok_or_else(|| RepositoryError::not_found("user", "email", email))
        })
    }

    /// Like [`find_by_id`](Self::find_by_id), with a missing user reported
    /// as [`RepositoryError::NotFound`].
    fn find_by_id_or_fail(&self, id: i32) -> Task<User, RepositoryError> {
        self.find_by_id(id)
            .pipe_result(move |user| user.ok_or_else(|| RepositoryError::not_found("user", "id", id)))
    }
}
