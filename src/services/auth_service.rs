//! Authentication flows written as [`Task`] pipelines.
//!
//! Every flow starts from a repository call and chains the credential
//! checks onto it. A failed step short-circuits the rest, so for example a
//! wrong password never reaches token signing.

use std::sync::Arc;

use crate::models::{NewUser, User};
use crate::monad::Task;
use crate::repositories::UserRepository;
use crate::services::AuthError;
use crate::utils::{PasswordHashing, TokenIssuer, TokenType, Tokens};

/// Authentication service.
///
/// Cloning is cheap: every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHashing>,
    issuer: Arc<dyn TokenIssuer>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHashing>,
        issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            users,
            hasher,
            issuer,
        }
    }

    /// Checks the credentials and signs an access token.
    ///
    /// Fails with `UserNotFound` for an unknown email and with
    /// `WrongCredentials` for a bad password.
    pub fn login(&self, email: &str, password: &str) -> Task<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let issuer = Arc::clone(&self.issuer);
        let password = password.to_string();

        self.users
            .find_by_email_or_fail(email)
            .map_error(AuthError::from)
            .pipe_result(move |user| check_password(hasher.as_ref(), user, &password))
            .pipe_result(move |user| Ok(issuer.issue_access(&user)?))
            .pipe_tap_error(|error| tracing::debug!(%error, "login refused"))
    }

    /// Registers a user and signs them in.
    ///
    /// `new_user.password` is the plain password; it is hashed before it
    /// reaches the repository.
    pub fn sign_up(&self, new_user: NewUser) -> Task<Tokens, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let users = Arc::clone(&self.users);
        let service = self.clone();
        let email = new_user.email.clone();

        self.users
            .find_by_email(&new_user.email)
            .map_error(AuthError::from)
            .pipe_result(move |existing| match existing {
                Some(_) => Err(AuthError::UserAlreadyExists { email }),
                None => Ok(()),
            })
            .pipe_result(move |()| {
                let password = hasher.hash(&new_user.password)?;
                Ok(NewUser {
                    password,
                    ..new_user
                })
            })
            .pipe_task(move |new_user| users.create(new_user).map_error(AuthError::from))
            .pipe_tap(|user| tracing::info!(user_id = user.id, "user signed up"))
            .pipe_task(move |user| service.create_and_store_tokens(&user))
    }

    /// Like [`login`](Self::login), but issues a full token pair and stores
    /// the refresh token.
    pub fn sign_in(&self, email: &str, password: &str) -> Task<Tokens, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let service = self.clone();
        let password = password.to_string();

        self.users
            .find_by_email_or_fail(email)
            .map_error(AuthError::from)
            .pipe_result(move |user| check_password(hasher.as_ref(), user, &password))
            .pipe_task(move |user| service.create_and_store_tokens(&user))
    }

    /// Forgets the stored refresh token, so it can no longer be used.
    pub fn sign_out(&self, user_id: i32) -> Task<(), AuthError> {
        self.users
            .update_refresh_token(user_id, None)
            .map_error(AuthError::from)
            .pipe(|user| tracing::info!(user_id = user.id, "user signed out"))
    }

    /// Exchanges a valid refresh token for a new token pair.
    ///
    /// The presented token must match the stored hash, so a token that was
    /// rotated away or signed out is rejected.
    pub fn refresh_tokens(&self, user_id: i32, refresh_token: &str) -> Task<Tokens, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let issuer = Arc::clone(&self.issuer);
        let service = self.clone();
        let refresh_token = refresh_token.to_string();

        self.users
            .find_by_id_or_fail(user_id)
            .map_error(AuthError::from)
            .pipe_result(move |user| {
                check_refresh_token(hasher.as_ref(), issuer.as_ref(), user, &refresh_token)
            })
            .pipe_task(move |user| service.create_and_store_tokens(&user))
    }

    /// Resolves the user an access token belongs to.
    pub fn authenticate(&self, access_token: &str) -> Task<User, AuthError> {
        let user_id = self
            .issuer
            .validate(access_token, TokenType::Access)
            .and_then(|claims| claims.user_id());

        match user_id {
            Ok(user_id) => self
                .users
                .find_by_id_or_fail(user_id)
                .map_error(AuthError::from),
            Err(error) => Task::err(error.into()),
        }
    }

    /// Signs a token pair and stores the hash of the refresh token.
    fn create_and_store_tokens(&self, user: &User) -> Task<Tokens, AuthError> {
        let issued = self
            .issuer
            .issue(user)
            .map_err(AuthError::from)
            .and_then(|tokens| {
                let hash = self.hasher.hash(&tokens.refresh_token)?;
                Ok((tokens, hash))
            });

        match issued {
            Ok((tokens, hash)) => self
                .users
                .update_refresh_token(user.id, Some(hash))
                .map_error(AuthError::from)
                .pipe(move |_| tokens),
            Err(error) => Task::err(error),
        }
    }
}

fn check_password(hasher: &dyn PasswordHashing, user: User, password: &str) -> Result<User, AuthError> {
    if hasher.verify(password, &user.password)? {
        Ok(user)
    } else {
        Err(AuthError::WrongCredentials { email: user.email })
    }
}

fn check_refresh_token(
    hasher: &dyn PasswordHashing,
    issuer: &dyn TokenIssuer,
    user: User,
    refresh_token: &str,
) -> Result<User, AuthError> {
    let wrong_token = || AuthError::WrongRefreshToken { user_id: user.id };

    let stored = user.refresh_token.as_deref().ok_or_else(wrong_token)?;
    if !hasher.verify(refresh_token, stored)? {
        return Err(wrong_token());
    }

    let claims = issuer.validate(refresh_token, TokenType::Refresh)?;
    if claims.user_id()? != user.id {
        return Err(wrong_token());
    }

    Ok(user)
}
