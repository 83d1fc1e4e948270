//! Service layer for business logic operations.
//!
//! Services coordinate the repository with the credential primitives in
//! [`crate::utils`]. Every operation returns a [`Task`](crate::monad::Task).

mod auth_service;
mod errors;

pub use auth_service::AuthService;
pub use errors::AuthError;
