//! Application use cases.
//!
//! A use case takes a port (its input) and returns a [`Task`] of its output.
//! Callers at the presentation boundary only see this trait, not the
//! services behind it.

mod login;
mod sign_up;

pub use login::{LoginPort, LoginResult, LoginUseCase};
pub use sign_up::{SignUpPort, SignUpUseCase};

use crate::monad::Task;

/// A single application operation.
pub trait UseCase: Send + Sync {
    type Port;
    type Output: Clone + Send + 'static;
    type Error: Clone + Send + 'static;

    fn execute(&self, port: Self::Port) -> Task<Self::Output, Self::Error>;
}
