//! Repository layer for data access operations.
//!
//! Every operation returns a [`Task`](crate::monad::Task): callers compose
//! lookups and writes into pipelines instead of awaiting them one by one.

mod errors;
mod memory;
mod user_repo;

pub use errors::RepositoryError;
pub use memory::InMemoryUserRepository;
pub use user_repo::UserRepository;
