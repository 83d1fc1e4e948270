//! Functional runtime: optional values, typed errors and cancellable futures.
//!
//! - [`option`]: helpers around `Option` (sequencing, JSON nullability).
//! - [`result`]: helpers around `Result`, including the panic-catching
//!   constructors.
//! - [`Future`]: a push-based value that resolves at most once or is
//!   cancelled.
//! - [`Task`]: a `Future` of a `Result`, with short-circuiting `pipe*`
//!   combinators.

pub mod error;
pub mod future;
pub mod option;
pub mod result;
pub mod task;


pub use error::Panicked;
pub use future::{CancelPolicy, Cleanup, Future, Resolver, Status};
pub use option::OptionExt;
pub use result::ResultExt;
pub use task::Task;
