//! Typed fallible computations.
//!
//! `std::result::Result` already provides `map`, `map_err`, `and_then`,
//! `or_else`, `unwrap_or`, `ok` and `is_ok`/`is_err`. This module adds the
//! side-effect hooks, the panic-catching boundaries and the sequencing
//! helpers used by the business layer.
//!
//! [`from_execution`], [`from_promise`] and [`ResultExt::map_catch_error`] are
//! the only places where a panic is turned into an `Err` value. Everywhere
//! else panics propagate, so programming errors stay distinct from domain
//! errors.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use super::error::Panicked;

/// Extension methods for [`Result`].
pub trait ResultExt<A, E>: Sized {
    /// Runs `f` with the whole result and returns it unchanged.
    fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&Self);

    /// Runs `f` on the success value, if any, and returns the result unchanged.
    fn tap_ok<F>(self, f: F) -> Self
    where
        F: FnOnce(&A);

    /// Runs `f` on the error value, if any, and returns the result unchanged.
    fn tap_error<F>(self, f: F) -> Self
    where
        F: FnOnce(&E);

    /// Maps the success value with `f`, turning a panic inside `f` into `Err`.
    fn map_catch_error<B, F>(self, f: F) -> Result<B, E>
    where
        F: FnOnce(A) -> B,
        E: From<Panicked>;

    /// Emits the result as a tracing event and returns it unchanged.
    fn log(self) -> Self
    where
        A: Debug,
        E: Debug;
}

impl<A, E> ResultExt<A, E> for Result<A, E> {
    fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&Self),
    {
        f(&self);
        self
    }

    fn tap_ok<F>(self, f: F) -> Self
    where
        F: FnOnce(&A),
    {
        self.inspect(f)
    }

    fn tap_error<F>(self, f: F) -> Self
    where
        F: FnOnce(&E),
    {
        self.inspect_err(f)
    }

    fn map_catch_error<B, F>(self, f: F) -> Result<B, E>
    where
        F: FnOnce(A) -> B,
        E: From<Panicked>,
    {
        self.and_then(|value| from_execution(|| f(value)).map_err(E::from))
    }

    fn log(self) -> Self
    where
        A: Debug,
        E: Debug,
    {
        match &self {
            Ok(value) => tracing::debug!(?value, "Result.Ok"),
            Err(error) => tracing::warn!(?error, "Result.Error"),
        }
        self
    }
}

/// Runs `f` and captures a panic as `Err(Panicked)`.
pub fn from_execution<A, F>(f: F) -> Result<A, Panicked>
where
    F: FnOnce() -> A,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(Panicked::from_payload)
}

/// Awaits a fallible host future.
///
/// Its `Err` output is kept as is; a panic while polling it becomes
/// `Err(E::from(Panicked))`.
pub async fn from_promise<A, E, P>(promise: P) -> Result<A, E>
where
    P: std::future::Future<Output = Result<A, E>>,
    E: From<Panicked>,
{
    AssertUnwindSafe(promise)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(E::from(Panicked::from_payload(payload))))
}

/// `Some(v)` becomes `Ok(v)`, `None` becomes `Err(error)`.
pub fn from_option<A, E>(option: Option<A>, error: E) -> Result<A, E> {
    option.ok_or(error)
}

/// `Ok(value)` when `condition` holds, `Err(error)` otherwise.
pub fn from_bool<A, E>(condition: bool, value: A, error: E) -> Result<A, E> {
    if condition { Ok(value) } else { Err(error) }
}

/// Turns an ordered list of results into a result of the list.
///
/// The first error wins: later results are not inspected and errors are
/// never accumulated.
pub fn all<A, E, I>(results: I) -> Result<Vec<A>, E>
where
    I: IntoIterator<Item = Result<A, E>>,
{
    results.into_iter().collect()
}

/// Keyed equivalent of [`all`], keys preserved.
pub fn all_from_dict<K, A, E, I>(dict: I) -> Result<HashMap<K, A>, E>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, Result<A, E>)>,
{
    dict.into_iter()
        .map(|(key, result)| result.map(|value| (key, value)))
        .collect()
}

/// Compares two results: tags must match, `Ok` values are compared with
/// `eq`, and any two errors are considered equal.
pub fn equals<A, E, F>(a: &Result<A, E>, b: &Result<A, E>, eq: F) -> bool
where
    F: FnOnce(&A, &A) -> bool,
{
    match (a, b) {
        (Ok(a), Ok(b)) => eq(a, b),
        (Err(_), Err(_)) => true,
        _ => false,
    }
}
