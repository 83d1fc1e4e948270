//! Asynchronous fallible computations.
//!
//! A [`Task`] is a [`Future`] resolving to a `Result`. Its `pipe*`
//! combinators only look at the `Ok` side: once an `Err` is present, every
//! later step is skipped and the error reaches the end of the pipeline
//! unchanged.

use std::fmt::Debug;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use super::error::Panicked;
use super::future::{CancelPolicy, Cleanup, Future};
use super::result;

/// A future of a `Result`.
pub type Task<A, E> = Future<Result<A, E>>;

impl<A, E> Future<Result<A, E>>
where
    A: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A task already resolved to `Ok(value)`.
    pub fn ok(value: A) -> Self {
        Future::value(Ok(value))
    }

    /// A task already resolved to `Err(error)`.
    pub fn err(error: E) -> Self {
        Future::value(Err(error))
    }

    /// Drives a fallible host future on the Tokio runtime.
    ///
    /// The task resolves with the host future's output. A panic while
    /// polling it resolves `Err(E::from(Panicked))`. Cancelling the task
    /// aborts the spawned work.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    ///
    /// Steps chained onto the task (`pipe`, `map`, ...) run inside the
    /// spawned work when it resolves. A panic in one of them is not caught:
    /// it is logged at error level and unwinds the spawned Tokio task, and
    /// the tasks downstream of the panicking step stay `Pending`. Use
    /// [`Task::pipe_result`] with
    /// [`ResultExt::map_catch_error`](super::ResultExt::map_catch_error) for
    /// steps that may panic.
    pub fn from_promise<P>(promise: P) -> Self
    where
        P: std::future::Future<Output = Result<A, E>> + Send + 'static,
        E: From<Panicked>,
    {
        Future::make(|resolver| {
            let handle = tokio::spawn(async move {
                let output = result::from_promise(promise).await;
                let resolved = catch_unwind(AssertUnwindSafe(|| resolver.resolve(output)));
                if let Err(payload) = resolved {
                    let panicked = Panicked::describe(&*payload);
                    tracing::error!(
                        panic = %panicked.message(),
                        "step chained on a task panicked; downstream tasks stay pending"
                    );
                    resume_unwind(payload);
                }
            });
            Some(Box::new(move || handle.abort()) as Cleanup)
        })
    }

    /// Transforms the `Ok` value.
    pub fn pipe<B, F>(&self, f: F) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.pipe_with(f, CancelPolicy::Contained)
    }

    pub fn pipe_with<B, F>(&self, f: F, policy: CancelPolicy) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.map_with(move |result| result.map(f), policy)
    }

    /// Chains a fallible host future, driven like [`Task::from_promise`].
    ///
    /// # Panics
    ///
    /// As for [`Task::from_promise`]: a panic in a step chained after this
    /// one is logged, unwinds the spawned work, and leaves the downstream
    /// tasks `Pending`.
    pub fn pipe_async<B, F, P>(&self, f: F) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> P + Send + 'static,
        P: std::future::Future<Output = Result<B, E>> + Send + 'static,
        E: From<Panicked>,
    {
        self.pipe_async_with(f, CancelPolicy::Contained)
    }

    pub fn pipe_async_with<B, F, P>(&self, f: F, policy: CancelPolicy) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> P + Send + 'static,
        P: std::future::Future<Output = Result<B, E>> + Send + 'static,
        E: From<Panicked>,
    {
        self.pipe_task_with(move |value| Task::from_promise(f(value)), policy)
    }

    /// Chains a synchronous fallible step.
    pub fn pipe_result<B, F>(&self, f: F) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> Result<B, E> + Send + 'static,
    {
        self.pipe_result_with(f, CancelPolicy::Contained)
    }

    pub fn pipe_result_with<B, F>(&self, f: F, policy: CancelPolicy) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> Result<B, E> + Send + 'static,
    {
        self.map_with(move |result| result.and_then(f), policy)
    }

    /// Chains another task. `f` only runs on `Ok`.
    pub fn pipe_task<B, F>(&self, f: F) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> Task<B, E> + Send + 'static,
    {
        self.pipe_task_with(f, CancelPolicy::Contained)
    }

    pub fn pipe_task_with<B, F>(&self, f: F, policy: CancelPolicy) -> Task<B, E>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> Task<B, E> + Send + 'static,
    {
        self.flat_map_with(
            move |result| match result {
                Ok(value) => f(value),
                Err(error) => Task::err(error),
            },
            policy,
        )
    }

    /// Runs `f` on the `Ok` value and returns this same task.
    pub fn pipe_tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&A) + Send + 'static,
    {
        self.tap(move |result| {
            if let Ok(value) = result {
                f(value);
            }
        })
    }

    /// Runs `f` on the `Err` value and returns this same task.
    pub fn pipe_tap_error<F>(self, f: F) -> Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.tap(move |result| {
            if let Err(error) = result {
                f(error);
            }
        })
    }

    /// Converts the error channel with `f`.
    pub fn map_error<G, F>(&self, f: F) -> Task<A, G>
    where
        G: Clone + Send + 'static,
        F: FnOnce(E) -> G + Send + 'static,
    {
        self.map(move |result| result.map_err(f))
    }

    /// Awaitable form of the task. An `Err` outcome is returned as `Err`.
    ///
    /// Like [`Future::to_promise`], it stays pending forever if the task is
    /// cancelled.
    pub fn result_to_promise(
        &self,
    ) -> impl std::future::Future<Output = Result<A, E>> + Send + use<A, E>
    where
        E: Debug,
    {
        let promise = self.to_promise();
        async move {
            let result = promise.await;
            if let Err(error) = &result {
                tracing::debug!(?error, "task rejected");
            }
            result
        }
    }
}
