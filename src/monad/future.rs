//! Cancellable, push-based asynchronous values.
//!
//! A [`Future`] resolves at most once or is cancelled before resolving.
//! Observers registered with [`Future::on_resolve`] and [`Future::on_cancel`]
//! run synchronously, in registration order, at the moment the transition
//! happens, or immediately if it already happened.
//!
//! ```text
//! Pending ──resolve──▶ Resolved(value)
//!    │
//!    └────cancel()───▶ Cancelled
//! ```
//!
//! Terminal states never change; later `resolve`/`cancel` calls are ignored.
//! Cancellation flows downstream unconditionally (cancelling a source
//! cancels everything derived from it) and upstream only under
//! [`CancelPolicy::Propagate`].

use std::collections::HashMap;
use std::fmt;
use std::future::IntoFuture;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::oneshot;

type CallbackId = u64;
type ResolveCallback<A> = Box<dyn FnOnce(A) + Send>;
type CancelCallback = Box<dyn FnOnce() + Send>;

/// Cleanup returned by a [`Future::make`] initializer, run when the future
/// is cancelled while still pending.
pub type Cleanup = Box<dyn FnOnce() + Send>;

enum State<A> {
    Pending {
        resolve_callbacks: Vec<(CallbackId, ResolveCallback<A>)>,
        cancel_callbacks: Vec<(CallbackId, CancelCallback)>,
        cleanup: Option<Cleanup>,
        next_id: CallbackId,
    },
    Resolved(A),
    Cancelled,
}

impl<A> State<A> {
    fn pending() -> Self {
        State::Pending {
            resolve_callbacks: Vec::new(),
            cancel_callbacks: Vec::new(),
            cleanup: None,
            next_id: 0,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self, State::Pending { .. })
    }
}

fn take_id(next_id: &mut CallbackId) -> CallbackId {
    let id = *next_id;
    *next_id += 1;
    id
}

/// Observable state of a [`Future`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Resolved,
    Cancelled,
}

/// Whether cancelling a derived future also cancels what it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Cancelling the derived future leaves its sources untouched.
    #[default]
    Contained,
    /// Cancelling the derived future cancels its sources too.
    Propagate,
}

impl CancelPolicy {
    fn propagates(self) -> bool {
        self == CancelPolicy::Propagate
    }
}

/// A value that will eventually be produced, unless cancelled first.
///
/// `Future` is a handle: clones share the same state.
pub struct Future<A> {
    state: Arc<Mutex<State<A>>>,
}

impl<A> Clone for Future<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A> fmt::Debug for Future<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match &*self.state.lock() {
            State::Pending { .. } => Status::Pending,
            State::Resolved(_) => Status::Resolved,
            State::Cancelled => Status::Cancelled,
        };
        f.debug_struct("Future").field("status", &status).finish()
    }
}

/// The resolving half handed to a [`Future::make`] initializer.
pub struct Resolver<A> {
    state: Arc<Mutex<State<A>>>,
}

impl<A> Clone for Resolver<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: Clone> Resolver<A> {
    /// Resolves the future with `value` and notifies its observers.
    ///
    /// Has no effect once the future is resolved or cancelled.
    pub fn resolve(&self, value: A) {
        let previous = {
            let mut state = self.state.lock();
            if !state.is_pending() {
                tracing::trace!("ignoring resolution of a settled future");
                return;
            }
            std::mem::replace(&mut *state, State::Resolved(value.clone()))
        };

        if let State::Pending {
            resolve_callbacks, ..
        } = previous
        {
            for (_, callback) in resolve_callbacks {
                callback(value.clone());
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(*self.state.lock(), State::Cancelled)
    }

    fn future(&self) -> Future<A> {
        Future {
            state: Arc::clone(&self.state),
        }
    }
}

/// The pair of callbacks a derived future keeps on one of its sources.
///
/// Holds the source weakly, so a cancelled derived future that is never
/// released does not keep its source alive.
struct Subscription<A> {
    source: Weak<Mutex<State<A>>>,
    id: Option<CallbackId>,
}

impl<A> Subscription<A> {
    /// Removes both callbacks from the source if it is still pending.
    fn release(self) {
        let (Some(id), Some(state)) = (self.id, self.source.upgrade()) else {
            return;
        };

        // Dropped after the lock is released.
        let _removed = {
            let mut state = state.lock();
            match &mut *state {
                State::Pending {
                    resolve_callbacks,
                    cancel_callbacks,
                    ..
                } => {
                    let resolve = resolve_callbacks
                        .iter()
                        .position(|(entry, _)| *entry == id)
                        .map(|index| resolve_callbacks.remove(index));
                    let cancel = cancel_callbacks
                        .iter()
                        .position(|(entry, _)| *entry == id)
                        .map(|index| cancel_callbacks.remove(index));
                    Some((resolve, cancel))
                }
                _ => None,
            }
        };
    }
}

impl<A> Future<A>
where
    A: Clone + Send + 'static,
{
    /// Creates a future from its initializer.
    ///
    /// `init` runs synchronously. It receives the [`Resolver`] and may return
    /// a cleanup run on cancellation. A future resolved inside `init` is
    /// already `Resolved` when `make` returns. If the future was cancelled
    /// inside `init`, the returned cleanup runs before `make` returns.
    pub fn make<I>(init: I) -> Self
    where
        I: FnOnce(Resolver<A>) -> Option<Cleanup>,
    {
        let future = Self {
            state: Arc::new(Mutex::new(State::pending())),
        };

        if let Some(cleanup) = init(Resolver {
            state: Arc::clone(&future.state),
        }) {
            let late = {
                let mut state = future.state.lock();
                match &mut *state {
                    State::Pending { cleanup: slot, .. } => {
                        *slot = Some(cleanup);
                        None
                    }
                    State::Cancelled => Some(cleanup),
                    State::Resolved(_) => None,
                }
            };
            if let Some(cleanup) = late {
                cleanup();
            }
        }

        future
    }

    /// Creates a future already resolved to `value`.
    pub fn value(value: A) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Resolved(value))),
        }
    }

    /// Current state of the future.
    pub fn status(&self) -> Status {
        match &*self.state.lock() {
            State::Pending { .. } => Status::Pending,
            State::Resolved(_) => Status::Resolved,
            State::Cancelled => Status::Cancelled,
        }
    }

    /// Runs `callback` with the value once resolved.
    ///
    /// Called on a resolved future, `callback` runs before this method
    /// returns. Called on a cancelled future, it never runs.
    pub fn on_resolve<F>(&self, callback: F)
    where
        F: FnOnce(A) + Send + 'static,
    {
        let value = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending {
                    resolve_callbacks,
                    next_id,
                    ..
                } => {
                    resolve_callbacks.push((take_id(next_id), Box::new(callback)));
                    return;
                }
                State::Resolved(value) => value.clone(),
                State::Cancelled => return,
            }
        };
        callback(value);
    }

    /// Runs `callback` if and when the future is cancelled.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending {
                    cancel_callbacks,
                    next_id,
                    ..
                } => {
                    cancel_callbacks.push((take_id(next_id), Box::new(callback)));
                    return;
                }
                State::Resolved(_) => return,
                State::Cancelled => {}
            }
        }
        callback();
    }

    /// Cancels the future if it is still pending.
    ///
    /// The state flips to `Cancelled` first, then the initializer's cleanup
    /// runs, then the cancel callbacks in registration order. Pending
    /// resolve callbacks are dropped without being called.
    pub fn cancel(&self) {
        let previous = {
            let mut state = self.state.lock();
            if !state.is_pending() {
                return;
            }
            std::mem::replace(&mut *state, State::Cancelled)
        };

        if let State::Pending {
            cancel_callbacks,
            cleanup,
            ..
        } = previous
        {
            tracing::trace!(observers = cancel_callbacks.len(), "future cancelled");
            if let Some(cleanup) = cleanup {
                cleanup();
            }
            for (_, callback) in cancel_callbacks {
                callback();
            }
        }
    }

    /// Derives a future holding `f(value)`.
    pub fn map<B, F>(&self, f: F) -> Future<B>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.map_with(f, CancelPolicy::Contained)
    }

    /// [`Future::map`] with an explicit cancellation policy.
    ///
    /// Cancelling the derived future removes its callbacks from this one,
    /// so a long-lived source does not accumulate observers for derived
    /// futures that were cancelled before it resolved.
    pub fn map_with<B, F>(&self, f: F, policy: CancelPolicy) -> Future<B>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        let source = self.clone();
        Future::make(move |resolver: Resolver<B>| {
            let subscription = source.subscribe(resolver.future(), move |value| {
                if !resolver.is_cancelled() {
                    resolver.resolve(f(value));
                }
            });

            let upstream = policy.propagates().then_some(source);
            Some(Box::new(move || {
                subscription.release();
                if let Some(source) = upstream {
                    source.cancel();
                }
            }) as Cleanup)
        })
    }

    /// Derives a future that follows the future returned by `f(value)`.
    pub fn flat_map<B, F>(&self, f: F) -> Future<B>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> Future<B> + Send + 'static,
    {
        self.flat_map_with(f, CancelPolicy::Contained)
    }

    /// [`Future::flat_map`] with an explicit cancellation policy.
    ///
    /// Under [`CancelPolicy::Propagate`], cancelling the derived future also
    /// cancels the inner future, including one `f` is still producing when
    /// the cancellation arrives.
    pub fn flat_map_with<B, F>(&self, f: F, policy: CancelPolicy) -> Future<B>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) -> Future<B> + Send + 'static,
    {
        let source = self.clone();
        let inner_slot: Arc<Mutex<Option<Future<B>>>> = Arc::default();

        Future::make(move |resolver: Resolver<B>| {
            let slot = Arc::clone(&inner_slot);
            let subscription = source.subscribe(resolver.future(), move |value| {
                if resolver.is_cancelled() {
                    return;
                }
                let inner = f(value);
                *slot.lock() = Some(inner.clone());

                // The cleanup may have run while `f` was still producing `inner`.
                if resolver.is_cancelled() {
                    if policy.propagates() {
                        inner.cancel();
                    }
                    return;
                }

                let downstream = resolver.future();
                inner.subscribe(downstream, move |value| resolver.resolve(value));
            });

            let upstream = policy.propagates().then_some(source);
            Some(Box::new(move || {
                subscription.release();
                if let Some(source) = upstream {
                    source.cancel();
                    let inner = inner_slot.lock().take();
                    if let Some(inner) = inner {
                        inner.cancel();
                    }
                }
            }) as Cleanup)
        })
    }

    /// Runs `f` on the value once resolved and returns this same future.
    pub fn tap<F>(self, f: F) -> Self
    where
        F: FnOnce(&A) + Send + 'static,
    {
        self.on_resolve(move |value| f(&value));
        self
    }

    /// Emits the resolved value as a tracing event and returns this same future.
    pub fn log(self) -> Self
    where
        A: fmt::Debug,
    {
        self.tap(|value| tracing::debug!(?value, "Future resolved"))
    }

    /// Combines futures into a future of their values, in input order.
    pub fn all<I>(futures: I) -> Future<Vec<A>>
    where
        I: IntoIterator<Item = Future<A>>,
    {
        Self::all_with(futures, CancelPolicy::Contained)
    }

    /// [`Future::all`] with an explicit cancellation policy.
    ///
    /// The value at index `i` comes from input `i` whatever the completion
    /// order. Cancelling any member cancels the aggregate; cancelling the
    /// aggregate under [`CancelPolicy::Propagate`] cancels the members still
    /// pending.
    pub fn all_with<I>(futures: I, policy: CancelPolicy) -> Future<Vec<A>>
    where
        I: IntoIterator<Item = Future<A>>,
    {
        let members: Vec<Future<A>> = futures.into_iter().collect();
        if members.is_empty() {
            return Future::value(Vec::new());
        }

        let gathered = Arc::new(Mutex::new(Gathered::new(members.len())));

        Future::make(move |resolver: Resolver<Vec<A>>| {
            let subscriptions: Vec<Subscription<A>> = members
                .iter()
                .enumerate()
                .map(|(index, member)| {
                    let gathered = Arc::clone(&gathered);
                    let resolver = resolver.clone();
                    member.subscribe(resolver.future(), move |value| {
                        let complete = gathered.lock().fill(index, value);
                        if let Some(values) = complete {
                            resolver.resolve(values);
                        }
                    })
                })
                .collect();

            let upstream = if policy.propagates() { members } else { Vec::new() };
            Some(Box::new(move || {
                for subscription in subscriptions {
                    subscription.release();
                }
                for member in &upstream {
                    member.cancel();
                }
            }) as Cleanup)
        })
    }

    /// Keyed equivalent of [`Future::all`], keys preserved.
    pub fn all_from_dict<K, I>(dict: I) -> Future<HashMap<K, A>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        I: IntoIterator<Item = (K, Future<A>)>,
    {
        let (keys, futures): (Vec<K>, Vec<Future<A>>) = dict.into_iter().unzip();
        Self::all(futures).map(move |values| keys.into_iter().zip(values).collect())
    }

    /// Converts the future into a host future completing with its value.
    ///
    /// The returned future never fails. If this future is cancelled, the
    /// returned one stays pending forever.
    pub fn to_promise(&self) -> impl std::future::Future<Output = A> + Send + use<A> {
        let (sender, receiver) = oneshot::channel();
        self.on_resolve(move |value| {
            let _ = sender.send(value);
        });

        async move {
            match receiver.await {
                Ok(value) => value,
                // The sender is dropped without a value only on cancellation.
                Err(_) => std::future::pending().await,
            }
        }
    }

    /// Registers `on_value` for this future's value and cancels `derived`
    /// whenever this future is cancelled.
    ///
    /// Both callbacks share one id, so the returned [`Subscription`] removes
    /// them together.
    fn subscribe<B, F>(&self, derived: Future<B>, on_value: F) -> Subscription<A>
    where
        B: Clone + Send + 'static,
        F: FnOnce(A) + Send + 'static,
    {
        let mut subscription = Subscription {
            source: Arc::downgrade(&self.state),
            id: None,
        };

        let value = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending {
                    resolve_callbacks,
                    cancel_callbacks,
                    next_id,
                    ..
                } => {
                    let id = take_id(next_id);
                    resolve_callbacks.push((id, Box::new(on_value)));
                    cancel_callbacks.push((id, Box::new(move || derived.cancel())));
                    subscription.id = Some(id);
                    return subscription;
                }
                State::Resolved(value) => Some(value.clone()),
                State::Cancelled => None,
            }
        };

        match value {
            Some(value) => on_value(value),
            None => derived.cancel(),
        }
        subscription
    }

    /// Callbacks still waiting on this future, as `(resolve, cancel)`.
    #[cfg(test)]
    fn observer_counts(&self) -> (usize, usize) {
        match &*self.state.lock() {
            State::Pending {
                resolve_callbacks,
                cancel_callbacks,
                ..
            } => (resolve_callbacks.len(), cancel_callbacks.len()),
            _ => (0, 0),
        }
    }
}

impl<A> IntoFuture for Future<A>
where
    A: Clone + Send + 'static,
{
    type Output = A;
    type IntoFuture = Pin<Box<dyn std::future::Future<Output = A> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.to_promise())
    }
}

struct Gathered<A> {
    slots: Vec<Option<A>>,
    remaining: usize,
}

impl<A> Gathered<A> {
    fn new(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(len).collect(),
            remaining: len,
        }
    }

    /// Stores the value for `index`; returns every value once all slots are filled.
    fn fill(&mut self, index: usize, value: A) -> Option<Vec<A>> {
        self.slots[index] = Some(value);
        self.remaining -= 1;
        if self.remaining == 0 {
            Some(self.slots.drain(..).flatten().collect())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn deferred<A: Clone + Send + 'static>() -> (Future<A>, Resolver<A>) {
        let mut handle = None;
        let future = Future::make(|resolver| {
            handle = Some(resolver);
            None
        });
        (future, handle.expect("initializer runs synchronously"))
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Clone + Send + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |entry: &str| sink.lock().push(entry.to_string()))
    }

    #[test]
    fn test_value_is_resolved_immediately() {
        let future = Future::value(1);
        assert_eq!(future.status(), Status::Resolved);

        let (log, record) = recorder();
        future.on_resolve(move |value| record(&format!("got {value}")));
        assert_eq!(*log.lock(), vec!["got 1"]);
    }

    #[test]
    fn test_synchronous_initializer_resolves_before_make_returns() {
        let future = Future::make(|resolver| {
            resolver.resolve("ready");
            None
        });
        assert_eq!(future.status(), Status::Resolved);
    }

    #[test]
    fn test_callbacks_fire_in_registration_order() {
        let (future, resolver) = deferred::<i32>();
        let (log, record) = recorder();

        for name in ["first", "second", "third"] {
            let record = record.clone();
            future.on_resolve(move |value| record(&format!("{name} {value}")));
        }
        assert!(log.lock().is_empty());

        resolver.resolve(9);
        assert_eq!(*log.lock(), vec!["first 9", "second 9", "third 9"]);
    }

    #[test]
    fn test_at_most_once_resolution() {
        let (future, resolver) = deferred::<&str>();
        let (log, record) = recorder();
        future.on_resolve(move |value| record(value));

        resolver.resolve("first");
        resolver.resolve("second");

        assert_eq!(*log.lock(), vec!["first"]);
        let (late, record) = recorder();
        future.on_resolve(move |value| record(value));
        assert_eq!(*late.lock(), vec!["first"]);
    }

    #[test]
    fn test_cancel_after_resolution_is_noop() {
        let (log, record) = recorder();
        let future = Future::make(|resolver| {
            resolver.resolve(1);
            let record = record.clone();
            Some(Box::new(move || record("cleanup")) as Cleanup)
        });
        let on_cancel = record.clone();
        future.on_cancel(move || on_cancel("cancelled"));

        future.cancel();

        assert_eq!(future.status(), Status::Resolved);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_cancel_twice_runs_cleanup_and_callbacks_once() {
        let (log, record) = recorder();
        let cleanup = record.clone();
        let future: Future<i32> =
            Future::make(move |_| Some(Box::new(move || cleanup("cleanup")) as Cleanup));
        let first = record.clone();
        future.on_cancel(move || first("cancel 1"));
        let second = record.clone();
        future.on_cancel(move || second("cancel 2"));

        future.cancel();
        future.cancel();

        assert_eq!(future.status(), Status::Cancelled);
        assert_eq!(*log.lock(), vec!["cleanup", "cancel 1", "cancel 2"]);
    }

    #[test]
    fn test_cancelled_future_never_resolves() {
        let (future, resolver) = deferred::<i32>();
        let (log, record) = recorder();
        let early = record.clone();
        future.on_resolve(move |value| early(&format!("early {value}")));

        future.cancel();
        resolver.resolve(5);
        future.on_resolve(move |value| record(&format!("late {value}")));

        assert_eq!(future.status(), Status::Cancelled);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_on_cancel_after_cancellation_runs_immediately() {
        let (future, _resolver) = deferred::<i32>();
        future.cancel();

        let (log, record) = recorder();
        future.on_cancel(move || record("late"));
        assert_eq!(*log.lock(), vec!["late"]);
    }

    #[test]
    fn test_cleanup_may_reenter_the_future() {
        let mut handle = None;
        let future: Future<i32> = Future::make(|resolver| {
            handle = Some(resolver.clone());
            Some(Box::new(move || resolver.resolve(1)) as Cleanup)
        });

        future.cancel();

        assert_eq!(future.status(), Status::Cancelled);
        drop(handle);
    }

    #[test]
    fn test_map_transforms_value() {
        let (source, resolver) = deferred::<i32>();
        let derived = source.map(|value| value * 2).map(|value| value.to_string());

        assert_eq!(derived.status(), Status::Pending);
        resolver.resolve(21);

        let (log, record) = recorder();
        derived.on_resolve(move |value| record(&value));
        assert_eq!(*log.lock(), vec!["42"]);
    }

    #[test]
    fn test_map_contained_does_not_cancel_source() {
        let (source, _resolver) = deferred::<i32>();
        let derived = source.map(|value| value + 1);

        derived.cancel();

        assert_eq!(derived.status(), Status::Cancelled);
        assert_eq!(source.status(), Status::Pending);
    }

    #[test]
    fn test_map_propagate_cancels_source() {
        let (source, _resolver) = deferred::<i32>();
        let derived = source.map_with(|value| value + 1, CancelPolicy::Propagate);

        derived.cancel();

        assert_eq!(source.status(), Status::Cancelled);
    }

    #[test]
    fn test_source_cancellation_always_propagates_downstream() {
        let (source, _resolver) = deferred::<i32>();
        let mapped = source.map(|value| value + 1);
        let chained = source.flat_map(Future::value);
        let nested = mapped.map(|value| value * 3);

        source.cancel();

        assert_eq!(mapped.status(), Status::Cancelled);
        assert_eq!(chained.status(), Status::Cancelled);
        assert_eq!(nested.status(), Status::Cancelled);
    }

    #[test]
    fn test_deriving_from_cancelled_source_is_cancelled() {
        let (source, _resolver) = deferred::<i32>();
        source.cancel();

        assert_eq!(source.map(|value| value).status(), Status::Cancelled);
    }

    #[test]
    fn test_map_skips_continuation_after_derived_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (source, resolver) = deferred::<i32>();
        let counter = Arc::clone(&calls);
        let derived = source.map(move |value| {
            counter.fetch_add(1, Ordering::SeqCst);
            value
        });

        derived.cancel();
        resolver.resolve(1);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.status(), Status::Resolved);
        assert_eq!(derived.status(), Status::Cancelled);
    }

    #[test]
    fn test_flat_map_follows_inner_future() {
        let (source, source_resolver) = deferred::<i32>();
        let (inner, inner_resolver) = deferred::<String>();
        let derived = source.flat_map(move |_| inner);

        source_resolver.resolve(1);
        assert_eq!(derived.status(), Status::Pending);

        inner_resolver.resolve("inner".to_string());
        let (log, record) = recorder();
        derived.on_resolve(move |value| record(&value));
        assert_eq!(*log.lock(), vec!["inner"]);
    }

    #[test]
    fn test_flat_map_inner_cancellation_cancels_derived() {
        let (inner, _inner_resolver) = deferred::<i32>();
        let cancel_inner = inner.clone();
        let derived = Future::value(1).flat_map(move |_| inner);

        cancel_inner.cancel();

        assert_eq!(derived.status(), Status::Cancelled);
    }

    #[test]
    fn test_flat_map_propagate_cancels_source_and_inner() {
        let (inner, _inner_resolver) = deferred::<i32>();
        let watched = inner.clone();
        let (source, source_resolver) = deferred::<i32>();
        let derived = source.flat_map_with(move |_| inner, CancelPolicy::Propagate);

        source_resolver.resolve(0);
        derived.cancel();

        assert_eq!(watched.status(), Status::Cancelled);
        assert_eq!(source.status(), Status::Resolved);
    }

    #[test]
    fn test_flat_map_contained_leaves_source_pending() {
        let (source, _resolver) = deferred::<i32>();
        let derived = source.flat_map(Future::value);

        derived.cancel();

        assert_eq!(source.status(), Status::Pending);
    }

    #[test]
    fn test_flat_map_propagate_cancels_inner_produced_during_cancel() {
        let (source, source_resolver) = deferred::<i32>();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let produced: Arc<Mutex<Option<Future<i32>>>> = Arc::default();

        let slot = Arc::clone(&produced);
        let derived = source.flat_map_with(
            move |_| {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
                let (inner, _inner_resolver) = deferred::<i32>();
                *slot.lock() = Some(inner.clone());
                inner
            },
            CancelPolicy::Propagate,
        );

        let worker = std::thread::spawn(move || source_resolver.resolve(1));
        entered_rx.recv().unwrap();
        derived.cancel();
        release_tx.send(()).unwrap();
        worker.join().unwrap();

        assert_eq!(derived.status(), Status::Cancelled);
        let inner = produced.lock().clone().unwrap();
        assert_eq!(inner.status(), Status::Cancelled);
    }

    #[test]
    fn test_flat_map_contained_keeps_inner_produced_during_cancel() {
        let (inner, _inner_resolver) = deferred::<i32>();
        let watched = inner.clone();
        let cancel_slot: Arc<Mutex<Option<Future<i32>>>> = Arc::default();

        let (source, source_resolver) = deferred::<i32>();
        let slot = Arc::clone(&cancel_slot);
        let derived = source.flat_map(move |_| {
            let derived = slot.lock().take();
            if let Some(derived) = derived {
                derived.cancel();
            }
            inner
        });
        *cancel_slot.lock() = Some(derived.clone());

        source_resolver.resolve(1);

        assert_eq!(derived.status(), Status::Cancelled);
        assert_eq!(watched.status(), Status::Pending);
        assert_eq!(watched.observer_counts(), (0, 0));
    }

    #[test]
    fn test_cancelled_derivations_release_their_observers() {
        let (source, resolver) = deferred::<i32>();

        for _ in 0..1_000 {
            source.map(|value| value + 1).cancel();
            source.flat_map(Future::value).cancel();
        }
        let (pending, _) = deferred::<i32>();
        Future::all(vec![source.clone(), pending.clone()]).cancel();

        assert_eq!(source.observer_counts(), (0, 0));
        assert_eq!(pending.observer_counts(), (0, 0));

        let kept = source.map(|value| value * 2);
        assert_eq!(source.observer_counts(), (1, 1));
        resolver.resolve(21);
        assert_eq!(kept.status(), Status::Resolved);
    }

    #[test]
    fn test_tap_returns_same_future() {
        let (source, resolver) = deferred::<i32>();
        let (log, record) = recorder();
        let tapped = source.clone().tap(move |value| record(&value.to_string()));

        tapped.cancel();
        assert_eq!(source.status(), Status::Cancelled);
        resolver.resolve(3);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_log_returns_same_future() {
        let logged = Future::value(vec![1, 2]).log();
        assert_eq!(logged.status(), Status::Resolved);
    }

    #[test]
    fn test_all_preserves_input_order() {
        let (later, later_resolver) = deferred::<&str>();
        let sooner = Future::value("a");
        let combined = Future::all(vec![later, sooner]);

        assert_eq!(combined.status(), Status::Pending);
        later_resolver.resolve("b");

        let (log, record) = recorder();
        combined.on_resolve(move |values| record(&values.join(",")));
        assert_eq!(*log.lock(), vec!["b,a"]);
    }

    #[test]
    fn test_all_empty_resolves_immediately() {
        let combined = Future::<i32>::all(Vec::new());
        assert_eq!(combined.status(), Status::Resolved);
    }

    #[test]
    fn test_all_member_cancellation_cancels_aggregate() {
        let (first, _first_resolver) = deferred::<i32>();
        let (second, _second_resolver) = deferred::<i32>();
        let combined = Future::all(vec![first.clone(), second.clone()]);

        second.cancel();

        assert_eq!(combined.status(), Status::Cancelled);
        assert_eq!(first.status(), Status::Pending);
    }

    #[test]
    fn test_all_propagate_cancels_pending_members() {
        let (pending, _resolver) = deferred::<i32>();
        let resolved = Future::value(1);
        let combined = Future::all_with(
            vec![pending.clone(), resolved.clone()],
            CancelPolicy::Propagate,
        );

        combined.cancel();

        assert_eq!(pending.status(), Status::Cancelled);
        assert_eq!(resolved.status(), Status::Resolved);
    }

    #[test]
    fn test_all_contained_leaves_members_alone() {
        let (pending, _resolver) = deferred::<i32>();
        let combined = Future::all(vec![pending.clone()]);

        combined.cancel();

        assert_eq!(pending.status(), Status::Pending);
    }

    #[test]
    fn test_all_from_dict_keeps_keys() {
        let (slow, resolver) = deferred::<i32>();
        let combined = Future::all_from_dict(vec![("slow", slow), ("fast", Future::value(2))]);
        resolver.resolve(1);

        let values = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&values);
        combined.on_resolve(move |dict| *sink.lock() = dict);

        let values = values.lock();
        assert_eq!(values.get("slow"), Some(&1));
        assert_eq!(values.get("fast"), Some(&2));
    }

    #[test]
    fn test_debug_reports_status() {
        assert_eq!(
            format!("{:?}", Future::value(1)),
            "Future { status: Resolved }"
        );
    }

    #[tokio::test]
    async fn test_to_promise_resolves_later() {
        let (future, resolver) = deferred::<i32>();
        let promise = future.to_promise();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            resolver.resolve(8);
        });

        assert_eq!(promise.await, 8);
    }

    #[tokio::test]
    async fn test_await_resolved_future() {
        assert_eq!(Future::value("done").await, "done");
    }

    #[tokio::test]
    async fn test_to_promise_stays_pending_after_cancel() {
        let (future, _resolver) = deferred::<i32>();
        let promise = future.to_promise();
        future.cancel();

        let outcome = tokio::time::timeout(Duration::from_millis(20), promise).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_resolution_from_another_thread() {
        let (future, resolver) = deferred::<usize>();
        let doubled = future.map(|value| value * 2);

        let handles: Vec<_> = (0..4)
            .map(|attempt| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve(attempt + 1) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let value = doubled.await;
        assert!([2, 4, 6, 8].contains(&value));
    }
}
