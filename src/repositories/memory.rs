//! In-process user repository.
//!
//! Users live in a [`DashMap`] keyed by id with a second map as the unique
//! email index. Every operation runs as a Tokio task, so cancelling the
//! returned [`Task`] aborts work that has not started yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jiff::Timestamp;

use crate::models::{NewUser, User};
use crate::monad::Task;
use crate::repositories::{RepositoryError, UserRepository};

/// Thread-safe, clonable in-memory [`UserRepository`].
///
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    store: Arc<Store>,
    latency: Duration,
}

struct Store {
    users: DashMap<i32, User>,
    emails: DashMap<String, i32>,
    next_id: AtomicI32,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicI32::new(1),
        }
    }
}

impl Store {
    fn find_by_email(&self, email: &str) -> Option<User> {
        let id = self.emails.get(email).map(|entry| *entry.value())?;
        self.find_by_id(id)
    }

    fn find_by_id(&self, id: i32) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    fn insert(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::duplicate("user", "email", new_user.email)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let now = Timestamp::now();
                let user = User {
                    id,
                    email: new_user.email,
                    password: new_user.password,
                    first_name: new_user.first_name,
                    last_name: new_user.last_name,
                    refresh_token: None,
                    created_at: now,
                    updated_at: now,
                };

                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }

    fn set_refresh_token(
        &self,
        id: i32,
        refresh_token: Option<String>,
    ) -> Result<User, RepositoryError> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found("user", "id", id))?;

        user.refresh_token = refresh_token;
        user.updated_at = Timestamp::now();
        Ok(user.clone())
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every operation by `latency`, to mimic a remote store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.store.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.users.is_empty()
    }

    /// Runs `operation` against the store on the Tokio runtime.
    fn run<A, F>(&self, operation: F) -> Task<A, RepositoryError>
    where
        A: Clone + Send + 'static,
        F: FnOnce(&Store) -> Result<A, RepositoryError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let latency = self.latency;

        Task::from_promise(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            operation(store.as_ref())
        })
    }
}

impl UserRepository for InMemoryUserRepository {
    fn find_by_email(&self, email: &str) -> Task<Option<User>, RepositoryError> {
        let email = email.to_string();
        self.run(move |store| Ok(store.find_by_email(&email)))
    }

    fn find_by_id(&self, id: i32) -> Task<Option<User>, RepositoryError> {
        self.run(move |store| Ok(store.find_by_id(id)))
    }

    fn create(&self, new_user: NewUser) -> Task<User, RepositoryError> {
        self.run(move |store| {
            let user = store.insert(new_user)?;
            tracing::debug!(user_id = user.id, "user created");
            Ok(user)
        })
    }

    fn update_refresh_token(
        &self,
        id: i32,
        refresh_token: Option<String>,
    ) -> Task<User, RepositoryError> {
        self.run(move |store| store.set_refresh_token(id, refresh_token))
    }
}
