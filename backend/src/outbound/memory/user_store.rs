//! In-process [`UserStore`].
//!
//! A transaction reserves each username it inserts so concurrent inserts of
//! the same name fail fast; reservations become rows on commit and vanish on
//! rollback or drop. Events staged on a transaction are published to the
//! store's event queue after its users are committed, and never otherwise.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{UserStore, UserStoreError, UserTransaction};
use crate::domain::{ConsumerId, User, UserId, Username};

use super::InMemoryMessageQueue;

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    reserved: HashSet<Username>,
}

impl StoreState {
    fn username_taken(&self, username: &Username) -> bool {
        self.reserved.contains(username) || self.users.values().any(|u| u.username() == username)
    }
}

fn lock_state(state: &Mutex<StoreState>) -> Result<MutexGuard<'_, StoreState>, UserStoreError> {
    state
        .lock()
        .map_err(|_| UserStoreError::connection("in-memory user store lock poisoned"))
}

/// Mutex-backed user store for tests and local runs.
///
/// The default store publishes to a private queue; use
/// [`with_event_queue`](Self::with_event_queue) to share one with a worker.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    state: Arc<Mutex<StoreState>>,
    events: Arc<InMemoryMessageQueue>,
    unavailable: AtomicBool,
}

impl InMemoryUserStore {
    /// Store whose committed transactions publish to `events`.
    pub fn with_event_queue(events: Arc<InMemoryMessageQueue>) -> Self {
        Self {
            state: Arc::default(),
            events,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn event_queue(&self) -> Arc<InMemoryMessageQueue> {
        Arc::clone(&self.events)
    }

    /// Make every operation fail with a connection error while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Committed users.
    pub fn user_count(&self) -> usize {
        lock_state(&self.state).map_or(0, |state| state.users.len())
    }

    fn ensure_available(&self) -> Result<(), UserStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UserStoreError::connection("in-memory user store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, UserStoreError> {
        self.ensure_available()?;
        Ok(Box::new(InMemoryUserTransaction {
            state: Arc::clone(&self.state),
            events: Arc::clone(&self.events),
            pending: Vec::new(),
            staged_events: Vec::new(),
            finished: false,
        }))
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        self.ensure_available()?;
        Ok(lock_state(&self.state)?.users.get(id).cloned())
    }

    async fn get_external_credential_id(
        &self,
        username: &Username,
    ) -> Result<Option<ConsumerId>, UserStoreError> {
        self.ensure_available()?;
        let state = lock_state(&self.state)?;
        state
            .users
            .values()
            .find(|user| user.username() == username)
            .map(|user| user.external_credential_id().cloned())
            .ok_or_else(|| UserStoreError::not_found(username.to_string()))
    }

    async fn set_external_credential_id(
        &self,
        id: &UserId,
        consumer_id: &ConsumerId,
    ) -> Result<(), UserStoreError> {
        self.ensure_available()?;
        let mut state = lock_state(&self.state)?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| UserStoreError::not_found(id.to_string()))?;
        *user = User::new(
            user.id().clone(),
            user.username().clone(),
            Some(consumer_id.clone()),
        );
        Ok(())
    }
}

struct InMemoryUserTransaction {
    state: Arc<Mutex<StoreState>>,
    events: Arc<InMemoryMessageQueue>,
    pending: Vec<User>,
    staged_events: Vec<String>,
    finished: bool,
}

impl InMemoryUserTransaction {
    fn release(&mut self, state: &mut StoreState) {
        for user in self.pending.drain(..) {
            state.reserved.remove(user.username());
        }
        self.staged_events.clear();
        self.finished = true;
    }
}

#[async_trait]
impl UserTransaction for InMemoryUserTransaction {
    async fn insert_user(&mut self, username: &Username) -> Result<UserId, UserStoreError> {
        let mut state = lock_state(&self.state)?;
        if state.username_taken(username) {
            return Err(UserStoreError::unique_violation(username.to_string()));
        }
        state.reserved.insert(username.clone());
        let id = UserId::random();
        self.pending
            .push(User::new(id.clone(), username.clone(), None));
        Ok(id)
    }

    async fn enqueue_event(&mut self, body: &str) -> Result<(), UserStoreError> {
        self.events
            .ensure_available()
            .map_err(|err| UserStoreError::query(format!("failed to stage event: {err}")))?;
        self.staged_events.push(body.to_owned());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), UserStoreError> {
        let state_handle = Arc::clone(&self.state);
        {
            let mut state = lock_state(&state_handle)?;
            for user in std::mem::take(&mut self.pending) {
                state.reserved.remove(user.username());
                state.users.insert(user.id().clone(), user);
            }
        }
        self.finished = true;
        for body in std::mem::take(&mut self.staged_events) {
            self.events
                .publish(body)
                .map_err(|err| UserStoreError::query(format!("failed to publish event: {err}")))?;
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), UserStoreError> {
        let state_handle = Arc::clone(&self.state);
        let mut state = lock_state(&state_handle)?;
        self.release(&mut state);
        Ok(())
    }
}

impl Drop for InMemoryUserTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let state_handle = Arc::clone(&self.state);
        if let Ok(mut state) = state_handle.lock() {
            self.release(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> InMemoryUserStore {
        InMemoryUserStore::default()
    }

    fn name(raw: &str) -> Username {
        Username::new(raw).expect("username")
    }

    #[rstest]
    #[tokio::test]
    async fn uncommitted_inserts_are_invisible(store: InMemoryUserStore) {
        let mut tx = store.begin().await.expect("begin");
        let id = tx.insert_user(&name("ada")).await.expect("insert");

        assert_eq!(store.find_user(&id).await.expect("lookup"), None);
        tx.commit().await.expect("commit");
        assert!(store.find_user(&id).await.expect("lookup").is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_transactions_cannot_share_a_username(store: InMemoryUserStore) {
        let mut first = store.begin().await.expect("begin first");
        let mut second = store.begin().await.expect("begin second");

        first.insert_user(&name("ada")).await.expect("first insert");
        let err = second
            .insert_user(&name("ada"))
            .await
            .expect_err("second insert");

        assert!(matches!(err, UserStoreError::UniqueViolation { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn rollback_releases_the_username(store: InMemoryUserStore) {
        let mut tx = store.begin().await.expect("begin");
        tx.insert_user(&name("ada")).await.expect("insert");
        tx.rollback().await.expect("rollback");

        let mut retry = store.begin().await.expect("begin retry");
        retry.insert_user(&name("ada")).await.expect("insert again");
        retry.commit().await.expect("commit");
        assert_eq!(store.user_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn dropping_an_open_transaction_releases_the_username(store: InMemoryUserStore) {
        {
            let mut tx = store.begin().await.expect("begin");
            tx.insert_user(&name("ada")).await.expect("insert");
        }

        let mut retry = store.begin().await.expect("begin retry");
        retry.insert_user(&name("ada")).await.expect("insert again");
    }

    #[rstest]
    #[tokio::test]
    async fn staged_events_are_published_only_on_commit(store: InMemoryUserStore) {
        let events = store.event_queue();
        let mut tx = store.begin().await.expect("begin");
        tx.insert_user(&name("ada")).await.expect("insert");
        tx.enqueue_event("created").await.expect("stage");

        assert!(events.pending_bodies().is_empty());
        tx.commit().await.expect("commit");
        assert_eq!(events.pending_bodies(), ["created"]);
    }

    #[rstest]
    #[tokio::test]
    async fn rolled_back_or_dropped_events_are_discarded(store: InMemoryUserStore) {
        let events = store.event_queue();
        let mut rolled_back = store.begin().await.expect("begin");
        rolled_back.insert_user(&name("ada")).await.expect("insert");
        rolled_back.enqueue_event("first").await.expect("stage");
        rolled_back.rollback().await.expect("rollback");
        {
            let mut dropped = store.begin().await.expect("begin");
            dropped.insert_user(&name("bob")).await.expect("insert");
            dropped.enqueue_event("second").await.expect("stage");
        }

        assert!(events.pending_bodies().is_empty());
        assert_eq!(store.user_count(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn staging_fails_while_the_event_queue_is_down(store: InMemoryUserStore) {
        store.event_queue().set_unavailable(true);
        let mut tx = store.begin().await.expect("begin");

        let err = tx.enqueue_event("created").await.expect_err("queue down");

        assert!(matches!(err, UserStoreError::Query { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn credential_id_lifecycle(store: InMemoryUserStore) {
        let username = name("ada");
        let mut tx = store.begin().await.expect("begin");
        let id = tx.insert_user(&username).await.expect("insert");
        tx.commit().await.expect("commit");

        assert_eq!(store.get_external_credential_id(&username).await, Ok(None));

        let consumer = ConsumerId::new("c1").expect("consumer");
        store
            .set_external_credential_id(&id, &consumer)
            .await
            .expect("first set");
        store
            .set_external_credential_id(&id, &consumer)
            .await
            .expect("idempotent second set");

        assert_eq!(
            store.get_external_credential_id(&username).await,
            Ok(Some(consumer))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_keys_are_not_found(store: InMemoryUserStore) {
        let lookup = store.get_external_credential_id(&name("ghost")).await;
        assert_eq!(lookup, Err(UserStoreError::not_found("ghost")));

        let consumer = ConsumerId::new("c1").expect("consumer");
        let update = store
            .set_external_credential_id(&UserId::random(), &consumer)
            .await;
        assert!(matches!(update, Err(UserStoreError::NotFound { .. })));
    }

    #[rstest]
    #[tokio::test]
    async fn unavailable_store_fails_with_connection_errors(store: InMemoryUserStore) {
        store.set_unavailable(true);
        let err = store.begin().await.err().expect("begin fails");
        assert!(matches!(err, UserStoreError::Connection { .. }));
    }
}
