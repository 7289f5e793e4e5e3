//! Driven port for user persistence.
//!
//! Writes that must be coupled to another side effect go through an explicit
//! [`UserTransaction`] obtained from [`UserStore::begin`]; the domain decides
//! when to commit or roll back (see `domain::registration`). Provisioning
//! events are staged on the same transaction, so an event becomes receivable
//! exactly when its user row commits.

use async_trait::async_trait;

use crate::domain::{ConsumerId, User, UserId, Username};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user store adapters.
    pub enum UserStoreError {
        /// The username is already taken.
        UniqueViolation { message: String } => "username already exists: {message}",
        /// No user matches the lookup key.
        NotFound { message: String } => "user not found: {message}",
        /// The id can never name a user in this store.
        InvalidId { message: String } => "invalid user id: {message}",
        /// The store could not be reached.
        Connection { message: String } => "user store connection failed: {message}",
        /// A query or mutation failed.
        Query { message: String } => "user store query failed: {message}",
    }
}

/// Open store transaction.
///
/// Dropping a handle without calling [`commit`](Self::commit) must leave no
/// trace of its writes.
#[async_trait]
pub trait UserTransaction: Send {
    /// Insert a user and return the generated id.
    async fn insert_user(&mut self, username: &Username) -> Result<UserId, UserStoreError>;

    /// Stage a message for the provisioning queue.
    ///
    /// It becomes receivable when the transaction commits and is discarded on
    /// rollback or drop.
    async fn enqueue_event(&mut self, body: &str) -> Result<(), UserStoreError>;

    async fn commit(self: Box<Self>) -> Result<(), UserStoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), UserStoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Start a transaction for coupled writes.
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, UserStoreError>;

    /// Fetch a committed user by id.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, UserStoreError>;

    /// Look up the gateway consumer linked to `username`.
    ///
    /// Fails with [`UserStoreError::NotFound`] when the username is unknown
    /// and returns `Ok(None)` while provisioning is still pending.
    async fn get_external_credential_id(
        &self,
        username: &Username,
    ) -> Result<Option<ConsumerId>, UserStoreError>;

    /// Record the gateway consumer for `id`, overwriting any previous value.
    async fn set_external_credential_id(
        &self,
        id: &UserId,
        consumer_id: &ConsumerId,
    ) -> Result<(), UserStoreError>;
}
