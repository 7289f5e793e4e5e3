//! PostgreSQL-backed [`UserStore`].
//!
//! A [`UserTransaction`] owns a pooled connection for its whole lifetime and
//! drives `BEGIN`/`COMMIT`/`ROLLBACK` through Diesel's transaction manager.
//! Provisioning events are inserted into `queue_messages` on that same
//! connection, so they commit or vanish together with the user row. A handle
//! dropped while still open returns its connection with the transaction
//! unfinished; the pool treats such a connection as broken and closes it,
//! which aborts the transaction server-side.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use uuid::Uuid;

use crate::domain::ports::{UserStore, UserStoreError, UserTransaction};
use crate::domain::{ConsumerId, User, UserId, Username};

use super::diesel_message_queue::insert_message;
use super::error_mapping::{map_store_diesel_error, map_store_pool_error};
use super::models::{NewUserRow, UserRow};
use super::pool::DbPool;
use super::schema::users;

type OwnedConnection = PooledConnection<'static, AsyncPgConnection>;

/// Diesel implementation of the [`UserStore`] port.
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
    event_queue: String,
}

impl DieselUserStore {
    /// Store whose transactions enqueue events onto the queue named
    /// `event_queue` (see `DieselMessageQueue`).
    pub fn new(pool: DbPool, event_queue: impl Into<String>) -> Self {
        Self {
            pool,
            event_queue: event_queue.into(),
        }
    }
}

/// Ids this store issues are always UUIDs; anything else can never match.
fn parse_user_id(id: &UserId) -> Result<Uuid, UserStoreError> {
    Uuid::parse_str(id.as_ref()).map_err(|_| UserStoreError::invalid_id(id.to_string()))
}

fn row_to_user(row: UserRow) -> Result<User, UserStoreError> {
    let id = UserId::new(row.id.to_string())
        .map_err(|err| UserStoreError::query(format!("invalid user id in database: {err}")))?;
    let username = Username::new(&row.username)
        .map_err(|err| UserStoreError::query(format!("invalid username in database: {err}")))?;
    let external_credential_id = row
        .external_credential_id
        .map(ConsumerId::new)
        .transpose()
        .map_err(|err| UserStoreError::query(format!("invalid consumer id in database: {err}")))?;
    Ok(User::new(id, username, external_credential_id))
}

#[async_trait]
impl UserStore for DieselUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, UserStoreError> {
        let mut conn = self.pool.get_owned().await.map_err(map_store_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_store_diesel_error)?;
        Ok(Box::new(DieselUserTransaction {
            conn: Some(conn),
            event_queue: self.event_queue.clone(),
        }))
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        let uuid = parse_user_id(id)?;
        let mut conn = self.pool.get().await.map_err(map_store_pool_error)?;

        let row: Option<UserRow> = users::table
            .find(uuid)
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_store_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn get_external_credential_id(
        &self,
        username: &Username,
    ) -> Result<Option<ConsumerId>, UserStoreError> {
        let name: &str = username.as_ref();
        let mut conn = self.pool.get().await.map_err(map_store_pool_error)?;

        let found: Option<Option<String>> = users::table
            .filter(users::username.eq(name))
            .select(users::external_credential_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_store_diesel_error)?;

        match found {
            None => Err(UserStoreError::not_found(name)),
            Some(None) => Ok(None),
            Some(Some(raw)) => ConsumerId::new(raw).map(Some).map_err(|err| {
                UserStoreError::query(format!("invalid consumer id in database: {err}"))
            }),
        }
    }

    async fn set_external_credential_id(
        &self,
        id: &UserId,
        consumer_id: &ConsumerId,
    ) -> Result<(), UserStoreError> {
        let uuid = parse_user_id(id)?;
        let consumer: &str = consumer_id.as_ref();
        let mut conn = self.pool.get().await.map_err(map_store_pool_error)?;

        let updated = diesel::update(users::table.find(uuid))
            .set(users::external_credential_id.eq(consumer))
            .execute(&mut conn)
            .await
            .map_err(map_store_diesel_error)?;

        if updated == 0 {
            return Err(UserStoreError::not_found(id.to_string()));
        }
        Ok(())
    }
}

struct DieselUserTransaction {
    conn: Option<OwnedConnection>,
    event_queue: String,
}

impl DieselUserTransaction {
    fn connection(&mut self) -> Result<&mut AsyncPgConnection, UserStoreError> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| UserStoreError::query("transaction already finished"))
    }

    fn take_connection(&mut self) -> Result<OwnedConnection, UserStoreError> {
        self.conn
            .take()
            .ok_or_else(|| UserStoreError::query("transaction already finished"))
    }
}

#[async_trait]
impl UserTransaction for DieselUserTransaction {
    async fn insert_user(&mut self, username: &Username) -> Result<UserId, UserStoreError> {
        let conn = self.connection()?;
        let id = Uuid::new_v4();
        let row = NewUserRow {
            id,
            username: username.as_ref(),
        };

        diesel::insert_into(users::table)
            .values(&row)
            .execute(conn)
            .await
            .map_err(map_store_diesel_error)?;

        UserId::new(id.to_string()).map_err(|err| UserStoreError::query(err.to_string()))
    }

    async fn enqueue_event(&mut self, body: &str) -> Result<(), UserStoreError> {
        let queue_name = self.event_queue.clone();
        let conn = self.connection()?;
        insert_message(conn, &queue_name, body)
            .await
            .map_err(map_store_diesel_error)?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), UserStoreError> {
        let mut conn = self.take_connection()?;
        AnsiTransactionManager::commit_transaction(&mut *conn)
            .await
            .map_err(map_store_diesel_error)
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), UserStoreError> {
        let mut conn = self.take_connection()?;
        AnsiTransactionManager::rollback_transaction(&mut *conn)
            .await
            .map_err(map_store_diesel_error)
    }
}
