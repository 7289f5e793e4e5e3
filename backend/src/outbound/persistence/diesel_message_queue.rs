//! PostgreSQL-backed [`MessageQueue`].
//!
//! Rows in `queue_messages` are leased rather than removed on receive. A
//! claim runs in one transaction: it locks ready rows with
//! `FOR UPDATE SKIP LOCKED`, stamps each with a fresh receipt handle, bumps
//! its receive count and hides it until the visibility timeout lapses.
//! Concurrent receivers therefore never lease the same row twice, and a
//! lease that is never acknowledged makes the row receivable again.
//!
//! Rows can also be written on a foreign connection through
//! [`insert_message`]; the user store uses this to enqueue provisioning
//! events inside its own transaction.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{MessageQueue, QueueError, QueueMessage, ReceiptHandle};

use super::error_mapping::{map_queue_diesel_error, map_queue_pool_error};
use super::models::{NewQueueMessageRow, QueueMessageRow};
use super::pool::DbPool;
use super::schema::queue_messages;

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Diesel implementation of the [`MessageQueue`] port.
#[derive(Clone)]
pub struct DieselMessageQueue {
    pool: DbPool,
    queue_name: String,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl DieselMessageQueue {
    /// Queue `queue_name` with a 30 second visibility timeout, polled every
    /// 500 ms while a receive is waiting.
    pub fn new(pool: DbPool, queue_name: impl Into<String>) -> Self {
        Self {
            pool,
            queue_name: queue_name.into(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn claim(&self, max_messages: u32) -> Result<Vec<QueueMessage>, QueueError> {
        let now = Utc::now();
        let visible_at = lease_expiry(now, self.visibility_timeout)?;
        let limit = i64::from(max_messages);
        let queue_name = self.queue_name.as_str();
        let mut conn = self.pool.get().await.map_err(map_queue_pool_error)?;

        let claimed: Result<Vec<QueueMessageRow>, diesel::result::Error> = conn
            .transaction(|conn| {
                async move {
                    let ids: Vec<Uuid> = queue_messages::table
                        .filter(queue_messages::queue_name.eq(queue_name))
                        .filter(queue_messages::visible_at.le(now))
                        .order_by(queue_messages::enqueued_at.asc())
                        .select(queue_messages::id)
                        .limit(limit)
                        .for_update()
                        .skip_locked()
                        .load(conn)
                        .await?;

                    let mut rows = Vec::with_capacity(ids.len());
                    for id in ids {
                        let row: QueueMessageRow = diesel::update(queue_messages::table.find(id))
                            .set((
                                queue_messages::receipt_handle.eq(Some(Uuid::new_v4())),
                                queue_messages::receive_count
                                    .eq(queue_messages::receive_count + 1),
                                queue_messages::visible_at.eq(visible_at),
                            ))
                            .returning(QueueMessageRow::as_returning())
                            .get_result(conn)
                            .await?;
                        rows.push(row);
                    }
                    Ok(rows)
                }
                .scope_boxed()
            })
            .await;

        claimed
            .map_err(map_queue_diesel_error)?
            .into_iter()
            .map(row_to_message)
            .collect()
    }
}

/// Insert a ready message for `queue_name` on `conn`.
///
/// The row shares the fate of any transaction open on `conn`.
pub(super) async fn insert_message(
    conn: &mut AsyncPgConnection,
    queue_name: &str,
    body: &str,
) -> Result<Uuid, diesel::result::Error> {
    let now = Utc::now();
    let row = NewQueueMessageRow {
        id: Uuid::new_v4(),
        queue_name,
        body,
        visible_at: now,
        enqueued_at: now,
    };
    diesel::insert_into(queue_messages::table)
        .values(&row)
        .execute(conn)
        .await?;
    Ok(row.id)
}

fn lease_expiry(now: DateTime<Utc>, timeout: Duration) -> Result<DateTime<Utc>, QueueError> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| QueueError::rejected("visibility timeout out of range"))
}

fn row_to_message(row: QueueMessageRow) -> Result<QueueMessage, QueueError> {
    let receipt = row
        .receipt_handle
        .ok_or_else(|| QueueError::rejected("claimed message has no receipt handle"))?;
    Ok(QueueMessage {
        message_id: row.id.to_string(),
        receipt_handle: ReceiptHandle::new(receipt.to_string()),
        body: row.body,
        receive_count: u32::try_from(row.receive_count).unwrap_or_default(),
    })
}

#[async_trait]
impl MessageQueue for DieselMessageQueue {
    async fn send(&self, body: &str) -> Result<(), QueueError> {
        let mut conn = self.pool.get().await.map_err(map_queue_pool_error)?;

        let message_id = insert_message(&mut conn, &self.queue_name, body)
            .await
            .map_err(map_queue_diesel_error)?;

        debug!(queue = %self.queue_name, %message_id, "message enqueued");
        Ok(())
    }

    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }
        let deadline = Instant::now() + wait;

        loop {
            let messages = self.claim(max_messages).await?;
            if !messages.is_empty() {
                return Ok(messages);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(messages);
            }
            tokio::time::sleep(remaining.min(self.poll_interval)).await;
        }
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let Ok(handle) = Uuid::parse_str(receipt.as_ref()) else {
            return Err(QueueError::receipt_expired(receipt.to_string()));
        };
        let mut conn = self.pool.get().await.map_err(map_queue_pool_error)?;

        let deleted = diesel::delete(
            queue_messages::table
                .filter(queue_messages::queue_name.eq(self.queue_name.as_str()))
                .filter(queue_messages::receipt_handle.eq(handle)),
        )
        .execute(&mut conn)
        .await
        .map_err(map_queue_diesel_error)?;

        if deleted == 0 {
            return Err(QueueError::receipt_expired(receipt.to_string()));
        }
        Ok(())
    }
}
