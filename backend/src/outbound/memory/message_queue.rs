//! In-process [`MessageQueue`] with visibility-timeout leasing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::ports::{MessageQueue, QueueError, QueueMessage, ReceiptHandle};

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct StoredMessage {
    id: String,
    body: String,
    receipt: Option<String>,
    receive_count: u32,
    visible_at: Instant,
}

/// Queue held in memory; messages are lost with the process.
#[derive(Debug)]
pub struct InMemoryMessageQueue {
    messages: Mutex<Vec<StoredMessage>>,
    arrivals: Notify,
    visibility_timeout: Duration,
    unavailable: AtomicBool,
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl InMemoryMessageQueue {
    /// Build a queue whose receives hide messages for `visibility_timeout`.
    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            arrivals: Notify::new(),
            visibility_timeout,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every operation fail while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Bodies of messages not yet deleted, leased or not.
    pub fn pending_bodies(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    pub(super) fn ensure_available(&self) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::unavailable("in-memory queue unavailable"));
        }
        Ok(())
    }

    /// Append a ready message and wake one waiting receiver.
    pub(super) fn publish(&self, body: String) -> Result<(), QueueError> {
        self.lock()?.push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            body,
            receipt: None,
            receive_count: 0,
            visible_at: Instant::now(),
        });
        self.arrivals.notify_one();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredMessage>>, QueueError> {
        self.messages
            .lock()
            .map_err(|_| QueueError::unavailable("in-memory queue lock poisoned"))
    }

    /// Lease visible messages, or report when the next lease expires.
    fn claim(
        &self,
        max_messages: usize,
    ) -> Result<(Vec<QueueMessage>, Option<Instant>), QueueError> {
        let now = Instant::now();
        let mut messages = self.lock()?;
        let mut claimed = Vec::new();
        let mut next_visible = None::<Instant>;

        for message in messages.iter_mut() {
            if message.visible_at > now {
                let leased_until = message.visible_at;
                next_visible = Some(next_visible.map_or(leased_until, |t| t.min(leased_until)));
                continue;
            }
            if claimed.len() == max_messages {
                break;
            }
            let receipt = Uuid::new_v4().to_string();
            message.receipt = Some(receipt.clone());
            message.receive_count += 1;
            message.visible_at = now + self.visibility_timeout;
            claimed.push(QueueMessage {
                message_id: message.id.clone(),
                receipt_handle: ReceiptHandle::new(receipt),
                body: message.body.clone(),
                receive_count: message.receive_count,
            });
        }
        Ok((claimed, next_visible))
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn send(&self, body: &str) -> Result<(), QueueError> {
        self.ensure_available()?;
        self.publish(body.to_owned())
    }

    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        self.ensure_available()?;
        let max_messages = usize::try_from(max_messages).unwrap_or(usize::MAX);
        let deadline = Instant::now() + wait;

        loop {
            let (claimed, next_visible) = self.claim(max_messages)?;
            if !claimed.is_empty() || Instant::now() >= deadline {
                return Ok(claimed);
            }
            let wake_at = next_visible.map_or(deadline, |t| t.min(deadline));
            // Either outcome re-checks the queue.
            let _ = tokio::time::timeout_at(wake_at, self.arrivals.notified()).await;
        }
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.ensure_available()?;
        let mut messages = self.lock()?;
        let position = messages
            .iter()
            .position(|m| m.receipt.as_deref() == Some(receipt.as_ref()))
            .ok_or_else(|| QueueError::receipt_expired(receipt.to_string()))?;
        messages.remove(position);
        Ok(())
    }
}
