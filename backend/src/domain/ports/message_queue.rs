//! Driven port for the durable provisioning queue.
//!
//! Delivery is at least once. A received message stays leased to the
//! receiver until its visibility timeout lapses; deleting it with the
//! delivery's [`ReceiptHandle`] acknowledges it for good.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

/// Per-delivery token required to delete a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for ReceiptHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivery of a queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Stable id shared by every delivery of the same message.
    pub message_id: String,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    /// Deliveries so far, including this one.
    pub receive_count: u32,
}

define_port_error! {
    /// Errors raised by queue adapters.
    pub enum QueueError {
        /// The queue backend could not be reached.
        Unavailable { message: String } => "queue unavailable: {message}",
        /// The backend refused the operation.
        Rejected { message: String } => "queue rejected operation: {message}",
        /// The receipt no longer identifies a leased delivery.
        ReceiptExpired { receipt: String } => "receipt handle is no longer valid: {receipt}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a message body.
    async fn send(&self, body: &str) -> Result<(), QueueError>;

    /// Receive up to `max_messages`, waiting at most `wait` for the first.
    ///
    /// An empty vector means the wait elapsed without a delivery.
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge a delivery.
    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;
}
