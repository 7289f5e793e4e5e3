//! Background worker that provisions gateway consumers for new users.
//!
//! The worker long-polls the provisioning queue and handles each delivery in
//! order: decode the event, make sure the user has a gateway consumer and at
//! least one credential set, record the consumer id on the user, then delete
//! the message. Every gateway step is find-before-create, so a redelivered
//! event converges on the same consumer instead of creating another one. Any
//! failure leaves the message in the queue; redelivery is the only retry.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    GatewayClient, GatewayError, MessageQueue, NewConsumer, QueueMessage, UserStore,
};
use crate::domain::{ConsumerId, User, UserCreatedEvent, UserId};

mod failure;

use failure::ProvisioningFailure;

/// Polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningWorkerConfig {
    /// Maximum messages requested per receive.
    pub batch_size: u32,
    /// Long-poll wait per receive.
    pub wait_time: Duration,
    /// Pause after a failed receive.
    pub receive_error_backoff: Duration,
}

impl Default for ProvisioningWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            wait_time: Duration::from_secs(5),
            receive_error_backoff: Duration::from_secs(1),
        }
    }
}

/// Driven ports the worker needs.
pub struct ProvisioningWorkerPorts {
    pub queue: Arc<dyn MessageQueue>,
    pub store: Arc<dyn UserStore>,
    pub gateway: Arc<dyn GatewayClient>,
}

impl ProvisioningWorkerPorts {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn UserStore>,
        gateway: Arc<dyn GatewayClient>,
    ) -> Self {
        Self {
            queue,
            store,
            gateway,
        }
    }
}

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Provisioning finished. `acknowledged` is false when the delete failed
    /// and the message will come back.
    Provisioned {
        user_id: UserId,
        consumer_id: ConsumerId,
        acknowledged: bool,
    },
    /// Not a usable user-created event, or one naming an id the store can
    /// never hold; left in the queue untouched.
    Skipped,
    /// Provisioning failed; left in the queue for redelivery.
    Deferred,
}

pub struct ProvisioningWorker {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn UserStore>,
    gateway: Arc<dyn GatewayClient>,
    config: ProvisioningWorkerConfig,
}

impl ProvisioningWorker {
    pub fn new(ports: ProvisioningWorkerPorts, config: ProvisioningWorkerConfig) -> Self {
        let ProvisioningWorkerPorts {
            queue,
            store,
            gateway,
        } = ports;
        Self {
            queue,
            store,
            gateway,
            config,
        }
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation interrupts a pending receive or backoff, never a batch
    /// that is already being processed.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            batch_size = self.config.batch_size,
            wait_ms = duration_millis(self.config.wait_time),
            "provisioning worker started"
        );

        loop {
            let received = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                received = self.queue.receive(self.config.batch_size, self.config.wait_time) => received,
            };

            match received {
                Ok(messages) => {
                    self.process_batch(&messages).await;
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        backoff_ms = duration_millis(self.config.receive_error_backoff),
                        "failed to receive provisioning messages"
                    );
                    tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(self.config.receive_error_backoff) => {}
                    }
                }
            }
        }

        info!("provisioning worker stopped");
    }

    /// Handle deliveries one after another.
    pub async fn process_batch(&self, messages: &[QueueMessage]) -> Vec<MessageOutcome> {
        if !messages.is_empty() {
            debug!(count = messages.len(), "processing provisioning batch");
        }
        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            outcomes.push(self.process_message(message).await);
        }
        outcomes
    }

    /// Handle one delivery, deleting it only after provisioning succeeded.
    pub async fn process_message(&self, message: &QueueMessage) -> MessageOutcome {
        let event = match UserCreatedEvent::from_message_body(&message.body) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    error = %err,
                    "skipping undecodable provisioning message"
                );
                return MessageOutcome::Skipped;
            }
        };
        let user_id = event.user_id().clone();

        let consumer_id = match self.provision(&user_id).await {
            Ok(consumer_id) => consumer_id,
            Err(err) if err.is_unusable_event() => {
                warn!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    user_id = %user_id,
                    error = %err,
                    "skipping provisioning message with an unusable user id"
                );
                return MessageOutcome::Skipped;
            }
            Err(err) => {
                warn!(
                    message_id = %message.message_id,
                    receive_count = message.receive_count,
                    user_id = %user_id,
                    retryable = err.is_retryable(),
                    error = %err,
                    "provisioning failed; message left for redelivery"
                );
                return MessageOutcome::Deferred;
            }
        };

        let acknowledged = match self.queue.delete(&message.receipt_handle).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    message_id = %message.message_id,
                    user_id = %user_id,
                    error = %err,
                    "failed to delete provisioned message"
                );
                false
            }
        };

        info!(
            message_id = %message.message_id,
            receive_count = message.receive_count,
            user_id = %user_id,
            consumer_id = %consumer_id,
            "user provisioned"
        );
        MessageOutcome::Provisioned {
            user_id,
            consumer_id,
            acknowledged,
        }
    }

    async fn provision(&self, user_id: &UserId) -> Result<ConsumerId, ProvisioningFailure> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ProvisioningFailure::UserMissing {
                user_id: user_id.clone(),
            })?;

        let consumer_id = self.ensure_consumer(&user).await?;
        self.ensure_credentials(&consumer_id).await?;
        self.store
            .set_external_credential_id(user.id(), &consumer_id)
            .await?;
        Ok(consumer_id)
    }

    async fn ensure_consumer(&self, user: &User) -> Result<ConsumerId, ProvisioningFailure> {
        if let Some(consumer_id) = user.external_credential_id() {
            return Ok(consumer_id.clone());
        }
        if let Some(consumer_id) = self.gateway.find_consumer(user.id()).await? {
            debug!(user_id = %user.id(), consumer_id = %consumer_id, "reusing gateway consumer");
            return Ok(consumer_id);
        }

        let request = NewConsumer {
            username: user.username().clone(),
            custom_id: user.id().clone(),
        };
        match self.gateway.create_consumer(&request).await {
            Ok(consumer_id) => Ok(consumer_id),
            // Lost a race with a concurrent delivery of the same event.
            Err(GatewayError::Conflict { .. }) => self
                .gateway
                .find_consumer(user.id())
                .await?
                .ok_or_else(|| ProvisioningFailure::ConsumerConflict {
                    user_id: user.id().clone(),
                }),
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_credentials(&self, consumer_id: &ConsumerId) -> Result<(), ProvisioningFailure> {
        if self.gateway.list_credentials(consumer_id).await?.is_empty() {
            self.gateway.create_credentials(consumer_id).await?;
        }
        Ok(())
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
