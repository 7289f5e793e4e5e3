//! In-process [`GatewayClient`] mimicking the gateway admin API.
//!
//! Consumer ids are issued sequentially as `c1`, `c2`, … and both usernames
//! and custom ids are unique, as on the real gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{GatewayClient, GatewayError, NewConsumer};
use crate::domain::{ConsumerId, GatewayCredential, HS256, UserId, Username};

#[derive(Debug)]
struct ConsumerRecord {
    id: ConsumerId,
    username: Username,
    custom_id: UserId,
    credentials: Vec<GatewayCredential>,
}

#[derive(Debug, Default)]
struct GatewayState {
    consumers: Vec<ConsumerRecord>,
    issued_consumers: u64,
}

impl GatewayState {
    fn consumer(&self, id: &ConsumerId) -> Result<&ConsumerRecord, GatewayError> {
        self.consumers
            .iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| GatewayError::rejected(404_u16, format!("consumer {id} not found")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<GatewayState>,
    issued_credential: Option<GatewayCredential>,
    unavailable: AtomicBool,
}

impl InMemoryGateway {
    /// Issue a copy of `credential` for every credential request instead of
    /// random key material.
    pub fn with_issued_credential(credential: GatewayCredential) -> Self {
        Self {
            issued_credential: Some(credential),
            ..Self::default()
        }
    }

    /// Make every call fail as unreachable while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn consumer_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.consumers.len())
    }

    /// Credential sets issued to `consumer_id`; zero for unknown consumers.
    pub fn credential_count(&self, consumer_id: &ConsumerId) -> usize {
        self.state.lock().map_or(0, |state| {
            state
                .consumer(consumer_id)
                .map_or(0, |consumer| consumer.credentials.len())
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, GatewayState>, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::unavailable("in-memory gateway unreachable"));
        }
        self.state
            .lock()
            .map_err(|_| GatewayError::unavailable("in-memory gateway lock poisoned"))
    }

    fn issue_credential(&self) -> GatewayCredential {
        self.issued_credential.clone().unwrap_or_else(|| {
            GatewayCredential::new(
                Uuid::new_v4().simple().to_string(),
                HS256,
                Uuid::new_v4().simple().to_string(),
            )
        })
    }
}

#[async_trait]
impl GatewayClient for InMemoryGateway {
    async fn find_consumer(&self, custom_id: &UserId) -> Result<Option<ConsumerId>, GatewayError> {
        let state = self.lock()?;
        Ok(state
            .consumers
            .iter()
            .find(|c| &c.custom_id == custom_id)
            .map(|c| c.id.clone()))
    }

    async fn create_consumer(&self, consumer: &NewConsumer) -> Result<ConsumerId, GatewayError> {
        let mut state = self.lock()?;
        let duplicate = state
            .consumers
            .iter()
            .any(|c| c.username == consumer.username || c.custom_id == consumer.custom_id);
        if duplicate {
            return Err(GatewayError::conflict(format!(
                "consumer {} already exists",
                consumer.username
            )));
        }

        state.issued_consumers += 1;
        let id = ConsumerId::new(format!("c{}", state.issued_consumers))
            .map_err(|err| GatewayError::decode(err.to_string()))?;
        state.consumers.push(ConsumerRecord {
            id: id.clone(),
            username: consumer.username.clone(),
            custom_id: consumer.custom_id.clone(),
            credentials: Vec::new(),
        });
        Ok(id)
    }

    async fn create_credentials(&self, consumer_id: &ConsumerId) -> Result<(), GatewayError> {
        let credential = self.issue_credential();
        let mut state = self.lock()?;
        state.consumer(consumer_id)?;
        if let Some(consumer) = state.consumers.iter_mut().find(|c| &c.id == consumer_id) {
            consumer.credentials.push(credential);
        }
        Ok(())
    }

    async fn list_credentials(
        &self,
        consumer_id: &ConsumerId,
    ) -> Result<Vec<GatewayCredential>, GatewayError> {
        let state = self.lock()?;
        Ok(state.consumer(consumer_id)?.credentials.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_consumer(username: &str, custom_id: &str) -> NewConsumer {
        NewConsumer {
            username: Username::new(username).expect("username"),
            custom_id: UserId::new(custom_id).expect("user id"),
        }
    }

    #[tokio::test]
    async fn consumers_are_numbered_and_findable() {
        let gateway = InMemoryGateway::default();

        let first = gateway
            .create_consumer(&new_consumer("ada", "1"))
            .await
            .expect("first");
        let second = gateway
            .create_consumer(&new_consumer("grace", "2"))
            .await
            .expect("second");

        assert_eq!(first.as_ref(), "c1");
        assert_eq!(second.as_ref(), "c2");
        let found = gateway
            .find_consumer(&UserId::new("2").expect("id"))
            .await
            .expect("lookup");
        assert_eq!(found, Some(second));
    }

    #[tokio::test]
    async fn duplicate_custom_id_conflicts() {
        let gateway = InMemoryGateway::default();
        gateway
            .create_consumer(&new_consumer("ada", "1"))
            .await
            .expect("first");

        let err = gateway
            .create_consumer(&new_consumer("ada-again", "1"))
            .await
            .expect_err("conflict");

        assert!(matches!(err, GatewayError::Conflict { .. }));
        assert_eq!(gateway.consumer_count(), 1);
    }

    #[tokio::test]
    async fn credentials_start_empty_and_use_the_configured_template() {
        let template = GatewayCredential::new("K", HS256, "S");
        let gateway = InMemoryGateway::with_issued_credential(template.clone());
        let consumer = gateway
            .create_consumer(&new_consumer("ada", "1"))
            .await
            .expect("consumer");

        assert!(gateway.list_credentials(&consumer).await.expect("list").is_empty());
        gateway
            .create_credentials(&consumer)
            .await
            .expect("credentials");

        assert_eq!(
            gateway.list_credentials(&consumer).await.expect("list"),
            vec![template]
        );
    }

    #[tokio::test]
    async fn unknown_consumer_is_rejected_with_not_found() {
        let gateway = InMemoryGateway::default();
        let err = gateway
            .list_credentials(&ConsumerId::new("c9").expect("id"))
            .await
            .expect_err("unknown");
        assert!(matches!(err, GatewayError::Rejected { status: 404, .. }));
    }
}
