//! Login: exchange a provisioned username for a signed gateway token.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::ports::{GatewayClient, LoginService, UserStore, UserStoreError};
use super::{Error, Username, craft_token};

/// [`LoginService`] that signs tokens with the user's first gateway credential.
///
/// Unknown usernames are unauthorised. A user whose provisioning has not
/// finished yet fails as an internal error, the same as a gateway outage.
#[derive(Clone)]
pub struct TokenLoginService {
    store: Arc<dyn UserStore>,
    gateway: Arc<dyn GatewayClient>,
}

impl TokenLoginService {
    pub fn new(store: Arc<dyn UserStore>, gateway: Arc<dyn GatewayClient>) -> Self {
        Self { store, gateway }
    }
}

#[async_trait]
impl LoginService for TokenLoginService {
    async fn login(&self, username: &Username) -> Result<String, Error> {
        let consumer_id = match self.store.get_external_credential_id(username).await {
            Ok(Some(consumer_id)) => consumer_id,
            Ok(None) => {
                return Err(Error::internal(format!(
                    "user {username} has no gateway consumer yet"
                )));
            }
            Err(UserStoreError::NotFound { .. }) => {
                debug!(username = %username, "login for unknown username");
                return Err(Error::unauthorized("Unauthorized"));
            }
            Err(err) => return Err(Error::internal(err.to_string())),
        };

        let credentials = self
            .gateway
            .list_credentials(&consumer_id)
            .await
            .map_err(|err| Error::internal(err.to_string()))?;
        let Some(credential) = credentials.first() else {
            return Err(Error::internal(format!(
                "no credentials found for consumer {consumer_id}"
            )));
        };

        craft_token(credential).map_err(|err| Error::internal(err.to_string()))
    }
}
