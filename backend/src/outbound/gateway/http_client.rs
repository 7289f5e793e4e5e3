//! Reqwest-backed gateway admin client.
//!
//! Owns transport concerns only: URL construction, timeouts, status mapping
//! and JSON decoding. Retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{ConsumerDto, CreateConsumerDto, CredentialDto, ListDto};
use crate::domain::ports::{GatewayClient, GatewayError, NewConsumer};
use crate::domain::{ConsumerId, GatewayCredential, UserId};

const CONSUMERS: &str = "consumers";
const JWT: &str = "jwt";

/// [`GatewayClient`] for the Kong admin API.
#[derive(Debug, Clone)]
pub struct KongGatewayClient {
    client: Client,
    admin_url: Url,
}

impl KongGatewayClient {
    /// Build a client rooted at `admin_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(admin_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, admin_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.admin_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::unavailable("gateway admin URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl GatewayClient for KongGatewayClient {
    async fn find_consumer(&self, custom_id: &UserId) -> Result<Option<ConsumerId>, GatewayError> {
        let url = self.endpoint(&[CONSUMERS])?;
        let response = self
            .client
            .get(url)
            .query(&[("custom_id", custom_id.to_string())])
            .send()
            .await
            .map_err(map_transport_error)?;

        let list: ListDto<ConsumerDto> = decode(response).await?;
        list.data
            .into_iter()
            .next()
            .map(ConsumerDto::into_consumer_id)
            .transpose()
            .map_err(GatewayError::decode)
    }

    async fn create_consumer(&self, consumer: &NewConsumer) -> Result<ConsumerId, GatewayError> {
        let url = self.endpoint(&[CONSUMERS])?;
        let username = consumer.username.to_string();
        let custom_id = consumer.custom_id.to_string();
        let response = self
            .client
            .post(url)
            .json(&CreateConsumerDto {
                username: &username,
                custom_id: &custom_id,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let created: ConsumerDto = decode(response).await?;
        let consumer_id = created.into_consumer_id().map_err(GatewayError::decode)?;
        debug!(consumer_id = %consumer_id, custom_id = %custom_id, "gateway consumer created");
        Ok(consumer_id)
    }

    async fn create_credentials(&self, consumer_id: &ConsumerId) -> Result<(), GatewayError> {
        let url = self.endpoint(&[CONSUMERS, consumer_id.as_ref(), JWT])?;
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.map_err(map_transport_error)?;
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(())
    }

    async fn list_credentials(
        &self,
        consumer_id: &ConsumerId,
    ) -> Result<Vec<GatewayCredential>, GatewayError> {
        let url = self.endpoint(&[CONSUMERS, consumer_id.as_ref(), JWT])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let list: ListDto<CredentialDto> = decode(response).await?;
        Ok(list.data.into_iter().map(GatewayCredential::from).collect())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }
    serde_json::from_slice(body.as_ref())
        .map_err(|err| GatewayError::decode(format!("invalid gateway JSON payload: {err}")))
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(error.to_string())
    } else {
        GatewayError::unavailable(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        preview
    };

    match status {
        StatusCode::CONFLICT => GatewayError::conflict(message),
        _ => GatewayError::rejected(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview: String = compact.chars().take(PREVIEW_CHAR_LIMIT).collect();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
