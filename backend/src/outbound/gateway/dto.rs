//! Wire shapes of the gateway admin API.
//!
//! Responses decode into these DTOs first and are mapped to domain types in
//! one pass; unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::domain::{ConsumerId, GatewayCredential};

#[derive(Debug, Serialize)]
pub(super) struct CreateConsumerDto<'a> {
    pub(super) username: &'a str,
    pub(super) custom_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ConsumerDto {
    pub(super) id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct CredentialDto {
    pub(super) key: String,
    pub(super) algorithm: String,
    pub(super) secret: String,
}

/// Paged list envelope used by every collection endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct ListDto<T> {
    #[serde(default = "Vec::new")]
    pub(super) data: Vec<T>,
}

impl ConsumerDto {
    pub(super) fn into_consumer_id(self) -> Result<ConsumerId, String> {
        ConsumerId::new(self.id).map_err(|err| format!("invalid consumer id: {err}"))
    }
}

impl From<CredentialDto> for GatewayCredential {
    fn from(dto: CredentialDto) -> Self {
        GatewayCredential::new(dto.key, dto.algorithm, dto.secret)
    }
}
