//! Driven port for the API gateway's consumer and credential endpoints.

use async_trait::async_trait;

use crate::domain::{ConsumerId, GatewayCredential, UserId, Username};

use super::define_port_error;

/// Consumer registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConsumer {
    pub username: Username,
    /// Correlation key linking the consumer back to the local user.
    pub custom_id: UserId,
}

define_port_error! {
    /// Errors surfaced while calling the gateway.
    pub enum GatewayError {
        /// The gateway could not be reached.
        Unavailable { message: String } => "gateway unavailable: {message}",
        /// The call exceeded the request timeout.
        Timeout { message: String } => "gateway timeout: {message}",
        /// The gateway refused a create because the record already exists.
        Conflict { message: String } => "gateway conflict: {message}",
        /// The gateway answered with a non-success status.
        Rejected { status: u16, message: String } =>
            "gateway rejected request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "gateway response decode failed: {message}",
    }
}

impl GatewayError {
    /// Whether a later attempt may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { .. } | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Conflict { .. } | Self::Decode { .. } => false,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Find the consumer registered under `custom_id`, if any.
    async fn find_consumer(&self, custom_id: &UserId) -> Result<Option<ConsumerId>, GatewayError>;

    async fn create_consumer(&self, consumer: &NewConsumer) -> Result<ConsumerId, GatewayError>;

    /// Issue a new signing credential set for the consumer.
    async fn create_credentials(&self, consumer_id: &ConsumerId) -> Result<(), GatewayError>;

    /// List credential sets in gateway order. Empty means none issued yet.
    async fn list_credentials(
        &self,
        consumer_id: &ConsumerId,
    ) -> Result<Vec<GatewayCredential>, GatewayError>;
}
