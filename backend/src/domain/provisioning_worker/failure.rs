//! Internal failure type for one provisioning attempt.

use thiserror::Error;

use crate::domain::UserId;
use crate::domain::ports::{GatewayError, UserStoreError};

#[derive(Debug, Error)]
pub(super) enum ProvisioningFailure {
    #[error("user {user_id} does not exist (yet)")]
    UserMissing { user_id: UserId },
    #[error("gateway reported a consumer conflict for {user_id} but none matches its custom id")]
    ConsumerConflict { user_id: UserId },
    #[error(transparent)]
    Store(#[from] UserStoreError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ProvisioningFailure {
    /// Whether redelivery alone may fix this attempt.
    pub(super) fn is_retryable(&self) -> bool {
        match self {
            Self::UserMissing { .. } => true,
            Self::ConsumerConflict { .. } => false,
            Self::Store(err) => matches!(err, UserStoreError::Connection { .. }),
            Self::Gateway(err) => err.is_retryable(),
        }
    }

    /// Whether the event names something that can never be provisioned.
    pub(super) fn is_unusable_event(&self) -> bool {
        matches!(self, Self::Store(UserStoreError::InvalidId { .. }))
    }
}
