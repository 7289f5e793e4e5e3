//! "User created" event exchanged between registration and provisioning.
//!
//! Wire format: `{"event_type":"user_created","payload":{"user_id":"<id>"}}`.
//! Decoding inspects the envelope first so other event types sharing the
//! queue are reported as a mismatch rather than as malformed JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::user::UserId;

/// Event type tag carried by [`UserCreatedEvent`].
pub const USER_CREATED: &str = "user_created";

/// Reasons a queue message body is not a usable [`UserCreatedEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    #[error("message body is not a valid event envelope: {message}")]
    Malformed { message: String },
    #[error("unexpected event type: {event_type}")]
    UnexpectedType { event_type: String },
    #[error("user_created payload is invalid: {message}")]
    InvalidPayload { message: String },
}

#[derive(Serialize, Deserialize)]
struct Envelope<P> {
    event_type: String,
    payload: P,
}

#[derive(Serialize, Deserialize)]
struct UserCreatedPayload {
    user_id: UserId,
}

/// Signal that a user row was committed and needs gateway provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreatedEvent {
    user_id: UserId,
}

impl UserCreatedEvent {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Serialise into a queue message body.
    pub fn to_message_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Envelope {
            event_type: USER_CREATED.to_owned(),
            payload: UserCreatedPayload {
                user_id: self.user_id.clone(),
            },
        })
    }

    /// Parse a queue message body.
    ///
    /// # Examples
    /// ```
    /// use users_service::domain::{EventDecodeError, UserCreatedEvent};
    ///
    /// let event = UserCreatedEvent::from_message_body(
    ///     r#"{"event_type":"user_created","payload":{"user_id":"123"}}"#,
    /// )
    /// .expect("valid event");
    /// assert_eq!(event.user_id().as_ref(), "123");
    ///
    /// let other = UserCreatedEvent::from_message_body(
    ///     r#"{"event_type":"user_deleted","payload":{}}"#,
    /// );
    /// assert!(matches!(other, Err(EventDecodeError::UnexpectedType { .. })));
    /// ```
    pub fn from_message_body(body: &str) -> Result<Self, EventDecodeError> {
        let envelope: Envelope<Value> =
            serde_json::from_str(body).map_err(|err| EventDecodeError::Malformed {
                message: err.to_string(),
            })?;
        if envelope.event_type != USER_CREATED {
            return Err(EventDecodeError::UnexpectedType {
                event_type: envelope.event_type,
            });
        }
        let payload: UserCreatedPayload =
            serde_json::from_value(envelope.payload).map_err(|err| {
                EventDecodeError::InvalidPayload {
                    message: err.to_string(),
                }
            })?;
        Ok(Self::new(payload.user_id))
    }
}
