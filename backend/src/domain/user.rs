//! User identity model.
//!
//! A [`User`] is created by registration with only an id and a username; the
//! provisioning worker later links it to a gateway consumer through
//! [`User::external_credential_id`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by the user value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    EmptyUsername,
    EmptyConsumerId,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::EmptyUsername => write!(f, "username can't be empty"),
            Self::EmptyConsumerId => write!(f, "consumer id must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Server-generated user identifier.
///
/// Opaque to the domain; the PostgreSQL adapter issues UUID v4 values and the
/// gateway receives it as the consumer's `custom_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        Ok(Self(id))
    }

    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unique login name, trimmed of surrounding whitespace.
///
/// # Examples
/// ```
/// use users_service::domain::Username;
///
/// let name = Username::new("  ada  ").expect("non-empty");
/// assert_eq!(name.as_ref(), "ada");
/// assert!(Username::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Trim and validate a username.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identifier the gateway assigned to a user's consumer record.
///
/// Stored on the user as `external_credential_id` once provisioning finishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConsumerId(String);

impl ConsumerId {
    /// Validate and construct a [`ConsumerId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyConsumerId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ConsumerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ConsumerId> for String {
    fn from(value: ConsumerId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ConsumerId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: Username,
    external_credential_id: Option<ConsumerId>,
}

impl User {
    /// Assemble a user from validated parts.
    pub fn new(
        id: UserId,
        username: Username,
        external_credential_id: Option<ConsumerId>,
    ) -> Self {
        Self {
            id,
            username,
            external_credential_id,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Gateway consumer id, absent until provisioning completes.
    pub fn external_credential_id(&self) -> Option<&ConsumerId> {
        self.external_credential_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("user-123", "user-123")]
    #[case::padded("  user-123\t", "user-123")]
    #[case::inner_space(" ada lovelace ", "ada lovelace")]
    fn username_is_trimmed(#[case] raw: &str, #[case] expected: &str) {
        let name = Username::new(raw).expect("valid username");
        assert_eq!(name.as_ref(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::spaces("    ")]
    #[case::mixed_whitespace(" \n\t ")]
    fn blank_username_is_rejected(#[case] raw: &str) {
        assert_eq!(Username::new(raw), Err(UserValidationError::EmptyUsername));
    }

    #[test]
    fn blank_username_message_matches_client_wording() {
        assert_eq!(
            UserValidationError::EmptyUsername.to_string(),
            "username can't be empty"
        );
    }

    #[test]
    fn random_user_ids_are_distinct() {
        assert_ne!(UserId::random(), UserId::random());
    }

    #[test]
    fn user_id_deserialisation_rejects_blank_values() {
        let result: Result<UserId, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn consumer_id_rejects_blank_values() {
        assert_eq!(
            ConsumerId::new(""),
            Err(UserValidationError::EmptyConsumerId)
        );
    }

    #[test]
    fn new_user_has_no_external_credential() {
        let user = User::new(
            UserId::new("123").expect("id"),
            Username::new("ada").expect("username"),
            None,
        );
        assert!(user.external_credential_id().is_none());
    }
}
