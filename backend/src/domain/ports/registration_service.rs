//! Driving port for user registration.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Error, UserId, Username};

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: UserId,
    pub username: Username,
}

#[async_trait]
pub trait RegistrationService: Send + Sync {
    /// Persist a new user and request its gateway provisioning.
    async fn register(&self, username: &Username) -> Result<RegisteredUser, Error>;
}

/// Registration double that remembers taken usernames in memory.
///
/// Ids are random; no provisioning is requested.
#[derive(Debug, Default)]
pub struct FixtureRegistrationService {
    taken: Mutex<HashSet<String>>,
}

#[async_trait]
impl RegistrationService for FixtureRegistrationService {
    async fn register(&self, username: &Username) -> Result<RegisteredUser, Error> {
        let mut taken = self
            .taken
            .lock()
            .map_err(|_| Error::internal("fixture registration state poisoned"))?;
        if !taken.insert(username.as_ref().to_owned()) {
            return Err(Error::conflict("username already exists"));
        }
        Ok(RegisteredUser {
            id: UserId::random(),
            username: username.clone(),
        })
    }
}
