//! User registration.
//!
//! A user row and its provisioning event are written together: the event is
//! staged on the insert's transaction and becomes receivable only when that
//! transaction commits. A user never exists without a provisioning signal,
//! and a signal never precedes or outlives its user.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt as _;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ports::{
    RegisteredUser, RegistrationService, UserStore, UserStoreError, UserTransaction,
};
use super::{Error, UserCreatedEvent, UserId, Username};

/// Open transaction handed to a [`with_user_transaction`] side effect.
pub type OpenUserTransaction<'t> = &'t mut (dyn UserTransaction + 'static);

/// Insert `username` and run `side_effect` inside one store transaction.
///
/// `side_effect` receives the new id and the open transaction, so writes it
/// stages there share the insert's fate. Commits only when both succeed.
/// Otherwise the transaction is rolled back and the first error is returned;
/// a failing rollback is logged and does not replace it.
pub async fn with_user_transaction<F, E>(
    store: &dyn UserStore,
    username: &Username,
    side_effect: F,
) -> Result<UserId, E>
where
    F: for<'t> FnOnce(UserId, OpenUserTransaction<'t>) -> BoxFuture<'t, Result<(), E>> + Send,
    E: From<UserStoreError> + Send,
{
    let mut transaction = store.begin().await?;

    let user_id = match transaction.insert_user(username).await {
        Ok(user_id) => user_id,
        Err(err) => {
            roll_back(transaction).await;
            return Err(err.into());
        }
    };

    let staged = side_effect(user_id.clone(), transaction.as_mut()).await;
    if let Err(err) = staged {
        roll_back(transaction).await;
        return Err(err);
    }

    transaction.commit().await?;
    Ok(user_id)
}

async fn roll_back(transaction: Box<dyn UserTransaction>) {
    if let Err(err) = transaction.rollback().await {
        warn!(error = %err, "user transaction rollback failed");
    }
}

#[derive(Debug, Error)]
enum RegistrationFailure {
    #[error(transparent)]
    Store(#[from] UserStoreError),
    #[error("failed to encode provisioning event: {0}")]
    Encode(String),
}

impl From<RegistrationFailure> for Error {
    fn from(failure: RegistrationFailure) -> Self {
        match failure {
            RegistrationFailure::Store(UserStoreError::UniqueViolation { .. }) => {
                Error::conflict("username already exists")
            }
            other => Error::internal(other.to_string()),
        }
    }
}

/// [`RegistrationService`] that stages a `user_created` event alongside
/// every new user.
#[derive(Clone)]
pub struct UserRegistrationService {
    store: Arc<dyn UserStore>,
}

impl UserRegistrationService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RegistrationService for UserRegistrationService {
    async fn register(&self, username: &Username) -> Result<RegisteredUser, Error> {
        let result = with_user_transaction(self.store.as_ref(), username, |user_id, transaction| {
            async move {
                let body = UserCreatedEvent::new(user_id)
                    .to_message_body()
                    .map_err(|err| RegistrationFailure::Encode(err.to_string()))?;
                transaction.enqueue_event(&body).await?;
                Ok::<(), RegistrationFailure>(())
            }
            .boxed()
        })
        .await;

        match result {
            Ok(id) => {
                info!(user_id = %id, username = %username, "user registered");
                Ok(RegisteredUser {
                    id,
                    username: username.clone(),
                })
            }
            Err(failure) => {
                debug!(username = %username, error = %failure, "registration failed");
                Err(failure.into())
            }
        }
    }
}
