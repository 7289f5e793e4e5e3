//! Domain ports for the hexagonal boundary.
//!
//! Driving ports (`RegistrationService`, `LoginService`) are called by inbound
//! adapters. Driven ports (`UserStore`, `GatewayClient`, `MessageQueue`) are
//! implemented by outbound adapters and injected as `Arc<dyn _>`.

mod macros;
pub(crate) use macros::define_port_error;

mod gateway_client;
mod login_service;
mod message_queue;
mod registration_service;
mod user_store;

#[cfg(test)]
pub use gateway_client::MockGatewayClient;
pub use gateway_client::{GatewayClient, GatewayError, NewConsumer};
pub use login_service::{FixtureLoginService, LoginService};
#[cfg(test)]
pub use message_queue::MockMessageQueue;
pub use message_queue::{MessageQueue, QueueError, QueueMessage, ReceiptHandle};
pub use registration_service::{FixtureRegistrationService, RegisteredUser, RegistrationService};
#[cfg(test)]
pub use user_store::MockUserStore;
pub use user_store::{UserStore, UserStoreError, UserTransaction};
