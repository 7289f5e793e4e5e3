//! Domain types, ports and services.
//!
//! Purpose: hold the registration, provisioning and login rules independent of
//! HTTP, PostgreSQL or the gateway's wire format. Adapters live in
//! `inbound` and `outbound` and reach the domain only through `ports`.
//!
//! Public surface:
//! - Error / ErrorCode: transport agnostic failure.
//! - User, UserId, Username, ConsumerId: identity values.
//! - GatewayCredential and `craft_token`: token signing.
//! - UserCreatedEvent: provisioning queue payload.
//! - UserRegistrationService, TokenLoginService: driving port implementations.
//! - ProvisioningWorker: queue consumer.

pub mod credential;
pub mod error;
pub mod login;
pub mod ports;
pub mod provisioning_event;
pub mod provisioning_worker;
pub mod registration;
pub mod token;
pub mod user;

pub use self::credential::{GatewayCredential, HS256};
pub use self::error::{Error, ErrorCode};
pub use self::login::TokenLoginService;
pub use self::provisioning_event::{EventDecodeError, USER_CREATED, UserCreatedEvent};
pub use self::provisioning_worker::{
    MessageOutcome, ProvisioningWorker, ProvisioningWorkerConfig, ProvisioningWorkerPorts,
};
pub use self::registration::{OpenUserTransaction, UserRegistrationService, with_user_transaction};
pub use self::token::{TokenError, craft_token};
pub use self::user::{ConsumerId, User, UserId, UserValidationError, Username};
