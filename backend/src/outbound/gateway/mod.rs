//! API gateway adapters.
//!
//! [`KongGatewayClient`] speaks the Kong admin API's consumer and JWT
//! credential endpoints over HTTP.

mod dto;
mod http_client;

pub use http_client::KongGatewayClient;
