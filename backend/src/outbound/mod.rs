//! Outbound adapters implementing the domain's driven ports.
//!
//! - **persistence**: PostgreSQL user store and message queue via Diesel
//! - **gateway**: reqwest client for the gateway admin API
//! - **memory**: in-process doubles for tests and local runs
//!
//! Adapters translate between domain types and infrastructure formats and
//! hold no business rules.

pub mod gateway;
pub mod memory;
pub mod persistence;
