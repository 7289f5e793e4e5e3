//! PostgreSQL adapters built on Diesel.
//!
//! Row structs (`models.rs`) and table definitions (`schema.rs`) stay private
//! to this module; adapters translate them into domain types and map every
//! Diesel or pool failure onto the relevant port error.
//!
//! ```ignore
//! use users_service::outbound::persistence::{DbPool, DieselUserStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/users")).await?;
//! let store = DieselUserStore::new(pool, "user-events");
//! ```

mod diesel_message_queue;
mod diesel_user_store;
mod error_mapping;
pub mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_message_queue::DieselMessageQueue;
pub use diesel_user_store::DieselUserStore;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
