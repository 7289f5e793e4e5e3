//! In-process adapters for every driven port.
//!
//! Used by tests and by the service's `in_memory` mode for local runs
//! without PostgreSQL or a gateway. Each adapter can be switched into an
//! outage with `set_unavailable`.

mod gateway;
mod message_queue;
mod user_store;

pub use gateway::InMemoryGateway;
pub use message_queue::InMemoryMessageQueue;
pub use user_store::InMemoryUserStore;
