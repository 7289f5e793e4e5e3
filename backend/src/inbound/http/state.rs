//! Shared HTTP adapter state.
//!
//! Handlers reach the domain only through these driving ports, so they can be
//! tested against fixtures without any I/O.

use std::sync::Arc;

use crate::domain::ports::{LoginService, RegistrationService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registration: Arc<dyn RegistrationService>,
    pub login: Arc<dyn LoginService>,
}

impl HttpState {
    pub fn new(registration: Arc<dyn RegistrationService>, login: Arc<dyn LoginService>) -> Self {
        Self {
            registration,
            login,
        }
    }
}
