//! Service settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `USERS_*` environment variables and config
//! files. Every field is optional on the wire; the accessors supply defaults.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ProvisioningWorkerConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_POOL_SIZE: u32 = 10;
const DEFAULT_QUEUE_NAME: &str = "user-events";
const DEFAULT_QUEUE_VISIBILITY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_GATEWAY_ADMIN_URL: &str = "http://kong:8001";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 5_000;

/// Runtime configuration for the users service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERS")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string. Required unless `in_memory` is set.
    pub database_url: Option<String>,
    pub db_pool_size: Option<u32>,
    /// Logical queue carrying provisioning events.
    pub queue_name: Option<String>,
    /// Seconds a received message stays hidden from other receivers.
    pub queue_visibility_timeout_secs: Option<u64>,
    /// Milliseconds between queue polls while a receive is waiting.
    pub queue_poll_interval_ms: Option<u64>,
    /// Base URL of the gateway admin API.
    pub gateway_admin_url: Option<String>,
    /// Per-request timeout for gateway calls, in milliseconds.
    pub gateway_timeout_ms: Option<u64>,
    pub worker_batch_size: Option<u32>,
    pub worker_wait_secs: Option<u64>,
    pub worker_error_backoff_ms: Option<u64>,
    /// Run against in-process adapters instead of PostgreSQL and the gateway.
    #[ortho_config(default = false)]
    pub in_memory: bool,
}

/// Settings that cannot be turned into a running service.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database_url is required unless in_memory is enabled")]
    MissingDatabaseUrl,
    #[error("invalid gateway_admin_url {value:?}: {source}")]
    InvalidGatewayUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

impl AppSettings {
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// The database URL, which must be present for persistent runs.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    pub fn db_pool_size(&self) -> u32 {
        self.db_pool_size.unwrap_or(DEFAULT_DB_POOL_SIZE)
    }

    pub fn queue_name(&self) -> &str {
        self.queue_name.as_deref().unwrap_or(DEFAULT_QUEUE_NAME)
    }

    pub fn queue_visibility_timeout(&self) -> Duration {
        Duration::from_secs(
            self.queue_visibility_timeout_secs
                .unwrap_or(DEFAULT_QUEUE_VISIBILITY_TIMEOUT_SECS),
        )
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.queue_poll_interval_ms
                .unwrap_or(DEFAULT_QUEUE_POLL_INTERVAL_MS),
        )
    }

    pub fn gateway_admin_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .gateway_admin_url
            .as_deref()
            .unwrap_or(DEFAULT_GATEWAY_ADMIN_URL);
        Url::parse(raw).map_err(|source| SettingsError::InvalidGatewayUrl {
            value: raw.to_owned(),
            source,
        })
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms.unwrap_or(DEFAULT_GATEWAY_TIMEOUT_MS))
    }

    /// Worker polling parameters, defaulting field by field.
    pub fn worker_config(&self) -> ProvisioningWorkerConfig {
        let defaults = ProvisioningWorkerConfig::default();
        ProvisioningWorkerConfig {
            batch_size: self.worker_batch_size.unwrap_or(defaults.batch_size),
            wait_time: self
                .worker_wait_secs
                .map_or(defaults.wait_time, Duration::from_secs),
            receive_error_backoff: self
                .worker_error_backoff_ms
                .map_or(defaults.receive_error_backoff, Duration::from_millis),
        }
    }
}
