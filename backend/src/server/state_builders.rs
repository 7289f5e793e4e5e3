//! Adapter selection and service assembly.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use users_service::config::AppSettings;
use users_service::domain::ports::{GatewayClient, MessageQueue, UserStore};
use users_service::domain::{
    ProvisioningWorker, ProvisioningWorkerConfig, ProvisioningWorkerPorts, TokenLoginService,
    UserRegistrationService,
};
use users_service::inbound::http::HttpState;
use users_service::outbound::gateway::KongGatewayClient;
use users_service::outbound::memory::{InMemoryGateway, InMemoryMessageQueue, InMemoryUserStore};
use users_service::outbound::persistence::{
    DbPool, DieselMessageQueue, DieselUserStore, PoolConfig, run_pending_migrations,
};

/// Driven port implementations shared by the HTTP handlers and the worker.
#[derive(Clone)]
pub struct Adapters {
    pub store: Arc<dyn UserStore>,
    pub queue: Arc<dyn MessageQueue>,
    pub gateway: Arc<dyn GatewayClient>,
}

impl Adapters {
    /// In-process adapters for local runs without external services.
    pub fn in_memory() -> Self {
        let queue = Arc::new(InMemoryMessageQueue::default());
        Self {
            store: Arc::new(InMemoryUserStore::with_event_queue(queue.clone())),
            queue,
            gateway: Arc::new(InMemoryGateway::default()),
        }
    }

    /// PostgreSQL store and queue plus the HTTP gateway client.
    ///
    /// Applies pending migrations before the pool is handed out.
    pub async fn postgres(settings: &AppSettings) -> Result<Self> {
        let database_url = settings.database_url()?;
        run_pending_migrations(database_url)
            .await
            .wrap_err("failed to migrate database")?;

        let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(settings.db_pool_size()))
            .await
            .wrap_err("failed to build database pool")?;
        let queue = DieselMessageQueue::new(pool.clone(), settings.queue_name())
            .with_visibility_timeout(settings.queue_visibility_timeout())
            .with_poll_interval(settings.queue_poll_interval());
        let gateway =
            KongGatewayClient::new(settings.gateway_admin_url()?, settings.gateway_timeout())
                .wrap_err("failed to build gateway client")?;

        info!(queue = %queue.queue_name(), "using PostgreSQL adapters");
        Ok(Self {
            store: Arc::new(DieselUserStore::new(pool, settings.queue_name())),
            queue: Arc::new(queue),
            gateway: Arc::new(gateway),
        })
    }
}

/// Wire the registration and login services over `adapters`.
pub fn build_http_state(adapters: &Adapters) -> web::Data<HttpState> {
    let registration = UserRegistrationService::new(Arc::clone(&adapters.store));
    let login = TokenLoginService::new(Arc::clone(&adapters.store), Arc::clone(&adapters.gateway));
    web::Data::new(HttpState::new(Arc::new(registration), Arc::new(login)))
}

pub fn build_worker(adapters: &Adapters, config: ProvisioningWorkerConfig) -> ProvisioningWorker {
    ProvisioningWorker::new(
        ProvisioningWorkerPorts::new(
            Arc::clone(&adapters.queue),
            Arc::clone(&adapters.store),
            Arc::clone(&adapters.gateway),
        ),
        config,
    )
}
