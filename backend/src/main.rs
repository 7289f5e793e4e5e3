//! Service entry-point: loads settings, starts the provisioning worker and
//! serves the HTTP API until shutdown.

mod server;

use std::ffi::OsString;

use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig as _;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use users_service::config::AppSettings;

use server::{Adapters, build_http_state, build_worker, create_server};

fn load_settings(args: impl IntoIterator<Item = OsString>) -> Result<AppSettings> {
    AppSettings::load_from_iter(args.into_iter().collect::<Vec<_>>())
        .map_err(|err| eyre!("failed to load settings: {err}"))
}

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = load_settings(std::env::args_os())?;

    let adapters = if settings.in_memory {
        warn!("using in-memory adapters; data is lost on exit");
        Adapters::in_memory()
    } else {
        Adapters::postgres(&settings).await?
    };

    let shutdown = CancellationToken::new();
    let worker = build_worker(&adapters, settings.worker_config());
    let worker_shutdown = shutdown.clone();
    let worker_task = actix_web::rt::spawn(async move { worker.run(worker_shutdown).await });

    info!(bind_addr = settings.bind_addr(), "starting HTTP server");
    let served = create_server(build_http_state(&adapters), settings.bind_addr())
        .wrap_err("failed to bind HTTP server")?
        .await;

    shutdown.cancel();
    if let Err(err) = worker_task.await {
        warn!(error = %err, "provisioning worker task failed");
    }
    served.wrap_err("HTTP server failed")
}
