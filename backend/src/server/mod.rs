//! Server construction and middleware wiring.

mod state_builders;

pub use state_builders::{Adapters, build_http_state, build_worker};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use users_service::Trace;
use users_service::inbound::http::{HttpState, configure};

/// Assemble the application: shared state, request tracing and routes.
pub fn build_app(
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(http_state)
        .wrap(Trace)
        .configure(configure)
}

/// Bind the HTTP server to `bind_addr`.
///
/// The returned [`Server`] must be awaited to drive the listener; it stops on
/// SIGINT or SIGTERM.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(http_state: web::Data<HttpState>, bind_addr: &str) -> std::io::Result<Server> {
    let server = HttpServer::new(move || build_app(http_state.clone()))
        .bind(bind_addr)?
        .run();
    Ok(server)
}
