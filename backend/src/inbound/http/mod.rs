//! HTTP inbound adapter exposing the REST endpoints.

pub mod error;
pub mod health;
pub mod state;
pub mod users;

use actix_web::web;

pub use error::{ApiResult, ErrorBody, json_error_handler};
pub use state::HttpState;

/// Register every route and the JSON extractor configuration.
///
/// The caller supplies [`HttpState`] as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health::health_check)
        .service(users::register)
        .service(users::login);
}
