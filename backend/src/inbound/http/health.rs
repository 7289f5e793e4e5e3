//! Health check for load balancers and orchestration.

use actix_web::{HttpResponse, get, http::header};

/// Liveness probe. Always answers `200 "OK"` while the server accepts
/// requests.
#[get("/_hc")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json("OK")
}
