//! User registration and login handlers.
//!
//! ```text
//! POST /users {"username":"user-123"}  -> 201 {"id":"...","username":"user-123"}
//! POST /login {"username":"user-123"}  -> 200 {"jwt":"..."}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Error, UserValidationError, Username};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Request body shared by registration and login.
#[derive(Debug, Deserialize, Serialize)]
pub struct UsernameRequest {
    pub username: String,
}

/// Body of a successful registration.
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisteredUserResponse {
    pub id: String,
    pub username: String,
}

/// Body of a successful login.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub jwt: String,
}

fn parse_username(request: &UsernameRequest) -> ApiResult<Username> {
    Username::new(&request.username).map_err(map_validation_error)
}

fn map_validation_error(err: UserValidationError) -> Error {
    Error::invalid_request(err.to_string())
}

/// Register a user and queue its gateway provisioning.
#[post("/users")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<UsernameRequest>,
) -> ApiResult<HttpResponse> {
    let username = parse_username(&payload)?;
    let registered = state.registration.register(&username).await?;

    Ok(HttpResponse::Created().json(RegisteredUserResponse {
        id: registered.id.to_string(),
        username: registered.username.to_string(),
    }))
}

/// Exchange a provisioned username for a signed gateway token.
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<UsernameRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let username = parse_username(&payload)?;
    let jwt = state.login.login(&username).await?;
    info!(username = %username, "token issued");
    Ok(web::Json(LoginResponse { jwt }))
}
