//! HTTP rendering of domain errors.
//!
//! Every failure is returned as `{"error": <message>}`. Internal errors are
//! logged in full, tagged with the request's trace id, and answered with the
//! status reason only.

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::{Error, ErrorCode};
use crate::middleware::trace::TraceId;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            let trace_id = TraceId::current().map(|id| id.to_string());
            error!(
                trace_id = trace_id.as_deref().unwrap_or("-"),
                error = %self.message(),
                "request failed"
            );
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_owned()
        } else {
            self.message().to_owned()
        };

        HttpResponse::build(status).json(ErrorBody { error: message })
    }
}

/// Render unreadable JSON bodies as `400 {"error": ...}`.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    Error::invalid_request(format!("invalid request body: {err}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;

    async fn body_of(error: &Error) -> ErrorBody {
        let response = error.error_response();
        let bytes = to_bytes(response.into_body())
            .await
            .expect("reading response body succeeds");
        serde_json::from_slice(&bytes).expect("error body decodes")
    }

    #[rstest]
    #[case::invalid(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case::unauthorized(Error::unauthorized("Unauthorized"), StatusCode::UNAUTHORIZED)]
    #[case::conflict(Error::conflict("taken"), StatusCode::CONFLICT)]
    #[case::internal(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
        assert_eq!(ResponseError::status_code(&err), status);
    }

    #[actix_web::test]
    async fn client_errors_carry_their_message() {
        let body = body_of(&Error::conflict("username already exists")).await;
        assert_eq!(body.error, "username already exists");
    }

    #[actix_web::test]
    async fn internal_errors_are_redacted() {
        let body = body_of(&Error::internal("pool timed out after 30s")).await;
        assert_eq!(body.error, "Internal Server Error");
    }

    #[actix_web::test]
    async fn internal_errors_render_inside_a_trace_scope() {
        let trace_id: TraceId = "00000000-0000-0000-0000-000000000001"
            .parse()
            .expect("valid UUID");
        let err = Error::internal("queue offline");

        let body = TraceId::scope(trace_id, body_of(&err)).await;

        assert_eq!(body.error, "Internal Server Error");
    }
}
