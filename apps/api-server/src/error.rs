//! Mapping from store and validation failures to HTTP responses.

use std::error::Error;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mock_store::NotFound;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation; the message goes to the client.
    BadRequest(String),
    /// Nothing to return. The detail is logged, never sent.
    NotFound(String),
    /// Store misuse, a rejected write, or a dangling reference. Logged, then
    /// reported as a generic server error carrying `context`.
    Internal {
        context: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
}

impl ApiError {
    /// Build a `map_err` adapter that tags a failure with a route message.
    pub fn internal<E>(context: &'static str) -> impl FnOnce(E) -> ApiError
    where
        E: Error + Send + Sync + 'static,
    {
        move |source| ApiError::Internal {
            context,
            source: Box::new(source),
        }
    }
}

impl From<NotFound> for ApiError {
    fn from(err: NotFound) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                warn!(%message, "request rejected");
                (
                    StatusCode::BAD_REQUEST,
                    Json(http_common::json_error_with_message("bad_request", &message)),
                )
                    .into_response()
            }
            ApiError::NotFound(detail) => {
                warn!(%detail, "not found");
                (
                    StatusCode::NOT_FOUND,
                    Json(http_common::json_err("not_found")),
                )
                    .into_response()
            }
            ApiError::Internal { context, source } => {
                error!(err = %source, "{}", context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(http_common::json_error_with_message(
                        "internal",
                        &format!("Server Error: {}", context),
                    )),
                )
                    .into_response()
            }
        }
    }
}
