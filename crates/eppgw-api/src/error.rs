//! API error type and its HTTP rendering

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use eppgw_core::RpcError;

/// The one error type handlers return.
///
/// Every failure, whether synthesized by the gateway or carried from the
/// backend, is an `RpcError`; the HTTP status comes from the fixed
/// code-to-status table and the body is the structured envelope clients
/// branch on.
#[derive(Debug)]
pub struct ApiError(RpcError);

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(RpcError::not_found(message))
    }
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let RpcError { code, message } = self.0;
        let status = code.http_status();

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(code = %code, %message, "gateway error");
        } else if status.is_client_error() {
            tracing::debug!(code = %code, %message, "gateway client error");
        }

        let body = Json(ErrorResponse {
            code: code.as_str(),
            message,
        });

        (status, body).into_response()
    }
}
