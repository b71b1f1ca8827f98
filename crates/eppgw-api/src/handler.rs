//! The transcoding handler: Match (axum routing) -> Bind -> Dispatch ->
//! Render.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{RawPathParams, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use eppgw_core::CancelHandle;

use crate::error::ApiError;
use crate::state::RouteState;
use crate::{bind, render};

/// The one handler behind every table route.
pub(crate) async fn transcode(
    State(state): State<RouteState>,
    params: RawPathParams,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let route = state.route.as_ref();
    let options = state.app.options();

    let timeout = request_timeout(&headers, options.default_timeout)?;

    let path_params: Vec<(&str, &str)> = params.iter().collect();
    let request = bind::bind_request(
        route,
        &path_params,
        query.as_deref(),
        &body,
        options.strict,
    )?;

    tracing::debug!(
        method = %route.method(),
        path = route.pattern(),
        rpc = route.rpc().full_name(),
        "transcoding request"
    );

    // The handle lives exactly as long as this future. When the client
    // disconnects, hyper drops the future, the handle drops, and the
    // in-flight backend call observes cancellation through the token.
    let (_cancel_handle, cancel) = CancelHandle::new();

    let reply = state
        .app
        .backend()
        .invoke(route.rpc(), request, timeout, &cancel)
        .await?;

    let json = render::render_response(route, &reply)?;
    Ok((StatusCode::OK, Json(json)).into_response())
}

/// Structured 404 for unrouted paths and method mismatches.
pub(crate) async fn not_found() -> ApiError {
    ApiError::not_found("no route matches the request")
}

fn request_timeout(headers: &HeaderMap, default: Duration) -> Result<Duration, ApiError> {
    let Some(value) = headers.get("grpc-timeout") else {
        return Ok(default);
    };
    value
        .to_str()
        .ok()
        .and_then(parse_grpc_timeout)
        .ok_or_else(|| {
            eppgw_core::RpcError::invalid_argument("malformed grpc-timeout header").into()
        })
}

/// `grpc-timeout` wire format: one to eight ASCII digits followed by a
/// unit, one of `H`, `M`, `S`, `m`, `u`, `n`.
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 3600)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
