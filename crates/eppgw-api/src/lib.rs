//! eppgw-api - HTTP/JSON transcoding layer for the EPP gateway
//!
//! This crate turns a resolved `RouteTable` into an axum router whose one
//! generic handler binds each HTTP request into the route's RPC request
//! message, dispatches it through a `BackendChannel`, and renders the
//! reply as JSON. It is backend-agnostic.
//!
//! # Usage
//!
//! ```ignore
//! use eppgw_api::{create_router, AppState, TranscodeOptions};
//! use eppgw_channel::GrpcChannel;
//!
//! let backend = GrpcChannel::connect("registry.example:9090", ca_path)?;
//! let state = AppState::new(Arc::new(backend), TranscodeOptions::default());
//! let router = create_router(state, &table);
//! ```

pub mod bind;
pub mod error;
pub mod handler;
pub mod render;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, TranscodeOptions};

use axum::http::Method;
use axum::routing::{get, on, MethodFilter};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use eppgw_core::RouteTable;

use crate::state::RouteState;

/// Create the gateway router: one axum route per table entry, a health
/// check, and a structured 404 for everything else.
pub fn create_router(state: AppState, table: &RouteTable) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }));

    for route in table.routes() {
        let handler = on(method_filter(route.method()), handler::transcode).with_state(
            RouteState {
                app: state.clone(),
                route: route.clone(),
            },
        );
        router = router.route(route.pattern(), handler);
    }

    router
        // Method mismatches render the same structured 404 as unknown
        // paths: the route table, not the method set, defines the API.
        .fallback(handler::not_found)
        .method_not_allowed_fallback(handler::not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn method_filter(method: &Method) -> MethodFilter {
    match *method {
        Method::GET => MethodFilter::GET,
        Method::POST => MethodFilter::POST,
        Method::PUT => MethodFilter::PUT,
        Method::PATCH => MethodFilter::PATCH,
        Method::DELETE => MethodFilter::DELETE,
        // RouteTable admits only the methods above.
        _ => MethodFilter::POST,
    }
}
