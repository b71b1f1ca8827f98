//! eppgw-core - Core types for the EPP HTTP gateway
//!
//! This crate provides the pieces shared by the channel manager and the
//! transcoding router: the declarative route table, the protobuf schema
//! (descriptor pool) it is resolved against, the error taxonomy with its
//! fixed HTTP status mapping, the per-request cancellation signal, and the
//! `BackendChannel` trait that the router invokes backends through.

pub mod backend;
pub mod cancel;
pub mod error;
pub mod route;
pub mod schema;
pub mod testing;

pub use backend::BackendChannel;
pub use cancel::{CancelHandle, CancelToken};
pub use error::{ConfigError, RpcCode, RpcError};
pub use route::{BodyBinding, Route, RouteSpec, RouteTable};
