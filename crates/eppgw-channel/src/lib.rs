//! eppgw-channel - Backend channel manager for the EPP HTTP gateway
//!
//! Owns the single long-lived, TLS-secured gRPC channel to the registry
//! backend and implements the `BackendChannel` invoke capability over it,
//! carrying `DynamicMessage`s through a per-method codec so the gateway
//! needs no generated client code.

pub mod channel;
pub mod codec;

pub use channel::GrpcChannel;
pub use codec::DynamicCodec;
