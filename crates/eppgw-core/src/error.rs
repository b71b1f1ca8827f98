//! Error taxonomy: fatal startup errors and per-request RPC errors

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors that prevent the gateway from starting.
///
/// These are only ever produced while loading configuration artifacts or
/// building the backend channel. They terminate the process; nothing at
/// request-handling time returns one.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration artifact could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The CA file contains no PEM certificate block
    #[error("{path} does not contain a PEM certificate")]
    InvalidCertificate { path: String },

    /// The backend endpoint address could not be parsed
    #[error("invalid backend endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The descriptor set file is not a valid FileDescriptorSet
    #[error("invalid descriptor set: {0}")]
    InvalidDescriptorSet(String),

    /// The route table file is not valid TOML
    #[error("failed to parse route table: {0}")]
    InvalidRouteTable(#[from] toml::de::Error),

    /// A route entry is malformed
    #[error("route {method} {path}: {reason}")]
    InvalidRoute {
        method: String,
        path: String,
        reason: String,
    },

    /// Two routes share the same (method, pattern) pair
    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// A route names an RPC method the descriptor set does not define
    #[error("unknown rpc method: {0}")]
    UnknownRpcMethod(String),
}

/// RPC status vocabulary, mirroring the gRPC status codes.
///
/// Serialized in kebab-case; this is the stable `code` field clients
/// branch on in error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl RpcCode {
    /// The kebab-case name used in error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcCode::Cancelled => "cancelled",
            RpcCode::Unknown => "unknown",
            RpcCode::InvalidArgument => "invalid-argument",
            RpcCode::DeadlineExceeded => "deadline-exceeded",
            RpcCode::NotFound => "not-found",
            RpcCode::AlreadyExists => "already-exists",
            RpcCode::PermissionDenied => "permission-denied",
            RpcCode::ResourceExhausted => "resource-exhausted",
            RpcCode::FailedPrecondition => "failed-precondition",
            RpcCode::Aborted => "aborted",
            RpcCode::OutOfRange => "out-of-range",
            RpcCode::Unimplemented => "unimplemented",
            RpcCode::Internal => "internal",
            RpcCode::Unavailable => "unavailable",
            RpcCode::DataLoss => "data-loss",
            RpcCode::Unauthenticated => "unauthenticated",
        }
    }

    /// The HTTP status this code renders as.
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 499 is nginx's "client closed request"; fall back to 400
            // if the platform rejects the non-standard code.
            RpcCode::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
            }
            RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcCode::FailedPrecondition => StatusCode::BAD_REQUEST,
            RpcCode::OutOfRange => StatusCode::BAD_REQUEST,
            RpcCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            RpcCode::PermissionDenied => StatusCode::FORBIDDEN,
            RpcCode::NotFound => StatusCode::NOT_FOUND,
            RpcCode::AlreadyExists => StatusCode::CONFLICT,
            RpcCode::Aborted => StatusCode::CONFLICT,
            RpcCode::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            RpcCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            RpcCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            RpcCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            RpcCode::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for RpcCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured RPC error: either carried from the backend or synthesized
/// by the gateway (malformed input, transport failure, cancellation).
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: RpcCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RpcCode::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcCode::NotFound, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(RpcCode::DeadlineExceeded, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Cancelled, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_fixed_table() {
        assert_eq!(RpcCode::InvalidArgument.http_status().as_u16(), 400);
        assert_eq!(RpcCode::Unauthenticated.http_status().as_u16(), 401);
        assert_eq!(RpcCode::PermissionDenied.http_status().as_u16(), 403);
        assert_eq!(RpcCode::NotFound.http_status().as_u16(), 404);
        assert_eq!(RpcCode::AlreadyExists.http_status().as_u16(), 409);
        assert_eq!(RpcCode::Aborted.http_status().as_u16(), 409);
        assert_eq!(RpcCode::FailedPrecondition.http_status().as_u16(), 400);
        assert_eq!(RpcCode::OutOfRange.http_status().as_u16(), 400);
        assert_eq!(RpcCode::ResourceExhausted.http_status().as_u16(), 429);
        assert_eq!(RpcCode::Unimplemented.http_status().as_u16(), 501);
        assert_eq!(RpcCode::DataLoss.http_status().as_u16(), 500);
        assert_eq!(RpcCode::Unavailable.http_status().as_u16(), 503);
        assert_eq!(RpcCode::DeadlineExceeded.http_status().as_u16(), 504);
        assert_eq!(RpcCode::Cancelled.http_status().as_u16(), 499);
        assert_eq!(RpcCode::Internal.http_status().as_u16(), 500);
        assert_eq!(RpcCode::Unknown.http_status().as_u16(), 500);
    }

    #[test]
    fn code_serializes_in_kebab_case() {
        let json = serde_json::to_string(&RpcCode::InvalidArgument).unwrap();
        assert_eq!(json, "\"invalid-argument\"");
        let json = serde_json::to_string(&RpcCode::DeadlineExceeded).unwrap();
        assert_eq!(json, "\"deadline-exceeded\"");
    }

    #[test]
    fn as_str_agrees_with_serde() {
        for code in [
            RpcCode::Cancelled,
            RpcCode::Unknown,
            RpcCode::InvalidArgument,
            RpcCode::NotFound,
            RpcCode::Unavailable,
            RpcCode::DataLoss,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }
}
