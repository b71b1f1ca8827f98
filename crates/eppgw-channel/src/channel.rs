//! The TLS-secured gRPC channel to the registry backend.

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use http::uri::PathAndQuery;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Request, Status};

use eppgw_core::schema;
use eppgw_core::{BackendChannel, CancelToken, ConfigError, RpcCode, RpcError};

use crate::codec::DynamicCodec;

/// One shared, long-lived channel to the backend.
///
/// Built once at startup; cloned per call (tonic channel clones multiplex
/// over the same HTTP/2 connection), so concurrent `invoke` calls need no
/// locking here. The connection itself is established lazily: endpoint
/// unreachability surfaces per request as `unavailable`.
#[derive(Debug, Clone)]
pub struct GrpcChannel {
    channel: Channel,
}

impl GrpcChannel {
    /// Prepare a channel to `endpoint` trusting only the CA certificate at
    /// `ca_path` (PEM, server authentication only).
    pub fn connect(endpoint: &str, ca_path: &Path) -> Result<Self, ConfigError> {
        let pem = fs::read(ca_path).map_err(|source| ConfigError::Io {
            path: ca_path.display().to_string(),
            source,
        })?;
        if !pem_has_certificate(&pem) {
            return Err(ConfigError::InvalidCertificate {
                path: ca_path.display().to_string(),
            });
        }

        let tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem));

        let uri = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: uri.clone(),
                reason: e.to_string(),
            })?
            .tls_config(tls)
            .map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: uri,
                reason: e.to_string(),
            })?;

        Ok(Self {
            channel: endpoint.connect_lazy(),
        })
    }
}

#[async_trait]
impl BackendChannel for GrpcChannel {
    async fn invoke(
        &self,
        method: &MethodDescriptor,
        request: DynamicMessage,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<DynamicMessage, RpcError> {
        let path = PathAndQuery::from_maybe_shared(schema::grpc_path(method))
            .map_err(|e| RpcError::internal(format!("invalid rpc path: {e}")))?;
        let codec = DynamicCodec::new(method.clone());

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        let mut req = Request::new(request);
        req.set_timeout(timeout);

        let call = async move {
            grpc.ready().await.map_err(|e| {
                tracing::warn!(error = %e, "backend channel not ready");
                RpcError::unavailable("backend unavailable")
            })?;
            grpc.unary(req, path, codec)
                .await
                .map(tonic::Response::into_inner)
                .map_err(status_to_error)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RpcError::cancelled("request cancelled by client")),
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(result) => result,
                Err(_) => Err(RpcError::deadline_exceeded("backend call deadline exceeded")),
            },
        }
    }
}

/// Translate a backend `Status` into the gateway's error vocabulary.
///
/// Transport-flavored codes get generic messages; the raw detail is
/// logged but never reaches a response body.
fn status_to_error(status: Status) -> RpcError {
    let code = match status.code() {
        Code::Cancelled => RpcCode::Cancelled,
        Code::InvalidArgument => RpcCode::InvalidArgument,
        Code::DeadlineExceeded => RpcCode::DeadlineExceeded,
        Code::NotFound => RpcCode::NotFound,
        Code::AlreadyExists => RpcCode::AlreadyExists,
        Code::PermissionDenied => RpcCode::PermissionDenied,
        Code::ResourceExhausted => RpcCode::ResourceExhausted,
        Code::FailedPrecondition => RpcCode::FailedPrecondition,
        Code::Aborted => RpcCode::Aborted,
        Code::OutOfRange => RpcCode::OutOfRange,
        Code::Unimplemented => RpcCode::Unimplemented,
        Code::Unauthenticated => RpcCode::Unauthenticated,
        Code::Unavailable => RpcCode::Unavailable,
        Code::Internal => RpcCode::Internal,
        Code::DataLoss => RpcCode::DataLoss,
        Code::Unknown => RpcCode::Unknown,
        // A backend must not put Ok on the error path; treat it as internal.
        Code::Ok => RpcCode::Internal,
    };

    match code {
        RpcCode::Unavailable => {
            tracing::warn!(detail = %status.message(), "backend unavailable");
            RpcError::unavailable("backend unavailable")
        }
        RpcCode::Internal | RpcCode::Unknown | RpcCode::DataLoss => {
            tracing::error!(code = %code, detail = %status.message(), "backend error");
            RpcError::new(code, "backend error")
        }
        _ => RpcError::new(code, status.message()),
    }
}

/// Shallow PEM sanity check: the trust anchor file must contain at least
/// one certificate block.
fn pem_has_certificate(pem: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(pem) else {
        return false;
    };
    text.contains("-----BEGIN CERTIFICATE-----") && text.contains("-----END CERTIFICATE-----")
}
