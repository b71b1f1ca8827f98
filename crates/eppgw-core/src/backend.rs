//! BackendChannel trait - the invoke seam between router and transport

use std::time::Duration;

use async_trait::async_trait;
use prost_reflect::{DynamicMessage, MethodDescriptor};

use crate::cancel::CancelToken;
use crate::error::RpcError;

/// Capability to invoke any backend RPC method with a bound request, a
/// deadline, and a cancellation signal.
///
/// Implementations must be safe for unbounded concurrent `invoke` calls;
/// any internal synchronization or pooling is theirs to handle. Callers
/// hold one shared handle (`Arc<dyn BackendChannel>`) for the process
/// lifetime.
#[async_trait]
pub trait BackendChannel: Send + Sync {
    /// Issue one unary RPC call.
    ///
    /// Must resolve with `RpcError::cancelled` promptly once `cancel`
    /// fires, and must translate transport-level failures into
    /// `unavailable`/`deadline-exceeded` rather than leaking them raw.
    async fn invoke(
        &self,
        method: &MethodDescriptor,
        request: DynamicMessage,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<DynamicMessage, RpcError>;
}
