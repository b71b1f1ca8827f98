//! Integration test support for the EPP HTTP gateway.
//!
//! `TestGateway` runs the real router on an ephemeral port, backed by a
//! scripted `MockBackend` instead of a live gRPC channel, and tests talk
//! to it over HTTP with reqwest.
//!
//! Run with: cargo test -p eppgw-tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prost_reflect::{DynamicMessage, MethodDescriptor, SerializeOptions};
use serde_json::Value;

use eppgw_api::{create_router, AppState, TranscodeOptions};
use eppgw_core::testing::demo_pool;
use eppgw_core::{BackendChannel, CancelToken, RouteTable, RpcError};

/// The route table the integration tests run against.
pub const ROUTES: &str = r#"
[[routes]]
method = "GET"
path = "/epp/v1/domains/{name}/check"
rpc = "epp.EppGateway.DomainCheck"

[[routes]]
method = "GET"
path = "/epp/v1/domains/{name}"
rpc = "epp.EppGateway.DomainInfo"
response_body = "domain"

[[routes]]
method = "POST"
path = "/epp/v1/domains"
rpc = "epp.EppGateway.DomainCreate"
body = "*"

[[routes]]
method = "POST"
path = "/epp/v1/domains/{name}/transfer"
rpc = "epp.EppGateway.DomainTransfer"
body = "auth_info"
"#;

/// One backend call as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub rpc: String,
    pub request: Value,
    pub timeout: Duration,
}

/// Scripted in-process backend.
///
/// Replies are keyed by the RPC's full name; every call is recorded with
/// its request rendered as proto-named JSON, so tests can assert on the
/// exact message the binding layer produced.
#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<HashMap<String, Result<Value, RpcError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Mutex<Option<Duration>>,
    // Arc so the watcher task outlives a dropped invoke future.
    cancel_observed: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script a successful reply (proto field names) for an RPC.
    pub fn reply(&self, rpc: &str, value: Value) {
        self.replies.lock().unwrap().insert(rpc.to_string(), Ok(value));
    }

    /// Script an error for an RPC.
    pub fn fail(&self, rpc: &str, err: RpcError) {
        self.replies.lock().unwrap().insert(rpc.to_string(), Err(err));
    }

    /// Delay every call, so cancellation can win the race.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether any delayed call saw its cancellation token fire.
    pub fn cancellation_observed(&self) -> bool {
        self.cancel_observed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendChannel for MockBackend {
    async fn invoke(
        &self,
        method: &MethodDescriptor,
        request: DynamicMessage,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<DynamicMessage, RpcError> {
        let rpc = method.full_name().to_string();
        let options = SerializeOptions::new().use_proto_field_name(true);
        let request_json = request
            .serialize_with_options(serde_json::value::Serializer, &options)
            .unwrap();
        self.calls.lock().unwrap().push(RecordedCall {
            rpc: rpc.clone(),
            request: request_json,
            timeout,
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            // This future is dropped when the client goes away, so the
            // observation has to happen in a task of its own.
            let token = cancel.clone();
            let observed = self.cancel_observed.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                observed.store(true, Ordering::SeqCst);
            });
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&rpc)
            .cloned()
            .unwrap_or_else(|| Err(RpcError::internal(format!("no scripted reply for {rpc}"))));

        let value = reply?;
        DynamicMessage::deserialize(method.output(), value)
            .map_err(|e| RpcError::internal(format!("bad scripted reply for {rpc}: {e}")))
    }
}

/// The gateway under test: real router, real HTTP server, mock backend.
pub struct TestGateway {
    pub backend: Arc<MockBackend>,
    pub client: reqwest::Client,
    base_url: String,
}

impl TestGateway {
    pub async fn spawn() -> Self {
        Self::spawn_with_options(TranscodeOptions::default()).await
    }

    pub async fn spawn_with_options(options: TranscodeOptions) -> Self {
        let backend = MockBackend::new();
        let table = RouteTable::from_toml(ROUTES, &demo_pool()).unwrap();
        let state = AppState::new(backend.clone(), options);
        let app = create_router(state, &table);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            backend,
            client,
            base_url: format!("http://{addr}"),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
