//! End-to-end tests for the EPP HTTP gateway.
//!
//! Each test runs the real router over HTTP against a scripted mock
//! backend and asserts on both sides of the transcoding: the JSON the
//! client sees and the RPC request the backend received.
//!
//! Run with: cargo test -p eppgw-tests

use std::time::Duration;

use serde_json::{json, Value};

use eppgw_api::TranscodeOptions;
use eppgw_core::{RpcCode, RpcError};
use eppgw_tests::TestGateway;

#[tokio::test]
async fn domain_check_transcodes_end_to_end() {
    let gw = TestGateway::spawn().await;
    gw.backend.reply(
        "epp.EppGateway.DomainCheck",
        json!({"available": true, "reason": "premium tier"}),
    );

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"available": true, "reason": "premium tier"}));

    let calls = gw.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].rpc, "epp.EppGateway.DomainCheck");
    assert_eq!(calls[0].request, json!({"name": "example.com"}));
}

#[tokio::test]
async fn create_binds_whole_body() {
    let gw = TestGateway::spawn().await;
    gw.backend.reply(
        "epp.EppGateway.DomainCreate",
        json!({"pending": true, "creation_date": "2026-08-26"}),
    );

    let response = gw
        .client
        .post(gw.url("/epp/v1/domains"))
        .json(&json!({
            "name": "example.com",
            "period": 2,
            "nameservers": ["ns1.example.net", "ns2.example.net"]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let calls = gw.backend.calls();
    assert_eq!(
        calls[0].request,
        json!({
            "name": "example.com",
            "period": 2,
            "nameservers": ["ns1.example.net", "ns2.example.net"]
        })
    );
}

#[tokio::test]
async fn transfer_merges_path_body_field_and_query() {
    let gw = TestGateway::spawn().await;
    gw.backend
        .reply("epp.EppGateway.DomainTransfer", json!({"status": "pending"}));

    let response = gw
        .client
        .post(gw.url("/epp/v1/domains/example.com/transfer?period=1"))
        .json(&json!({"password": "hunter2"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let calls = gw.backend.calls();
    assert_eq!(
        calls[0].request,
        json!({
            "name": "example.com",
            "period": 1,
            "auth_info": {"password": "hunter2"}
        })
    );
}

#[tokio::test]
async fn response_body_projects_one_field() {
    let gw = TestGateway::spawn().await;
    gw.backend.reply(
        "epp.EppGateway.DomainInfo",
        json!({"domain": {"name": "example.com", "registry_id": "D123", "statuses": ["ok"]}}),
    );

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    // The client sees the projected field, not the reply envelope.
    assert_eq!(
        body,
        json!({"name": "example.com", "registry_id": "D123", "statuses": ["ok"]})
    );
}

#[tokio::test]
async fn unknown_path_is_a_structured_404_without_a_backend_call() {
    let gw = TestGateway::spawn().await;

    let response = gw
        .client
        .get(gw.url("/epp/v1/contacts/alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "not-found");
    assert!(body["message"].is_string());
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn method_mismatch_is_a_structured_404() {
    let gw = TestGateway::spawn().await;

    let response = gw
        .client
        .delete(gw.url("/epp/v1/domains/example.com/check"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "not-found");
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn malformed_body_is_400_without_a_backend_call() {
    let gw = TestGateway::spawn().await;

    let response = gw
        .client
        .post(gw.url("/epp/v1/domains"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid-argument");
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn backend_not_found_maps_to_404() {
    let gw = TestGateway::spawn().await;
    gw.backend.fail(
        "epp.EppGateway.DomainCheck",
        RpcError::not_found("domain example.com not registered"),
    );

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "not-found");
    assert_eq!(body["message"], "domain example.com not registered");
}

#[tokio::test]
async fn backend_unavailable_maps_to_503() {
    let gw = TestGateway::spawn().await;
    gw.backend.fail(
        "epp.EppGateway.DomainCheck",
        RpcError::unavailable("backend unavailable"),
    );

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "unavailable");
}

#[tokio::test]
async fn backend_already_exists_maps_to_409() {
    let gw = TestGateway::spawn().await;
    gw.backend.fail(
        "epp.EppGateway.DomainCreate",
        RpcError::new(RpcCode::AlreadyExists, "domain already registered"),
    );

    let response = gw
        .client
        .post(gw.url("/epp/v1/domains"))
        .json(&json!({"name": "example.com"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "already-exists");
}

#[tokio::test]
async fn grpc_timeout_header_sets_the_backend_deadline() {
    let gw = TestGateway::spawn().await;
    gw.backend
        .reply("epp.EppGateway.DomainCheck", json!({"available": true}));

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check"))
        .header("grpc-timeout", "2S")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(gw.backend.calls()[0].timeout, Duration::from_secs(2));
}

#[tokio::test]
async fn malformed_grpc_timeout_is_400() {
    let gw = TestGateway::spawn().await;

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check"))
        .header("grpc-timeout", "2 seconds")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn client_disconnect_cancels_the_backend_call() {
    let gw = TestGateway::spawn().await;
    gw.backend
        .reply("epp.EppGateway.DomainCheck", json!({"available": true}));
    gw.backend.set_delay(Duration::from_secs(5));

    // A client with a short timeout drops the connection mid-call.
    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let result = impatient
        .get(gw.url("/epp/v1/domains/example.com/check"))
        .send()
        .await;
    assert!(result.is_err());

    // The cancellation watcher fires well before the mock's delay would
    // have elapsed.
    let mut observed = false;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if gw.backend.cancellation_observed() {
            observed = true;
            break;
        }
    }
    assert!(observed, "backend never saw the cancellation");
}

#[tokio::test]
async fn strict_mode_rejects_unknown_query_parameters() {
    let gw = TestGateway::spawn_with_options(TranscodeOptions {
        strict: true,
        ..TranscodeOptions::default()
    })
    .await;

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check?verbose=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid-argument");
    assert!(gw.backend.calls().is_empty());
}

#[tokio::test]
async fn lenient_mode_ignores_unknown_query_parameters() {
    let gw = TestGateway::spawn().await;
    gw.backend
        .reply("epp.EppGateway.DomainCheck", json!({"available": true}));

    let response = gw
        .client
        .get(gw.url("/epp/v1/domains/example.com/check?verbose=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(gw.backend.calls()[0].request, json!({"name": "example.com"}));
}

#[tokio::test]
async fn the_gateway_is_stateless_across_requests() {
    let gw = TestGateway::spawn().await;
    gw.backend
        .reply("epp.EppGateway.DomainCheck", json!({"available": true}));

    for _ in 0..2 {
        let response = gw
            .client
            .get(gw.url("/epp/v1/domains/example.com/check"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let calls = gw.backend.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].request, calls[1].request);
}

#[tokio::test]
async fn health_endpoint_answers_without_the_backend() {
    let gw = TestGateway::spawn().await;

    let response = gw.client.get(gw.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
    assert!(gw.backend.calls().is_empty());
}
