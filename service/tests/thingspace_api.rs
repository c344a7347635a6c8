//! Carrier client behavior against a mock ThingSpace host.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use httpmock::prelude::*;
use niddgate_service::carrier::{CarrierAccount, CarrierError, ThingSpaceClient};

fn test_account() -> CarrierAccount {
    CarrierAccount {
        account_name: "TestAccount-1".to_string(),
        public_key: "pk".to_string(),
        private_key: "sk".to_string(),
        username: "user".to_string(),
        password: "pass".to_string(),
    }
}

fn client_for(server: &MockServer) -> ThingSpaceClient {
    ThingSpaceClient::with_base_url(test_account(), server.base_url())
}

// ---------------------------------------------------------------------------
// Token minting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mint_auth_token_posts_the_client_credentials_grant() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/ts/v1/oauth2/token")
            .header("accept", "application/json")
            .header("content-type", "application/x-www-form-urlencoded")
            // base64("pk:sk")
            .header("authorization", "Basic cGs6c2s=")
            .body("grant_type=client_credentials");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token":"auth-1","token_type":"Bearer","expires_in":3600}"#);
    });

    let token = client_for(&server).mint_auth_token().await.unwrap();

    assert_eq!(token, "auth-1");
    mock.assert();
}

#[tokio::test]
async fn mint_auth_token_treats_an_error_payload_as_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/ts/v1/oauth2/token");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"error":"invalid_client","error_description":"bad secret"}"#);
    });

    let err = client_for(&server).mint_auth_token().await.unwrap_err();

    match err {
        CarrierError::Remote { code, message } => {
            assert_eq!(code, "invalid_client");
            assert_eq!(message, "bad secret");
        }
        other => panic!("expected Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn mint_session_token_logs_in_with_the_bearer_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/m2m/v1/session/login")
            .header("accept", "application/json")
            .header("authorization", "Bearer auth-1")
            .json_body(serde_json::json!({"username": "user", "password": "pass"}));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"sessionToken":"sess-1"}"#);
    });

    let token = client_for(&server)
        .mint_session_token("auth-1")
        .await
        .unwrap();

    assert_eq!(token, "sess-1");
    mock.assert();
}

#[tokio::test]
async fn non_success_statuses_abort_the_call() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/ts/v1/oauth2/token");
        then.status(503).body("upstream down");
    });

    let err = client_for(&server).mint_auth_token().await.unwrap_err();

    match err {
        CarrierError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "upstream down");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn token_documents_must_be_json_objects() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/ts/v1/oauth2/token");
        then.status(200).body("[1,2,3]");
    });

    let err = client_for(&server).mint_auth_token().await.unwrap_err();
    assert!(matches!(err, CarrierError::Malformed(_)));
}

// ---------------------------------------------------------------------------
// NIDD delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_nidd_data_posts_the_wire_shape_and_returns_the_raw_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/m2m/v1/devices/nidd/message")
            .header("accept", "application/json")
            .header("authorization", "Bearer auth-1")
            .header("VZ-M2M-Token", "sess-1")
            .json_body(serde_json::json!({
                "deviceIds": [{"id": "5551230000", "kind": "MDN"}],
                "accountName": "TestAccount-1",
                "maximumDeliveryTime": "400",
                "message": "cGluZw=="
            }));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"requestId":"req-9"}"#);
    });

    let reply = client_for(&server)
        .send_nidd_data("auth-1", "sess-1", "5551230000", 400, b"ping")
        .await
        .unwrap();

    assert_eq!(reply, r#"{"requestId":"req-9"}"#);
    mock.assert();
}

#[tokio::test]
async fn send_nidd_data_accepts_a_payload_at_exactly_the_ceiling() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/m2m/v1/devices/nidd/message");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"requestId":"max"}"#);
    });

    // 8148 raw bytes encode to exactly 10864.
    let message = vec![0u8; 8148];
    assert_eq!(BASE64.encode(&message).len(), 10_864);

    let reply = client_for(&server)
        .send_nidd_data("auth-1", "sess-1", "5551230000", 400, &message)
        .await
        .unwrap();

    assert_eq!(reply, r#"{"requestId":"max"}"#);
    mock.assert();
}

#[tokio::test]
async fn send_nidd_data_rejects_oversized_payloads_without_calling_out() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/m2m/v1/devices/nidd/message");
        then.status(200).body("{}");
    });

    let message = vec![0u8; 8149];
    let err = client_for(&server)
        .send_nidd_data("auth-1", "sess-1", "5551230000", 400, &message)
        .await
        .unwrap_err();

    assert!(matches!(err, CarrierError::MessageTooLarge { .. }));
    mock.assert_hits(0);
}

// ---------------------------------------------------------------------------
// Callback listeners
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_callback_listeners_queries_the_account_collection() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/m2m/v1/callbacks/TestAccount-1")
            .header("authorization", "Bearer auth-1")
            .header("VZ-M2M-Token", "sess-1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"name":"NiddService","url":""}]"#);
    });

    let reply = client_for(&server)
        .list_callback_listeners("auth-1", "sess-1")
        .await
        .unwrap();

    assert_eq!(reply, r#"[{"name":"NiddService","url":""}]"#);
    mock.assert();
}

#[tokio::test]
async fn register_callback_listener_posts_name_and_url() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/m2m/v1/callbacks/TestAccount-1")
            .header("authorization", "Bearer auth-1")
            .header("VZ-M2M-Token", "sess-1")
            .json_body(serde_json::json!({
                "name": "NiddService",
                "url": "https://gw.example/vzw"
            }));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"name":"NiddService"}"#);
    });

    let reply = client_for(&server)
        .register_callback_listener("auth-1", "sess-1", "NiddService", "https://gw.example/vzw")
        .await
        .unwrap();

    assert_eq!(reply, r#"{"name":"NiddService"}"#);
    mock.assert();
}

#[tokio::test]
async fn remove_callback_listener_deletes_by_name() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/api/m2m/v1/callbacks/TestAccount-1/name/NiddService")
            .header("authorization", "Bearer auth-1")
            .header("VZ-M2M-Token", "sess-1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"name":"NiddService"}"#);
    });

    let reply = client_for(&server)
        .remove_callback_listener("auth-1", "sess-1", "NiddService")
        .await
        .unwrap();

    assert_eq!(reply, r#"{"name":"NiddService"}"#);
    mock.assert();
}
