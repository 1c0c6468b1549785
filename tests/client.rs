mod common;
use common::*;

use http::StatusCode;
use jrpc_http::{Client, ClientError, Service};
use serde_json::json;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// Serve over plain TCP on an ephemeral port, returning the base URL.
async fn spawn(service: Service, token: CancellationToken) -> String {
    let route = service.route().to_owned();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = service
        .into_axum()
        .into_make_service_with_connect_info::<SocketAddr>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(token.cancelled_owned())
            .await
    });
    format!("http://{addr}{route}")
}

#[tokio::test]
async fn calls() -> eyre::Result<()> {
    init_tracing();
    let token = CancellationToken::new();
    let client = Client::new(spawn(server_service(), token.clone()).await);

    let raw = client.call("subtract", json!({"X": 45, "Y": 3})).await?;
    assert_eq!(raw.get(), "42");

    let difference: i64 = client.call_as("subtract", [45, 3]).await?;
    assert_eq!(difference, 42);

    let view: CallView = client.call_as("copy", ["a", "b"]).await?;
    assert_eq!(view.method, "copy");
    assert_eq!(view.remote_address.as_deref(), Some("127.0.0.1"));
    assert!(view.user_agent.unwrap().starts_with("jrpc-http/"));

    token.cancel();
    Ok(())
}

#[tokio::test]
async fn errors() {
    let token = CancellationToken::new();
    let client = Client::new(spawn(server_service(), token.clone()).await);

    let err = client
        .call("subtract", json!({"X": 999, "Y": 999}))
        .await
        .unwrap_err();
    let ClientError::Rpc(payload) = err else {
        panic!("expected an rpc error, got {err:?}");
    };
    assert_eq!(payload.code, -320099);
    assert_eq!(payload.detail().as_deref(), Some("mock server error"));

    let err = client.call("missing", ()).await.unwrap_err();
    assert!(matches!(err, ClientError::Rpc(ref payload) if payload.code == -32601), "{err}");

    token.cancel();
}

#[tokio::test]
async fn basic_auth() {
    let token = CancellationToken::new();
    let url = spawn(auth_service(), token.clone()).await;

    let err = Client::new(url.as_str())
        .call("update", ())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status(StatusCode::FORBIDDEN)), "{err}");

    let client = Client::new(url.as_str()).with_basic_auth(USERNAME, PASSWORD);
    let raw = client.call("update", ()).await.unwrap();
    assert_eq!(raw.get(), "null");

    let err = Client::new(url)
        .with_basic_auth(USERNAME, "nope")
        .call("update", ())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status(StatusCode::FORBIDDEN)));

    token.cancel();
}
